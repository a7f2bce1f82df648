// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Engine wiring: one shared authenticated client behind the session, the
//! ledger API and the ingestion orchestrator.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{
    AuthClient, AuthClientConfig, CredentialStore, LoginOutcome, SessionEvents, SessionManager,
    Subscription,
};
use crate::config::EngineConfig;
use crate::error::UserError;
use crate::ingest::{IngestionOrchestrator, PassOutcome, PassReport};
use crate::ledger::{ExpenseDraft, LedgerApi, LedgerExpense, RequestSigner};
use crate::sms::Parser;
use crate::storage::{SecretStore, TxCache};

pub struct Engine {
    config: EngineConfig,
    session: SessionManager,
    ledger: LedgerApi,
    orchestrator: Arc<IngestionOrchestrator>,
    _expiry: Subscription,
}

impl Engine {
    pub fn new(config: EngineConfig, secrets: Arc<dyn SecretStore>) -> Result<Self, UserError> {
        let credentials = Arc::new(CredentialStore::new(secrets.clone()));
        let client = AuthClient::new(
            AuthClientConfig::new(&config.ledger_api_url)
                .with_request_timeout(config.request_timeout),
            credentials,
            SessionEvents::new(),
        )?;

        let signer = Arc::new(RequestSigner::new(secrets));
        let session = SessionManager::new(client.clone()).with_signer(signer.clone());
        let ledger = LedgerApi::new(client.clone(), config.sign_requests.then_some(signer));

        let parser = Parser::new(config.commission, config.max_message_amount);
        let cache = Arc::new(TxCache::new());
        let orchestrator = Arc::new(IngestionOrchestrator::new(ledger.clone(), parser, cache));
        orchestrator.set_capture_enabled(config.capture_enabled);

        let on_expiry = orchestrator.clone();
        let expiry = client.subscribe_session_expired(move |_| {
            on_expiry.halt();
            on_expiry.cache().clear();
        });

        info!(
            ledger = %config.ledger_api_url,
            capture_enabled = config.capture_enabled,
            signing = config.sign_requests,
            "Engine ready"
        );

        Ok(Self {
            config,
            session,
            ledger,
            orchestrator,
            _expiry: expiry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn ledger(&self) -> &LedgerApi {
        &self.ledger
    }

    pub fn orchestrator(&self) -> &Arc<IngestionOrchestrator> {
        &self.orchestrator
    }

    /// Restore a remembered session and warm the duplicate cache.
    pub async fn bootstrap(&self) -> Result<bool, UserError> {
        let authenticated = self.session.bootstrap()?;
        if authenticated {
            self.warm_cache().await;
        }
        Ok(authenticated)
    }

    /// Log in, lift any expiry halt and warm the duplicate cache.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<(), UserError> {
        match self.session.login(username, password, remember_me).await? {
            LoginOutcome::Authenticated => {
                self.orchestrator.resume();
                self.warm_cache().await;
                Ok(())
            }
            LoginOutcome::Rejected { message, .. } => Err(UserError::validation(message)),
        }
    }

    /// Stop automatic capture and forget everything tied to the session.
    pub fn logout(&self) -> Result<(), UserError> {
        self.orchestrator.halt();
        self.orchestrator.cache().clear();
        self.session.logout()?;
        Ok(())
    }

    /// Replace the duplicate cache with the ledger's transaction list.
    pub async fn sync_cache(&self) -> Result<usize, UserError> {
        let transactions = self.ledger.list_transactions().await?;
        let count = transactions.len();
        self.orchestrator.cache().replace_all(transactions);
        info!(count, "Transaction cache synced");
        Ok(count)
    }

    pub async fn create_expense(&self, draft: &ExpenseDraft) -> Result<LedgerExpense, UserError> {
        Ok(self.ledger.create_expense(draft).await?)
    }

    /// Check one pasted message, bounded by the request timeout.
    pub async fn check_manual(&self, text: &str) -> Result<PassReport, UserError> {
        match self
            .orchestrator
            .check_manual(text, self.config.request_timeout)
            .await?
        {
            PassOutcome::Completed(report) => Ok(report),
            PassOutcome::Busy | PassOutcome::Paused => {
                Err(UserError::transient("A check is already running"))
            }
        }
    }

    async fn warm_cache(&self) {
        if let Err(e) = self.sync_cache().await {
            warn!(error = %e, "Could not sync transaction cache");
        }
    }
}
