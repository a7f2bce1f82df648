// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state: login, startup bootstrap, logout.
//!
//! The authenticated flag is a [`watch`] channel so the poller and the binary
//! can react to it. Session expiry from the request client flips it to
//! `false` through an expiry subscription held for the manager's lifetime.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::client::{AuthClient, LoginOutcome};
use super::credentials::CredentialKind;
use super::error::ClientError;
use super::events::Subscription;
use crate::ledger::signing::RequestSigner;

/// Durable key of the "remember me" flag.
pub const REMEMBER_ME_KEY: &str = "rememberMe";

pub struct SessionManager {
    client: AuthClient,
    signer: Option<Arc<RequestSigner>>,
    state: Arc<watch::Sender<bool>>,
    _expiry: Subscription,
}

impl SessionManager {
    pub fn new(client: AuthClient) -> Self {
        let state = Arc::new(watch::Sender::new(false));
        let on_expiry = state.clone();
        let expiry = client.subscribe_session_expired(move |_| {
            on_expiry.send_replace(false);
        });
        Self {
            client,
            signer: None,
            state,
            _expiry: expiry,
        }
    }

    /// Forget the signer's cached secret on logout.
    pub fn with_signer(mut self, signer: Arc<RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    pub fn is_authenticated(&self) -> bool {
        *self.state.borrow()
    }

    /// Receiver that observes every authenticated/unauthenticated flip.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Restore the session from durable storage at startup.
    ///
    /// Authenticated iff an access credential is stored and the user did not
    /// opt out of being remembered.
    pub fn bootstrap(&self) -> Result<bool, ClientError> {
        let durable = self.client.credentials().durable();
        let remember = durable.get(REMEMBER_ME_KEY)?;
        let access = self.client.credentials().get(CredentialKind::Access)?;

        let authenticated = access.is_some() && remember.as_deref() != Some("false");
        self.state.send_replace(authenticated);
        info!(authenticated, "Session bootstrapped");
        Ok(authenticated)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<LoginOutcome, ClientError> {
        let outcome = self.client.login(username, password).await?;
        if outcome == LoginOutcome::Authenticated {
            let flag = if remember_me { "true" } else { "false" };
            self.client
                .credentials()
                .durable()
                .put(REMEMBER_ME_KEY, flag)?;
            self.state.send_replace(true);
        }
        Ok(outcome)
    }

    /// Clear credentials and cached secrets. Always ends unauthenticated, even
    /// when clearing durable storage fails.
    pub fn logout(&self) -> Result<(), ClientError> {
        if let Some(signer) = &self.signer {
            signer.clear_cached_secret();
        }
        let cleared = self.client.credentials().clear();
        self.state.send_replace(false);
        match cleared {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Logout could not clear stored credentials");
                Err(e.into())
            }
        }
    }
}
