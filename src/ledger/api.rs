// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed ledger REST calls on top of the authenticated client.

use std::sync::Arc;

use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::models::{ExpenseDraft, LedgerExpense, LedgerTransaction, TransactionCandidate};
use super::signing::{RequestSigner, SigningError};
use crate::auth::client::{extract_detail, AuthClient, RequestOptions};
use crate::auth::error::ClientError;

pub const TRANSACTIONS_PATH: &str = "/transactions";
pub const EXPENSES_PATH: &str = "/expenses";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The session is gone; the user has to log in again.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// The ledger rejected the payload (400/422). The message is the ledger's.
    #[error("{0}")]
    Validation(String),

    /// Any other 4xx.
    #[error("ledger rejected request: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Network trouble, a timeout or a 5xx; worth retrying.
    #[error("ledger unavailable: {0}")]
    Transient(String),

    #[error("failed to sign request: {0}")]
    Signing(#[from] SigningError),

    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Client(ClientError),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, LedgerError::SessionExpired)
    }
}

impl From<ClientError> for LedgerError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::SessionExpired => LedgerError::SessionExpired,
            e if e.is_transient() => LedgerError::Transient(e.to_string()),
            e => LedgerError::Client(e),
        }
    }
}

/// List endpoints may answer with a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

/// Ledger REST API.
#[derive(Clone)]
pub struct LedgerApi {
    client: AuthClient,
    signer: Option<Arc<RequestSigner>>,
}

impl LedgerApi {
    /// `signer` adds `request_hash` to writes when present.
    pub fn new(client: AuthClient, signer: Option<Arc<RequestSigner>>) -> Self {
        Self { client, signer }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// `POST /transactions`. Returns the record as stored by the ledger.
    pub async fn submit_transaction(
        &self,
        candidate: &TransactionCandidate,
    ) -> Result<LedgerTransaction, LedgerError> {
        let mut payload = transaction_payload(candidate);
        if let Some(signer) = &self.signer {
            payload = signer.sign(candidate, payload)?;
        }

        let response = self
            .client
            .call(TRANSACTIONS_PATH, RequestOptions::post(payload))
            .await?;
        let stored: LedgerTransaction = read_json(response).await?;
        info!(
            reference = %stored.tx_id,
            platform = %stored.platform,
            amount = %stored.amount_received,
            "Transaction stored"
        );
        Ok(stored)
    }

    /// `POST /expenses`.
    pub async fn create_expense(&self, draft: &ExpenseDraft) -> Result<LedgerExpense, LedgerError> {
        let mut payload = json!({
            "amount": draft.amount,
            "category": draft.category,
            "description": draft.description,
            "created_at": draft.created_at.to_rfc3339(),
        });
        if let Some(signer) = &self.signer {
            payload = signer.sign(draft, payload)?;
        }

        let response = self
            .client
            .call(EXPENSES_PATH, RequestOptions::post(payload))
            .await?;
        let stored: LedgerExpense = read_json(response).await?;
        info!(category = draft.category.as_str(), amount = %stored.amount, "Expense stored");
        Ok(stored)
    }

    /// `GET /transactions`.
    pub async fn list_transactions(&self) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let response = self
            .client
            .call(TRANSACTIONS_PATH, RequestOptions::get())
            .await?;
        let listing: Listing<LedgerTransaction> = read_json(response).await?;
        let transactions = match listing {
            Listing::Page { results } => results,
            Listing::Plain(all) => all,
        };
        debug!(count = transactions.len(), "Fetched ledger transactions");
        Ok(transactions)
    }
}

/// Wire body of `POST /transactions`.
pub fn transaction_payload(candidate: &TransactionCandidate) -> Value {
    let created_at = candidate.received_at.unwrap_or_else(Utc::now);
    json!({
        "tx_id": candidate.reference_id,
        "amount_received": candidate.amount_received,
        "rider_profit": candidate.rider_profit,
        "platform_debt": candidate.platform_debt,
        "platform": candidate.platform,
        "is_tip": candidate.is_tip,
        "created_at": created_at.to_rfc3339(),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_detail(&body);
    warn!(status = status.as_u16(), message = %message, "Ledger request failed");

    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            LedgerError::Validation(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            LedgerError::Transient(format!("HTTP {}: {message}", status.as_u16()))
        }
        s if s.is_server_error() => {
            LedgerError::Transient(format!("HTTP {}: {message}", s.as_u16()))
        }
        s => LedgerError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}
