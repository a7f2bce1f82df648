// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User-facing error taxonomy.
//!
//! Every layer keeps its own `thiserror` enum. At the edge they collapse into
//! a [`UserError`] that tells the caller what to do next: retry, log in
//! again, or fix the input.

use serde::Serialize;

use crate::auth::error::ClientError;
use crate::ingest::orchestrator::{IngestError, PassError};
use crate::ledger::api::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, timeout or server-side failure. Safe to retry.
    Transient,
    /// The session is gone. The user has to log in again.
    Authorization,
    /// The ledger rejected the input. The message is the ledger's, verbatim.
    Validation,
    /// Local fault (storage, signing, malformed response).
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct UserError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UserError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn session_expired() -> Self {
        Self::authorization("Session expired. Please login again.")
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }

    pub fn requires_login(&self) -> bool {
        self.kind == ErrorKind::Authorization
    }
}

impl From<ClientError> for UserError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::SessionExpired => UserError::session_expired(),
            e if e.is_transient() => UserError::transient(e.to_string()),
            e => UserError::internal(e.to_string()),
        }
    }
}

impl From<LedgerError> for UserError {
    fn from(e: LedgerError) -> Self {
        if e.is_session_expired() {
            return UserError::session_expired();
        }
        match e {
            LedgerError::Validation(message) => UserError::validation(message),
            LedgerError::Rejected { message, .. } => UserError::validation(message),
            LedgerError::Transient(_) => UserError::transient(e.to_string()),
            LedgerError::Client(e) => e.into(),
            e => UserError::internal(e.to_string()),
        }
    }
}

impl From<IngestError> for UserError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::SessionExpired => UserError::session_expired(),
            IngestError::Timeout => UserError::transient(e.to_string()),
            IngestError::Source(e) => UserError::transient(e.to_string()),
        }
    }
}

impl From<&PassError> for UserError {
    fn from(e: &PassError) -> Self {
        match e {
            PassError::Retryable { message, .. } => UserError::transient(message.clone()),
            PassError::Rejected { message, .. } => UserError::validation(message.clone()),
            PassError::SourceUnavailable(reason) => UserError::transient(reason.clone()),
        }
    }
}
