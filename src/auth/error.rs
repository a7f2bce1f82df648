// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated request client errors.

use crate::storage::StorageError;

/// Error returned by [`AuthClient`](super::AuthClient) operations.
///
/// Non-2xx responses other than 401 are *not* errors at this layer; they are
/// handed back to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The session cannot be recovered; the user has to log in again.
    #[error("Session expired. Please login again.")]
    SessionExpired,

    /// Connection, DNS, TLS or body transfer failure.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The client-side deadline elapsed before the call finished.
    #[error("request timed out")]
    Timeout,

    /// Credential storage failed.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The path could not be joined onto the base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The refresh endpoint failed server-side (5xx); the refresh credential
    /// may still be good, so the session is kept.
    #[error("token refresh unavailable: HTTP {0}")]
    RefreshUnavailable(reqwest::StatusCode),

    /// The refresh round this call waited on failed without an HTTP status.
    #[error("token refresh failed: {message}")]
    RefreshFailed { message: String, transient: bool },

    /// The login or refresh endpoint answered with an unexpected body.
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Transient failures are worth a user-initiated retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_)
                | ClientError::Timeout
                | ClientError::RefreshUnavailable(_)
                | ClientError::RefreshFailed {
                    transient: true,
                    ..
                }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Network(e)
        }
    }
}
