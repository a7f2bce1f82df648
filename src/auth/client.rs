// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated request client.
//!
//! Every outbound ledger call goes through [`AuthClient::call`], which:
//!
//! 1. attaches the stored access credential as a bearer token,
//! 2. on a 401, exchanges the refresh credential for a new access credential
//!    and retries the original request once,
//! 3. when the refresh credential is rejected, or the refreshed credential is
//!    refused as well, clears both credentials and broadcasts session expiry
//!    to every subscriber.
//!
//! ## Single-flight refresh
//!
//! Refreshes run in rounds under one async mutex. A caller that queued behind
//! a round takes that round's outcome instead of starting its own:
//!
//! | Round outcome | Queued callers |
//! |---------------|----------------|
//! | New access credential | Retry with the replacement |
//! | Refresh rejected | `SessionExpired`, no second broadcast |
//! | Transient failure (5xx, network) | The same transient error |
//!
//! Some auth backends rotate or blacklist a refresh credential on use; two
//! racing refreshes would log the user out.
//!
//! ## Cancellation
//!
//! The whole call (first attempt, refresh, retry) runs inside the client
//! deadline. Dropping the future, on that deadline or from a caller's own
//! timeout or `select!`, aborts whatever step is in flight. A refresh response
//! that arrives after the abort is never stored, and a round abandoned that
//! way is not counted, so the next queued caller runs its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use super::credentials::{CredentialKind, CredentialStore};
use super::error::ClientError;
use super::events::{ExpiryReason, SessionEvents, SessionExpired, Subscription};

/// Default end-to-end deadline for one `call`, refresh and retry included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default refresh endpoint path.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Default login endpoint path.
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";

/// Method and body of one API call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }
}

/// Client settings.
#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    /// Ledger API base, e.g. `http://localhost:8000/api`. Trailing slashes are
    /// stripped.
    pub base_url: String,
    pub refresh_path: String,
    pub login_path: String,
    pub request_timeout: Duration,
}

impl AuthClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials were issued and stored.
    Authenticated,
    /// The ledger refused the username/password.
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh credentials.
    #[serde(default)]
    refresh: Option<String>,
}

/// Outcome of one refresh exchange.
enum RefreshExchange {
    Refreshed(String),
    Rejected(StatusCode),
}

/// Transient failure of the last refresh round, replayed to the callers that
/// waited on it.
#[derive(Debug, Clone)]
enum RoundFailure {
    Unavailable(StatusCode),
    Failed { message: String, transient: bool },
}

impl RoundFailure {
    fn of(error: &ClientError) -> Self {
        match error {
            ClientError::RefreshUnavailable(status) => RoundFailure::Unavailable(*status),
            e => RoundFailure::Failed {
                message: e.to_string(),
                transient: e.is_transient(),
            },
        }
    }

    fn to_error(&self) -> ClientError {
        match self {
            RoundFailure::Unavailable(status) => ClientError::RefreshUnavailable(*status),
            RoundFailure::Failed { message, transient } => ClientError::RefreshFailed {
                message: message.clone(),
                transient: *transient,
            },
        }
    }
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    refresh_path: String,
    login_path: String,
    request_timeout: Duration,
    credentials: Arc<CredentialStore>,
    events: SessionEvents,
    /// Held for the length of a refresh round; holds the last round's failure.
    refresh_gate: Mutex<Option<RoundFailure>>,
    /// Completed refresh rounds.
    refresh_rounds: AtomicU64,
}

/// Authenticated ledger client. Cheap to clone; clones share credentials,
/// the refresh gate and the session-expiry channel.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.inner.base_url)
            .field("refresh_path", &self.inner.refresh_path)
            .finish()
    }
}

impl AuthClient {
    /// Build a client over an existing credential store and expiry channel.
    pub fn new(
        config: AuthClientConfig,
        credentials: Arc<CredentialStore>,
        events: SessionEvents,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Network)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        // Fail fast on an unusable base URL instead of on the first call.
        Url::parse(&base_url)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                refresh_path: config.refresh_path,
                login_path: config.login_path,
                request_timeout: config.request_timeout,
                credentials,
                events,
                refresh_gate: Mutex::new(None),
                refresh_rounds: AtomicU64::new(0),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.inner.credentials
    }

    pub fn session_events(&self) -> &SessionEvents {
        &self.inner.events
    }

    /// Register a session-expiry handler.
    pub fn subscribe_session_expired<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionExpired) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    /// Perform an authenticated call.
    ///
    /// Returns the final response for any status except an unrecoverable 401,
    /// which becomes [`ClientError::SessionExpired`].
    pub async fn call(&self, path: &str, options: RequestOptions) -> Result<Response, ClientError> {
        match tokio::time::timeout(self.inner.request_timeout, self.call_inner(path, &options))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(path, method = %options.method, "API call timed out");
                Err(ClientError::Timeout)
            }
        }
    }

    /// Exchange a username/password for a credential pair and store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ClientError> {
        let url = self.endpoint(&self.inner.login_path)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_detail(&body);
            info!(status = status.as_u16(), "Login rejected");
            return Ok(LoginOutcome::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let tokens: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("login response: {e}")))?;
        self.inner
            .credentials
            .set_pair(&tokens.access, &tokens.refresh)?;
        info!("Login succeeded, credentials stored");
        Ok(LoginOutcome::Authenticated)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Ok(Url::parse(&format!("{}{}", self.inner.base_url, path))?)
    }

    async fn call_inner(&self, path: &str, options: &RequestOptions) -> Result<Response, ClientError> {
        let url = self.endpoint(path)?;
        let access = self.inner.credentials.get(CredentialKind::Access)?;

        debug!(
            method = %options.method,
            url = %url,
            authenticated = access.is_some(),
            "API call"
        );

        let response = self.send(&url, options, access.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            log_status(path, &response);
            return Ok(response);
        }

        let Some(stale) = access else {
            // Nothing to refresh; no session was active to announce the end of.
            warn!(path, "401 on unauthenticated request");
            return Err(ClientError::SessionExpired);
        };

        info!(path, "Access credential rejected, refreshing");
        let fresh = self.refresh_after_unauthorized(&stale).await?;

        let retried = self.send(&url, options, Some(&fresh)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Refreshed access credential rejected");
            self.expire_if_current(&fresh, ExpiryReason::RefreshedAccessRejected)
                .await?;
            return Err(ClientError::SessionExpired);
        }
        log_status(path, &retried);
        Ok(retried)
    }

    async fn send(
        &self,
        url: &Url,
        options: &RequestOptions,
        access: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut request = self
            .inner
            .http
            .request(options.method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = access {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Obtain a usable access credential after `stale` was rejected.
    async fn refresh_after_unauthorized(&self, stale: &str) -> Result<String, ClientError> {
        let observed = self.inner.refresh_rounds.load(Ordering::SeqCst);
        let mut gate = self.inner.refresh_gate.lock().await;

        match self.inner.credentials.get(CredentialKind::Access)? {
            Some(current) if current != stale => {
                debug!("Access credential already replaced by a concurrent refresh");
                return Ok(current);
            }
            // Cleared while we waited: a concurrent refresh failed (and already
            // broadcast) or the user logged out.
            None => return Err(ClientError::SessionExpired),
            Some(_) => {}
        }

        if self.inner.refresh_rounds.load(Ordering::SeqCst) != observed {
            if let Some(failure) = &*gate {
                debug!(failure = ?failure, "Sharing failure of the refresh round waited on");
                return Err(failure.to_error());
            }
        }

        let result = self.refresh_round().await;
        *gate = match &result {
            Err(ClientError::SessionExpired) | Ok(_) => None,
            Err(e) => Some(RoundFailure::of(e)),
        };
        self.inner.refresh_rounds.fetch_add(1, Ordering::SeqCst);
        result
    }

    /// One refresh exchange. Must be called with the refresh gate held.
    async fn refresh_round(&self) -> Result<String, ClientError> {
        let Some(refresh) = self.inner.credentials.get(CredentialKind::Refresh)? else {
            warn!("No refresh credential available");
            self.expire(ExpiryReason::NoRefreshCredential);
            return Err(ClientError::SessionExpired);
        };

        match self.exchange_refresh(&refresh).await? {
            RefreshExchange::Refreshed(access) => {
                info!("Access credential refreshed");
                Ok(access)
            }
            RefreshExchange::Rejected(status) => {
                warn!(status = status.as_u16(), "Refresh credential rejected");
                self.expire(ExpiryReason::RefreshRejected);
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Expire the session unless `access` was already replaced or cleared by
    /// another caller.
    async fn expire_if_current(&self, access: &str, reason: ExpiryReason) -> Result<(), ClientError> {
        let _gate = self.inner.refresh_gate.lock().await;
        if self.inner.credentials.get(CredentialKind::Access)?.as_deref() == Some(access) {
            self.expire(reason);
        }
        Ok(())
    }

    async fn exchange_refresh(&self, refresh: &str) -> Result<RefreshExchange, ClientError> {
        let url = self.endpoint(&self.inner.refresh_path)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ClientError::RefreshUnavailable(status));
        }
        if !status.is_success() {
            return Ok(RefreshExchange::Rejected(status));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("refresh response: {e}")))?;

        self.inner
            .credentials
            .set(CredentialKind::Access, &body.access)?;
        if let Some(rotated) = body.refresh.as_deref() {
            self.inner.credentials.set(CredentialKind::Refresh, rotated)?;
        }
        Ok(RefreshExchange::Refreshed(body.access))
    }

    fn expire(&self, reason: ExpiryReason) {
        if let Err(e) = self.inner.credentials.clear() {
            error!(error = %e, "Failed to clear credentials on session expiry");
        }
        self.inner.events.publish(reason);
    }
}

fn log_status(path: &str, response: &Response) {
    let status = response.status();
    if status.is_success() {
        debug!(path, status = status.as_u16(), "API response");
    } else {
        warn!(path, status = status.as_u16(), "API error response");
    }
}

/// Pull a human-readable message out of an error body (`{"detail": ...}`,
/// `{"error": ...}`, or plain text).
pub(crate) fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
        if let Some(fields) = value.as_object() {
            let parts: Vec<String> = fields
                .iter()
                .map(|(field, errors)| match errors {
                    Value::Array(items) => {
                        let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                        format!("{field}: {}", joined.join(" "))
                    }
                    Value::String(text) => format!("{field}: {text}"),
                    other => format!("{field}: {other}"),
                })
                .collect();
            if !parts.is_empty() {
                return parts.join("; ");
            }
        }
    }
    body.trim().to_string()
}
