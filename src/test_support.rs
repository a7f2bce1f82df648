// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process mock ledger for client and ingestion tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::auth::client::{AuthClient, AuthClientConfig, LoginOutcome};
use crate::auth::credentials::CredentialStore;
use crate::auth::events::SessionEvents;
use crate::ingest::orchestrator::IngestionOrchestrator;
use crate::ledger::api::LedgerApi;
use crate::ledger::signing::RequestSigner;
use crate::sms::parser::Parser;
use crate::storage::{MemorySecretStore, TxCache};

pub const VALID_PASSWORD: &str = "correct-horse";

pub struct MockState {
    valid_access: Mutex<String>,
    valid_refresh: Mutex<Option<String>>,
    issued: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_delay: Mutex<Duration>,
    refresh_failure: AtomicBool,
    reject_refreshed_access: AtomicBool,
    submit_calls: AtomicUsize,
    submit_failure: Mutex<Option<(StatusCode, Value)>>,
    next_id: AtomicI64,
    transactions: Mutex<Vec<Value>>,
    expenses: Mutex<Vec<Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            valid_access: Mutex::new("never-issued".to_string()),
            valid_refresh: Mutex::new(None),
            issued: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_delay: Mutex::new(Duration::ZERO),
            refresh_failure: AtomicBool::new(false),
            reject_refreshed_access: AtomicBool::new(false),
            submit_calls: AtomicUsize::new(0),
            submit_failure: Mutex::new(None),
            next_id: AtomicI64::new(1),
            transactions: Mutex::new(Vec::new()),
            expenses: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    fn issue_access(&self) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let token = format!("access-{n}");
        *self.valid_access.lock().unwrap() = token.clone();
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }

    pub fn valid_access(&self) -> String {
        self.valid_access.lock().unwrap().clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Invalidate every access credential handed out so far.
    pub fn expire_access(&self) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        *self.valid_access.lock().unwrap() = format!("unissued-{n}");
    }

    /// Reject every refresh credential handed out so far.
    pub fn revoke_refresh(&self) {
        *self.valid_refresh.lock().unwrap() = None;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    /// Make the refresh endpoint answer 503.
    pub fn set_refresh_failure(&self, fail: bool) {
        self.refresh_failure.store(fail, Ordering::SeqCst);
    }

    /// Hand out refreshed access credentials that every endpoint refuses.
    pub fn set_reject_refreshed_access(&self, reject: bool) {
        self.reject_refreshed_access.store(reject, Ordering::SeqCst);
    }

    /// Force the next transaction submissions to answer with `status`/`body`.
    pub fn set_submit_failure(&self, failure: Option<(u16, Value)>) {
        *self.submit_failure.lock().unwrap() = failure.map(|(status, body)| {
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )
        });
    }

    pub fn transactions(&self) -> Vec<Value> {
        self.transactions.lock().unwrap().clone()
    }

    pub fn expenses(&self) -> Vec<Value> {
        self.expenses.lock().unwrap().clone()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Given token not valid for any token type" })),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    if body.get("password").and_then(Value::as_str) != Some(VALID_PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response();
    }
    let access = state.issue_access();
    let refresh = format!("refresh-{}", state.issued.load(Ordering::SeqCst));
    *state.valid_refresh.lock().unwrap() = Some(refresh.clone());
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.refresh_failure.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let presented = body.get("refresh").and_then(Value::as_str);
    let valid = state.valid_refresh.lock().unwrap().clone();
    match (presented, valid) {
        (Some(presented), Some(valid)) if presented == valid => {
            let access = if state.reject_refreshed_access.load(Ordering::SeqCst) {
                format!("refused-{}", state.issued.fetch_add(1, Ordering::SeqCst))
            } else {
                state.issue_access()
            };
            Json(json!({ "access": access })).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
        )
            .into_response(),
    }
}

async fn ping(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "pong": true })).into_response()
}

async fn teapot() -> Response {
    (StatusCode::IM_A_TEAPOT, "short and stout").into_response()
}

async fn list_transactions(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(Value::Array(state.transactions())).into_response()
}

async fn create_transaction(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    if let Some((status, failure)) = state.submit_failure.lock().unwrap().clone() {
        return (status, Json(failure)).into_response();
    }

    let tx_id = body.get("tx_id").cloned().unwrap_or(Value::Null);
    let mut transactions = state.transactions.lock().unwrap();
    if transactions.iter().any(|tx| tx.get("tx_id") == Some(&tx_id)) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "tx_id": ["transaction with this tx id already exists."] })),
        )
            .into_response();
    }

    let mut record: HashMap<String, Value> = body
        .as_object()
        .map(|o| o.clone().into_iter().collect())
        .unwrap_or_default();
    record.remove("request_hash");
    record.insert(
        "id".to_string(),
        json!(state.next_id.fetch_add(1, Ordering::SeqCst)),
    );
    let record = json!(record);
    transactions.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn create_expense(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut record = body.clone();
    if let Some(fields) = record.as_object_mut() {
        fields.insert(
            "id".to_string(),
            json!(state.next_id.fetch_add(1, Ordering::SeqCst)),
        );
    }
    state.expenses.lock().unwrap().push(body);
    (StatusCode::CREATED, Json(record)).into_response()
}

/// Mock ledger bound to an ephemeral local port. Aborted on drop.
pub struct MockLedger {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockLedger {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/ping", get(ping))
            .route("/teapot", get(teapot))
            .route("/transactions", get(list_transactions).post(create_transaction))
            .route("/expenses", post(create_expense))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }
}

impl Drop for MockLedger {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Client logged in against `ledger`, with its backing secret store.
pub async fn logged_in_client(ledger: &MockLedger) -> (AuthClient, Arc<MemorySecretStore>) {
    let store = Arc::new(MemorySecretStore::new());
    let client = AuthClient::new(
        AuthClientConfig::new(&ledger.base_url),
        Arc::new(CredentialStore::new(store.clone())),
        SessionEvents::new(),
    )
    .unwrap();
    assert_eq!(
        client.login("rider", VALID_PASSWORD).await.unwrap(),
        LoginOutcome::Authenticated
    );
    (client, store)
}

/// Orchestrator with signing and capture enabled, logged in against `ledger`.
pub async fn orchestrator_for(ledger: &MockLedger) -> Arc<IngestionOrchestrator> {
    let (client, store) = logged_in_client(ledger).await;
    let api = LedgerApi::new(client, Some(Arc::new(RequestSigner::new(store))));
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        api,
        Parser::default(),
        Arc::new(TxCache::new()),
    ));
    orchestrator.set_capture_enabled(true);
    orchestrator
}
