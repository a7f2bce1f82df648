// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ingestion Orchestrator
//!
//! Runs messages from every source through the same pipeline:
//!
//! ```text
//! classify -> parse -> duplicate check -> sign + submit -> cache -> Captured event
//! ```
//!
//! ## Concurrency
//!
//! - Each source (manual, poll, push, retry) has its own state. A trigger that
//!   arrives while its own source is `Checking` is answered with
//!   [`PassOutcome::Busy`]; other sources are not blocked by it.
//! - Passes share one submission gate, so two passes never interleave their
//!   submissions. The duplicate check runs under the gate, right before the
//!   submission, which is what keeps one message arriving through two sources
//!   from being stored twice.
//!
//! ## Failures
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Not a transaction / unparseable / duplicate | Skipped, counted in the report |
//! | Transient (network, timeout, 5xx) | Candidate held for [`IngestionOrchestrator::retry_pending`] |
//! | Validation (400/422) | Ledger message reported verbatim, candidate dropped |
//! | Session expired | Pass aborted, held candidates dropped, automatic capture halted |

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::api::LedgerApi;
use crate::ledger::models::{LedgerTransaction, TransactionCandidate};
use crate::sms::classifier::looks_like_transaction;
use crate::sms::dedupe::is_duplicate;
use crate::sms::parser::Parser;
use crate::sms::source::{RawMessage, SourceError};
use crate::storage::TxCache;

/// Capacity of the ingestion event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Where a pass's messages came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Text pasted by the user.
    Manual,
    /// Periodic inbox read.
    Poll,
    /// Message delivered by the host as it arrived.
    Push,
    /// Resubmission of held candidates.
    Retry,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Manual => "manual",
            SourceKind::Poll => "poll",
            SourceKind::Push => "push",
            SourceKind::Retry => "retry",
        }
    }

    /// Sources that only run while capture is enabled.
    fn is_automatic(&self) -> bool {
        matches!(self, SourceKind::Poll | SourceKind::Push)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceState {
    #[default]
    Idle,
    Checking,
    /// The last pass ended with errors.
    Error(String),
}

/// A per-candidate problem recorded in a pass report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    /// Held for retry.
    Retryable { reference: String, message: String },
    /// Dropped; `message` is what the ledger said.
    Rejected { reference: String, message: String },
    /// The source could not be read at all.
    SourceUnavailable(String),
}

impl std::fmt::Display for PassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassError::Retryable { reference, message } => {
                write!(f, "{reference}: {message} (will retry)")
            }
            PassError::Rejected { reference, message } => write!(f, "{reference}: {message}"),
            PassError::SourceUnavailable(reason) => write!(f, "source unavailable: {reason}"),
        }
    }
}

/// What one pass did.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub source: SourceKind,
    pub scanned: usize,
    pub not_transactions: usize,
    pub unparsed: usize,
    pub duplicates: usize,
    pub captured: Vec<LedgerTransaction>,
    pub errors: Vec<PassError>,
}

impl PassReport {
    fn new(source: SourceKind) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            source,
            scanned: 0,
            not_transactions: 0,
            unparsed: 0,
            duplicates: 0,
            captured: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_retryable(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, PassError::Retryable { .. }))
    }

    fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    Completed(PassReport),
    /// The same source already has a pass running.
    Busy,
    /// Automatic capture is disabled or halted by session expiry.
    Paused,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("check timed out")]
    Timeout,

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Broadcast to UI and other observers.
#[derive(Debug, Clone)]
pub enum IngestionEvent {
    Captured {
        source: SourceKind,
        transaction: LedgerTransaction,
    },
    PassFinished {
        pass_id: Uuid,
        source: SourceKind,
        captured: usize,
        errors: usize,
    },
    CaptureHalted,
}

/// Marks a source `Checking` for as long as it lives. A pass dropped halfway
/// (timeout) leaves the source in `Error` instead of stuck.
struct CheckingGuard<'a> {
    states: &'a Mutex<HashMap<SourceKind, SourceState>>,
    source: SourceKind,
    finished: Option<SourceState>,
}

impl CheckingGuard<'_> {
    fn finish(&mut self, state: SourceState) {
        self.finished = Some(state);
    }
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        let state = self
            .finished
            .take()
            .unwrap_or_else(|| SourceState::Error("check interrupted".to_string()));
        lock(self.states).insert(self.source, state);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub struct IngestionOrchestrator {
    ledger: LedgerApi,
    parser: Parser,
    cache: Arc<TxCache>,
    submission_gate: tokio::sync::Mutex<()>,
    states: Mutex<HashMap<SourceKind, SourceState>>,
    /// Candidates that failed transiently, in arrival order.
    pending: Mutex<Vec<TransactionCandidate>>,
    capture_enabled: AtomicBool,
    halted: AtomicBool,
    events: broadcast::Sender<IngestionEvent>,
}

impl IngestionOrchestrator {
    /// Capture starts disabled.
    pub fn new(ledger: LedgerApi, parser: Parser, cache: Arc<TxCache>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger,
            parser,
            cache,
            submission_gate: tokio::sync::Mutex::new(()),
            states: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            capture_enabled: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            events,
        }
    }

    pub fn cache(&self) -> &Arc<TxCache> {
        &self.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestionEvent> {
        self.events.subscribe()
    }

    pub fn set_capture_enabled(&self, enabled: bool) {
        self.capture_enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Automatic capture toggled");
    }

    pub fn capture_enabled(&self) -> bool {
        self.capture_enabled.load(Ordering::SeqCst)
    }

    /// True when automatic sources would run right now.
    pub fn capture_active(&self) -> bool {
        self.capture_enabled() && !self.halted.load(Ordering::SeqCst)
    }

    /// Stop automatic capture after session expiry and drop held candidates.
    pub fn halt(&self) {
        let dropped = {
            let mut pending = lock(&self.pending);
            let n = pending.len();
            pending.clear();
            n
        };
        if !self.halted.swap(true, Ordering::SeqCst) {
            warn!(dropped_pending = dropped, "Capture halted until re-authentication");
            let _ = self.events.send(IngestionEvent::CaptureHalted);
        }
    }

    /// Lift a halt after the user authenticated again.
    pub fn resume(&self) {
        if self.halted.swap(false, Ordering::SeqCst) {
            info!("Capture resumed");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn source_state(&self, source: SourceKind) -> SourceState {
        lock(&self.states).get(&source).cloned().unwrap_or_default()
    }

    /// Record that a source could not be read, as a pass with one error.
    pub fn record_source_error(&self, source: SourceKind, reason: impl Into<String>) -> PassReport {
        let reason = reason.into();
        warn!(source = %source, reason = %reason, "Message source error");
        let mut report = PassReport::new(source);
        report
            .errors
            .push(PassError::SourceUnavailable(reason.clone()));
        lock(&self.states).insert(source, SourceState::Error(reason));
        report
    }

    /// Number of candidates waiting for [`retry_pending`](Self::retry_pending).
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    fn try_begin(&self, source: SourceKind) -> Option<CheckingGuard<'_>> {
        let mut states = lock(&self.states);
        if states.get(&source) == Some(&SourceState::Checking) {
            return None;
        }
        states.insert(source, SourceState::Checking);
        Some(CheckingGuard {
            states: &self.states,
            source,
            finished: None,
        })
    }

    /// Run one ingestion pass over `messages`, in order.
    pub async fn run_pass(
        &self,
        source: SourceKind,
        messages: Vec<RawMessage>,
    ) -> Result<PassOutcome, IngestError> {
        if source.is_automatic() && !self.capture_active() {
            debug!(source = %source, "Capture inactive, pass skipped");
            return Ok(PassOutcome::Paused);
        }
        let Some(mut guard) = self.try_begin(source) else {
            debug!(source = %source, "Pass already running for source");
            return Ok(PassOutcome::Busy);
        };

        let _gate = self.submission_gate.lock().await;
        // Capture may have been halted while this pass waited for the gate.
        if source.is_automatic() && !self.capture_active() {
            debug!(source = %source, "Capture halted while waiting, pass skipped");
            guard.finish(SourceState::Idle);
            return Ok(PassOutcome::Paused);
        }

        let mut report = PassReport::new(source);
        info!(
            pass_id = %report.pass_id,
            source = %source,
            messages = messages.len(),
            "Ingestion pass starting"
        );

        for message in &messages {
            report.scanned += 1;
            if !looks_like_transaction(&message.body) {
                report.not_transactions += 1;
                continue;
            }
            let Some(candidate) = self.parser.parse_message(message) else {
                debug!(address = %message.address, "Message did not parse");
                report.unparsed += 1;
                continue;
            };
            if let Err(e) = self.submit_candidate(candidate, &mut report).await {
                guard.finish(SourceState::Error(e.to_string()));
                return Err(e);
            }
        }

        Ok(PassOutcome::Completed(self.finish_pass(report, &mut guard)))
    }

    /// Paste path: run one message through the pipeline.
    pub async fn submit_manual(&self, text: &str) -> Result<PassOutcome, IngestError> {
        self.run_pass(SourceKind::Manual, vec![RawMessage::manual(text)])
            .await
    }

    /// [`submit_manual`](Self::submit_manual) bounded by `timeout`. A timed out
    /// check is abandoned, including any credential refresh it started.
    pub async fn check_manual(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<PassOutcome, IngestError> {
        tokio::time::timeout(timeout, self.submit_manual(text))
            .await
            .map_err(|_| {
                warn!(timeout_ms = timeout.as_millis() as u64, "Manual check timed out");
                IngestError::Timeout
            })?
    }

    /// Push path: a message delivered by the host.
    pub async fn on_message_received(
        &self,
        message: RawMessage,
    ) -> Result<PassOutcome, IngestError> {
        self.run_pass(SourceKind::Push, vec![message]).await
    }

    /// Resubmit held candidates without re-reading any source.
    pub async fn retry_pending(&self) -> Result<PassOutcome, IngestError> {
        let Some(mut guard) = self.try_begin(SourceKind::Retry) else {
            return Ok(PassOutcome::Busy);
        };

        let _gate = self.submission_gate.lock().await;
        let held: Vec<TransactionCandidate> = lock(&self.pending).clone();
        let mut report = PassReport::new(SourceKind::Retry);
        info!(pass_id = %report.pass_id, held = held.len(), "Retrying held candidates");

        for candidate in held {
            report.scanned += 1;
            if let Err(e) = self.submit_candidate(candidate, &mut report).await {
                guard.finish(SourceState::Error(e.to_string()));
                return Err(e);
            }
            if report.has_retryable() {
                // Still failing; leave the rest held without hammering the ledger.
                break;
            }
        }

        Ok(PassOutcome::Completed(self.finish_pass(report, &mut guard)))
    }

    fn finish_pass(&self, report: PassReport, guard: &mut CheckingGuard<'_>) -> PassReport {
        if report.errors.is_empty() {
            guard.finish(SourceState::Idle);
        } else {
            guard.finish(SourceState::Error(report.summary()));
        }

        info!(
            pass_id = %report.pass_id,
            source = %report.source,
            scanned = report.scanned,
            captured = report.captured.len(),
            duplicates = report.duplicates,
            unparsed = report.unparsed,
            errors = report.errors.len(),
            "Ingestion pass finished"
        );
        let _ = self.events.send(IngestionEvent::PassFinished {
            pass_id: report.pass_id,
            source: report.source,
            captured: report.captured.len(),
            errors: report.errors.len(),
        });
        report
    }

    /// Duplicate check, submission and bookkeeping for one candidate. Must be
    /// called with the submission gate held.
    async fn submit_candidate(
        &self,
        candidate: TransactionCandidate,
        report: &mut PassReport,
    ) -> Result<(), IngestError> {
        let reference = candidate.reference_id.clone();

        if is_duplicate(&reference, self.cache.as_ref()) {
            info!(reference = %reference, "Duplicate transaction skipped");
            self.release(&reference);
            report.duplicates += 1;
            return Ok(());
        }

        match self.ledger.submit_transaction(&candidate).await {
            Ok(stored) => {
                self.release(&reference);
                self.cache.insert(stored.clone());
                let _ = self.events.send(IngestionEvent::Captured {
                    source: report.source,
                    transaction: stored.clone(),
                });
                report.captured.push(stored);
                Ok(())
            }
            Err(e) if e.is_session_expired() => {
                self.halt();
                Err(IngestError::SessionExpired)
            }
            Err(e) if e.is_transient() => {
                warn!(reference = %reference, error = %e, "Submission failed, holding for retry");
                self.hold(candidate);
                report.errors.push(PassError::Retryable {
                    reference,
                    message: e.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Submission rejected");
                self.release(&reference);
                report.errors.push(PassError::Rejected {
                    reference,
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Keep a candidate for retry, replacing an older copy of the same reference.
    fn hold(&self, candidate: TransactionCandidate) {
        let mut pending = lock(&self.pending);
        match pending
            .iter_mut()
            .find(|held| held.reference_id == candidate.reference_id)
        {
            Some(held) => *held = candidate,
            None => pending.push(candidate),
        }
    }

    fn release(&self, reference: &str) {
        lock(&self.pending).retain(|held| held.reference_id != reference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::models::Platform;
    use crate::test_support::{orchestrator_for, MockLedger};
    use serde_json::json;

    const YANGO_SMS: &str =
        "You have received GHS 50.00 from YANGO GH. Ref: AB123. Your balance is GHS 150.00.";
    const BOLT_SMS: &str = "Payment received for GHS 33.33 from BOLT GH. Ref: BT777.";

    async fn setup() -> (MockLedger, Arc<IngestionOrchestrator>) {
        let ledger = MockLedger::spawn().await;
        let orchestrator = orchestrator_for(&ledger).await;
        (ledger, orchestrator)
    }

    fn completed(outcome: PassOutcome) -> PassReport {
        match outcome {
            PassOutcome::Completed(report) => report,
            other => panic!("expected a completed pass, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn manual_paste_is_captured() {
        let (ledger, orchestrator) = setup().await;
        let mut events = orchestrator.subscribe();

        let report = completed(orchestrator.submit_manual(YANGO_SMS).await.unwrap());
        assert_eq!(report.captured.len(), 1);
        assert_eq!(report.captured[0].tx_id, "AB123");
        assert_eq!(report.captured[0].platform, Platform::Yango);
        assert!(orchestrator.cache().contains("AB123"));
        assert_eq!(orchestrator.source_state(SourceKind::Manual), SourceState::Idle);

        let stored = ledger.state.transactions();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["platform_debt"], "5.00");

        match events.recv().await.unwrap() {
            IngestionEvent::Captured { source, transaction } => {
                assert_eq!(source, SourceKind::Manual);
                assert_eq!(transaction.tx_id, "AB123");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_message_through_two_sources_is_stored_once() {
        let (ledger, orchestrator) = setup().await;

        let manual = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.submit_manual(YANGO_SMS).await })
        };
        let push = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .on_message_received(RawMessage::new("MobileMoney", YANGO_SMS, 1))
                    .await
            })
        };
        let a = completed(manual.await.unwrap().unwrap());
        let b = completed(push.await.unwrap().unwrap());

        assert_eq!(a.captured.len() + b.captured.len(), 1);
        assert_eq!(a.duplicates + b.duplicates, 1);
        assert_eq!(ledger.state.transactions().len(), 1);
        assert_eq!(ledger.state.submit_calls(), 1);
    }

    #[tokio::test]
    async fn pass_counts_skips_and_keeps_order() {
        let (_ledger, orchestrator) = setup().await;
        let messages = vec![
            RawMessage::new("MTN", "Your OTP is 482910", 1),
            RawMessage::new("MobileMoney", YANGO_SMS, 2),
            RawMessage::new("MobileMoney", "You have received money, Ref: 55", 3),
            RawMessage::new("MobileMoney", BOLT_SMS, 4),
            RawMessage::new("MobileMoney", YANGO_SMS, 5),
        ];

        let report = completed(
            orchestrator
                .run_pass(SourceKind::Poll, messages)
                .await
                .unwrap(),
        );
        assert_eq!(report.scanned, 5);
        assert_eq!(report.not_transactions, 1);
        assert_eq!(report.unparsed, 1);
        assert_eq!(report.duplicates, 1);
        let refs: Vec<&str> = report.captured.iter().map(|t| t.tx_id.as_str()).collect();
        assert_eq!(refs, vec!["AB123", "BT777"]);
    }

    #[tokio::test]
    async fn transient_failure_is_held_and_retried() {
        let (ledger, orchestrator) = setup().await;
        ledger
            .state
            .set_submit_failure(Some((503, json!({ "detail": "maintenance" }))));

        let report = completed(orchestrator.submit_manual(YANGO_SMS).await.unwrap());
        assert!(report.has_retryable());
        assert_eq!(orchestrator.pending_count(), 1);
        assert!(matches!(
            orchestrator.source_state(SourceKind::Manual),
            SourceState::Error(_)
        ));

        ledger.state.set_submit_failure(None);
        let retried = completed(orchestrator.retry_pending().await.unwrap());
        assert_eq!(retried.captured.len(), 1);
        assert_eq!(orchestrator.pending_count(), 0);
        assert_eq!(ledger.state.transactions().len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_is_reported_verbatim_and_dropped() {
        let (ledger, orchestrator) = setup().await;
        ledger
            .state
            .set_submit_failure(Some((400, json!({ "detail": "Amount does not match split" }))));

        let report = completed(orchestrator.submit_manual(YANGO_SMS).await.unwrap());
        assert_eq!(
            report.errors,
            vec![PassError::Rejected {
                reference: "AB123".to_string(),
                message: "Amount does not match split".to_string(),
            }]
        );
        assert_eq!(orchestrator.pending_count(), 0);
        assert!(!orchestrator.cache().contains("AB123"));
    }

    #[tokio::test]
    async fn session_expiry_aborts_and_halts_capture() {
        let (ledger, orchestrator) = setup().await;
        ledger
            .state
            .set_submit_failure(Some((503, json!({ "detail": "maintenance" }))));
        orchestrator.submit_manual(BOLT_SMS).await.unwrap();
        assert_eq!(orchestrator.pending_count(), 1);

        ledger.state.set_submit_failure(None);
        ledger.state.expire_access();
        ledger.state.revoke_refresh();

        let err = orchestrator.submit_manual(YANGO_SMS).await.unwrap_err();
        assert!(matches!(err, IngestError::SessionExpired));
        assert!(orchestrator.is_halted());
        assert_eq!(orchestrator.pending_count(), 0);

        let outcome = orchestrator
            .on_message_received(RawMessage::new("MobileMoney", YANGO_SMS, 1))
            .await
            .unwrap();
        assert!(matches!(outcome, PassOutcome::Paused));

        orchestrator.resume();
        assert!(orchestrator.capture_active());
    }

    #[tokio::test]
    async fn disabled_capture_pauses_automatic_sources_only() {
        let (_ledger, orchestrator) = setup().await;
        orchestrator.set_capture_enabled(false);

        let push = orchestrator
            .on_message_received(RawMessage::new("MobileMoney", YANGO_SMS, 1))
            .await
            .unwrap();
        assert!(matches!(push, PassOutcome::Paused));

        let manual = completed(orchestrator.submit_manual(YANGO_SMS).await.unwrap());
        assert_eq!(manual.captured.len(), 1);
    }

    #[tokio::test]
    async fn retrigger_of_checking_source_is_busy() {
        let (_ledger, orchestrator) = setup().await;

        let guard = orchestrator.try_begin(SourceKind::Push).unwrap();
        let outcome = orchestrator
            .on_message_received(RawMessage::new("MobileMoney", YANGO_SMS, 1))
            .await
            .unwrap();
        assert!(matches!(outcome, PassOutcome::Busy));

        // Another source is not blocked.
        let manual = completed(orchestrator.submit_manual(YANGO_SMS).await.unwrap());
        assert_eq!(manual.captured.len(), 1);

        drop(guard);
        assert!(matches!(
            orchestrator.source_state(SourceKind::Push),
            SourceState::Error(_)
        ));
    }

    #[tokio::test]
    async fn halt_while_waiting_for_gate_pauses_poll_pass() {
        let (ledger, orchestrator) = setup().await;
        let gate = orchestrator.submission_gate.lock().await;

        let poll = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .run_pass(
                        SourceKind::Poll,
                        vec![RawMessage::new("MobileMoney", YANGO_SMS, 1)],
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            orchestrator.source_state(SourceKind::Poll),
            SourceState::Checking
        );

        orchestrator.halt();
        drop(gate);

        let outcome = poll.await.unwrap().unwrap();
        assert!(matches!(outcome, PassOutcome::Paused));
        assert_eq!(orchestrator.source_state(SourceKind::Poll), SourceState::Idle);
        assert_eq!(ledger.state.submit_calls(), 0);
    }

    #[tokio::test]
    async fn timed_out_check_does_not_leave_source_checking() {
        let (ledger, orchestrator) = setup().await;
        ledger.state.set_refresh_delay(Duration::from_millis(400));
        ledger.state.expire_access();

        let err = orchestrator
            .check_manual(YANGO_SMS, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Timeout));
        assert_ne!(
            orchestrator.source_state(SourceKind::Manual),
            SourceState::Checking
        );
        assert!(ledger.state.transactions().is_empty());
    }

    #[tokio::test]
    async fn source_error_is_recorded() {
        let (_ledger, orchestrator) = setup().await;
        let report = orchestrator.record_source_error(SourceKind::Poll, "no inbox");
        assert_eq!(
            report.errors,
            vec![PassError::SourceUnavailable("no inbox".to_string())]
        );
        assert_eq!(
            orchestrator.source_state(SourceKind::Poll),
            SourceState::Error("no inbox".to_string())
        );
    }
}
