// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Inbox Poller
//!
//! Background task that periodically reads the most recent messages from the
//! detected message source and runs them through the orchestrator.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 300 s) the poller:
//! 1. Skips the sweep unless capture is active and the session is
//!    authenticated.
//! 2. Resubmits candidates held from earlier transient failures.
//! 3. Reads the last `batch_size` messages and runs an ingestion pass.
//!    Messages seen before are filtered out by the duplicate guard.
//!
//! A missing message source is reported as a pass error on every sweep; the
//! poller never probes for a source itself.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::orchestrator::{IngestError, IngestionOrchestrator, PassOutcome, SourceKind};
use crate::sms::source::{Capability, SourceError};

/// Default interval between polling sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Default number of recent messages read per sweep.
pub const DEFAULT_BATCH_SIZE: usize = 10;

pub struct Poller {
    orchestrator: Arc<IngestionOrchestrator>,
    capability: Capability,
    session: watch::Receiver<bool>,
    poll_interval: Duration,
    batch_size: usize,
}

impl Poller {
    pub fn new(
        orchestrator: Arc<IngestionOrchestrator>,
        capability: Capability,
        session: watch::Receiver<bool>,
    ) -> Self {
        Self {
            orchestrator,
            capability,
            session,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            source_available = self.capability.is_available(),
            "Inbox poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Inbox poller shutting down");
                return;
            }

            match self.poll_once().await {
                Ok(Some(PassOutcome::Completed(report))) if !report.errors.is_empty() => {
                    warn!(
                        pass_id = %report.pass_id,
                        errors = report.errors.len(),
                        "Inbox poller: pass finished with errors"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Inbox poller: sweep failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Inbox poller shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep. `None` when the sweep was skipped.
    pub async fn poll_once(&self) -> Result<Option<PassOutcome>, IngestError> {
        if !self.orchestrator.capture_active() {
            debug!("Inbox poller: capture inactive, skipping");
            return Ok(None);
        }
        if !*self.session.borrow() {
            debug!("Inbox poller: not authenticated, skipping");
            return Ok(None);
        }

        let source = match &self.capability {
            Capability::Available(source) => source.clone(),
            Capability::Unavailable(reason) => {
                let report = self
                    .orchestrator
                    .record_source_error(SourceKind::Poll, reason.clone());
                return Ok(Some(PassOutcome::Completed(report)));
            }
        };

        if self.orchestrator.pending_count() > 0 {
            self.orchestrator.retry_pending().await?;
        }

        let limit = self.batch_size;
        let messages = tokio::task::spawn_blocking(move || source.recent(limit))
            .await
            .map_err(|e| SourceError::Unavailable(format!("inbox reader failed: {e}")))
            .and_then(|read| read)
            .inspect_err(|e| {
                self.orchestrator
                    .record_source_error(SourceKind::Poll, e.to_string());
            })?;

        debug!(count = messages.len(), "Inbox poller: read messages");
        Ok(Some(
            self.orchestrator
                .run_pass(SourceKind::Poll, messages)
                .await?,
        ))
    }
}
