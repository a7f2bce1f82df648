// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Push listener: feeds messages delivered by the host into the orchestrator
//! one at a time, as they arrive.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::orchestrator::{IngestError, IngestionOrchestrator, PassOutcome};
use crate::sms::source::RawMessage;

/// Default capacity of the push channel.
pub const DEFAULT_PUSH_CAPACITY: usize = 32;

pub struct PushListener {
    orchestrator: Arc<IngestionOrchestrator>,
    receiver: mpsc::Receiver<RawMessage>,
}

impl PushListener {
    /// Listener plus the sender the host delivers messages into.
    pub fn new(
        orchestrator: Arc<IngestionOrchestrator>,
        capacity: usize,
    ) -> (Self, mpsc::Sender<RawMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                orchestrator,
                receiver,
            },
            sender,
        )
    }

    /// Consume messages until shutdown or until every sender is gone.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Push listener starting");
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => break,
                message = self.receiver.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            match self.orchestrator.on_message_received(message).await {
                Ok(PassOutcome::Completed(report)) => {
                    debug!(captured = report.captured.len(), "Push message processed");
                }
                Ok(PassOutcome::Paused) => debug!("Capture paused, push message ignored"),
                Ok(PassOutcome::Busy) => warn!("Push source busy, message dropped"),
                Err(IngestError::SessionExpired) => {
                    warn!("Session expired while processing push message");
                }
                Err(e) => warn!(error = %e, "Push message failed"),
            }
        }
        info!("Push listener shutting down");
    }
}
