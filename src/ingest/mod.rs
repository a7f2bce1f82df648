// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ingestion Module
//!
//! Message sources (manual paste, inbox poll, host push) feeding one
//! orchestrated capture pipeline.

pub mod listener;
pub mod orchestrator;
pub mod poller;

pub use listener::PushListener;
pub use orchestrator::{
    IngestError, IngestionEvent, IngestionOrchestrator, PassError, PassOutcome, PassReport,
    SourceKind, SourceState,
};
pub use poller::Poller;
