// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! momo-sync - mobile-money transaction capture and ledger sync
//!
//! Reads mobile-money SMS notifications, extracts payments, splits off the
//! platform commission and records each payment once in a remote ledger
//! through an authenticated client that refreshes its session transparently.
//!
//! ## Modules
//!
//! - `auth` - Credentials, authenticated request client, session
//! - `sms` - Message sources, classifier, parser, duplicate guard
//! - `ledger` - Wire types, request signing, typed ledger calls
//! - `ingest` - Ingestion orchestrator, inbox poller, push listener
//! - `storage` - Durable secrets and the transaction cache
//! - `state` - Engine wiring

pub mod auth;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod logging;
pub mod sms;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
