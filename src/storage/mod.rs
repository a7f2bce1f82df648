// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Storage Module
//!
//! Durable secrets (credentials, settings flags, the request-signing secret)
//! and the in-process ledger transaction cache.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   secrets/
//!     accessToken.json
//!     refreshToken.json
//!     rememberMe.json
//!     sms_api_secret.json
//!   inbox.json          # Optional SMS inbox read by the poller
//! ```

pub mod paths;
pub mod secure_fs;
pub mod tx_cache;

pub use paths::StoragePaths;
pub use secure_fs::{
    FileSecretStore, MemorySecretStore, SecretStore, StorageError, StorageResult,
};
pub use tx_cache::TxCache;
