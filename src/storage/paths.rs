// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-device data directory.

use std::path::{Path, PathBuf};

/// Default base directory for persisted engine data.
pub const DATA_ROOT: &str = "./data";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all persisted data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Secret Paths ==========

    /// Directory holding credentials, settings flags and the signing secret.
    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join("secrets")
    }

    /// Path to the file backing a single secret key.
    ///
    /// Keys are restricted to `[A-Za-z0-9_-]`; anything else is replaced with
    /// `_` so a key can never escape the secrets directory.
    pub fn secret(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.secrets_dir().join(format!("{sanitized}.json"))
    }

    // ========== Inbox Paths ==========

    /// Default location of the JSON SMS inbox read by the periodic poller.
    pub fn inbox(&self) -> PathBuf {
        self.root.join("inbox.json")
    }
}
