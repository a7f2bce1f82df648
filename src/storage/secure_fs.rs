// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable key/value storage for credentials and install secrets.
//!
//! Every secret lives in its own small JSON document under
//! `{data_dir}/secrets/`. Writes go to a temp file first and are renamed into
//! place, so a crash mid-write leaves either the old or the new value and
//! never a truncated one.
//!
//! The platform keystore (when one exists) is expected to encrypt the data
//! directory; this module does plain filesystem I/O and does not implement
//! any cryptography of its own.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::StoragePaths;

/// Error type for durable storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations
    Io(io::Error),
    /// JSON serialization/deserialization error
    Json(serde_json::Error),
    /// Storage not initialized
    NotInitialized,
    /// The backing store refused the operation (keystore locked, quota, ...)
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Json(e) => write!(f, "JSON error: {e}"),
            StorageError::NotInitialized => write!(f, "Storage not initialized"),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string storage keyed by name.
///
/// Implementations must be safe to share across tasks. Reads of a missing key
/// return `Ok(None)`; only real backend failures are errors.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

/// On-disk document format for one secret.
#[derive(Debug, Serialize, Deserialize)]
struct SecretRecord {
    value: String,
}

/// File-backed secret store.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    paths: StoragePaths,
    initialized: bool,
}

impl FileSecretStore {
    /// Create a new store. Call `initialize()` before use.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    /// Create and initialize in one step.
    pub fn open(paths: StoragePaths) -> StorageResult<Self> {
        let mut store = Self::new(paths);
        store.initialize()?;
        Ok(store)
    }

    /// Get the storage paths.
    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Create the secrets directory. Safe to call multiple times.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(self.paths.secrets_dir())?;
        self.initialized = true;
        Ok(())
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.ensure_initialized()?;

        let file = match File::open(self.paths.secret(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: SecretRecord = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(record.value))
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        let path = self.paths.secret(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(
                &mut writer,
                &SecretRecord {
                    value: value.to_string(),
                },
            )?;
            writer.flush()?;
        }

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.ensure_initialized()?;

        match fs::remove_file(self.paths.secret(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory secret store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.values()?.remove(key);
        Ok(())
    }
}
