// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store with an in-memory read cache.
//!
//! The durable [`SecretStore`] is the source of truth across restarts; the
//! cache only saves repeated reads. Writes hit durable storage first and the
//! cache second, so a failed write never leaves the cache ahead of disk.
//! Writers take their turn on a separate lock; cache readers are never held
//! up by a durable write in progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use crate::storage::{SecretStore, StorageResult};

/// Which credential of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    Access,
    Refresh,
}

impl CredentialKind {
    /// Durable storage key.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CredentialKind::Access => "accessToken",
            CredentialKind::Refresh => "refreshToken",
        }
    }
}

/// Access + refresh credential snapshot.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("has_access", &self.access.is_some())
            .field("has_refresh", &self.refresh.is_some())
            .finish()
    }
}

/// Cached credential store.
pub struct CredentialStore {
    durable: Arc<dyn SecretStore>,
    /// A missing entry means "not loaded yet"; `Some(None)` means "known absent".
    cache: RwLock<HashMap<CredentialKind, Option<String>>>,
    /// Serializes writers so durable order and cache order agree.
    writer: Mutex<()>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn SecretStore>) -> Self {
        Self {
            durable,
            cache: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn cache_mut(&self) -> RwLockWriteGuard<'_, HashMap<CredentialKind, Option<String>>> {
        self.cache
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The durable store backing this cache.
    pub fn durable(&self) -> &Arc<dyn SecretStore> {
        &self.durable
    }

    /// Read a credential, loading it from durable storage on a cold cache.
    pub fn get(&self, kind: CredentialKind) -> StorageResult<Option<String>> {
        {
            let cache = self
                .cache
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(cached) = cache.get(&kind) {
                return Ok(cached.clone());
            }
        }

        let loaded = self.durable.get(kind.storage_key())?;
        let mut cache = self.cache_mut();
        // A concurrent set() may have landed while we were reading disk; keep
        // the newer value.
        Ok(cache.entry(kind).or_insert(loaded).clone())
    }

    /// Store a credential durably, then in the cache.
    pub fn set(&self, kind: CredentialKind, token: &str) -> StorageResult<()> {
        let _writer = self.writer();
        self.durable.put(kind.storage_key(), token)?;
        self.cache_mut().insert(kind, Some(token.to_string()));
        Ok(())
    }

    /// Both credentials.
    pub fn pair(&self) -> StorageResult<CredentialPair> {
        Ok(CredentialPair {
            access: self.get(CredentialKind::Access)?,
            refresh: self.get(CredentialKind::Refresh)?,
        })
    }

    /// Store both credentials (login).
    pub fn set_pair(&self, access: &str, refresh: &str) -> StorageResult<()> {
        self.set(CredentialKind::Access, access)?;
        self.set(CredentialKind::Refresh, refresh)
    }

    /// Remove both credentials from durable storage and the cache.
    pub fn clear(&self) -> StorageResult<()> {
        let _writer = self.writer();
        // Forget the cache first: if a durable delete fails the next read
        // goes back to disk instead of trusting a stale value.
        self.cache_mut().clear();
        self.durable.delete(CredentialKind::Access.storage_key())?;
        self.durable.delete(CredentialKind::Refresh.storage_key())?;
        let mut cache = self.cache_mut();
        cache.insert(CredentialKind::Access, None);
        cache.insert(CredentialKind::Refresh, None);
        Ok(())
    }

    /// Drop the in-memory cache without touching durable storage.
    pub fn invalidate_cache(&self) {
        self.cache_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemorySecretStore, StorageError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    /// Counts durable reads so cache hits can be asserted.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySecretStore,
        reads: AtomicUsize,
        fail_writes: bool,
        write_delay: Duration,
    }

    impl SecretStore for CountingStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> StorageResult<()> {
            if self.fail_writes {
                return Err(StorageError::Unavailable("keystore locked".to_string()));
            }
            std::thread::sleep(self.write_delay);
            self.inner.put(key, value)
        }

        fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn cold_cache_reads_durable_once() {
        let durable = Arc::new(CountingStore::default());
        durable.inner.put("accessToken", "a-1").unwrap();
        let store = CredentialStore::new(durable.clone());

        assert_eq!(store.get(CredentialKind::Access).unwrap(), Some("a-1".into()));
        assert_eq!(store.get(CredentialKind::Access).unwrap(), Some("a-1".into()));
        assert_eq!(durable.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absence_is_cached_too() {
        let durable = Arc::new(CountingStore::default());
        let store = CredentialStore::new(durable.clone());

        assert_eq!(store.get(CredentialKind::Refresh).unwrap(), None);
        assert_eq!(store.get(CredentialKind::Refresh).unwrap(), None);
        assert_eq!(durable.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_writes_through() {
        let durable = Arc::new(CountingStore::default());
        let store = CredentialStore::new(durable.clone());

        store.set_pair("a-1", "r-1").unwrap();
        assert_eq!(durable.inner.get("accessToken").unwrap(), Some("a-1".into()));
        assert_eq!(durable.inner.get("refreshToken").unwrap(), Some("r-1".into()));
        assert_eq!(
            store.pair().unwrap(),
            CredentialPair {
                access: Some("a-1".into()),
                refresh: Some("r-1".into()),
            }
        );
        assert_eq!(durable.reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clear_empties_cache_and_durable() {
        let durable = Arc::new(CountingStore::default());
        let store = CredentialStore::new(durable.clone());
        store.set_pair("a-1", "r-1").unwrap();

        store.clear().unwrap();
        assert_eq!(store.pair().unwrap(), CredentialPair::default());
        assert_eq!(durable.inner.get("accessToken").unwrap(), None);
        assert_eq!(durable.inner.get("refreshToken").unwrap(), None);
    }

    #[test]
    fn durable_write_failure_propagates_and_keeps_cache_unchanged() {
        let durable = Arc::new(CountingStore {
            fail_writes: true,
            ..Default::default()
        });
        let store = CredentialStore::new(durable);

        let err = store.set(CredentialKind::Access, "a-1").unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert_eq!(store.get(CredentialKind::Access).unwrap(), None);
    }

    #[test]
    fn reads_are_not_blocked_by_slow_durable_write() {
        let durable = Arc::new(CountingStore {
            write_delay: Duration::from_millis(300),
            ..Default::default()
        });
        durable.inner.put("accessToken", "a-1").unwrap();
        let store = Arc::new(CredentialStore::new(durable.clone()));
        assert_eq!(store.get(CredentialKind::Access).unwrap(), Some("a-1".into()));

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || store.set(CredentialKind::Access, "a-2"))
        };
        std::thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        assert_eq!(store.get(CredentialKind::Access).unwrap(), Some("a-1".into()));
        assert!(started.elapsed() < Duration::from_millis(150));

        writer.join().unwrap().unwrap();
        assert_eq!(store.get(CredentialKind::Access).unwrap(), Some("a-2".into()));
        assert_eq!(durable.inner.get("accessToken").unwrap(), Some("a-2".into()));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let pair = CredentialPair {
            access: Some("secret-access".into()),
            refresh: None,
        };
        let debug = format!("{pair:?}");
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("has_access: true"));
    }
}
