// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local cache of ledger transactions.
//!
//! Holds the transactions this device knows the ledger has stored, keyed by
//! reference. The key set doubles as the known reference index used for
//! duplicate detection; it is mutated only together with the records, so the
//! two can never disagree.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::ledger::models::LedgerTransaction;

#[derive(Default)]
struct CacheInner {
    by_reference: HashMap<String, LedgerTransaction>,
    /// Insertion order, oldest first.
    order: Vec<String>,
}

/// In-process transaction cache with a lock-step reference index.
#[derive(Default)]
pub struct TxCache {
    inner: Mutex<CacheInner>,
}

impl TxCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a transaction. Returns `false` if its reference was already known.
    pub fn insert(&self, tx: LedgerTransaction) -> bool {
        let mut inner = self.lock();
        if inner.by_reference.contains_key(&tx.tx_id) {
            return false;
        }
        inner.order.push(tx.tx_id.clone());
        inner.by_reference.insert(tx.tx_id.clone(), tx);
        true
    }

    /// Remove a transaction by reference.
    pub fn remove(&self, reference: &str) -> Option<LedgerTransaction> {
        let mut inner = self.lock();
        let removed = inner.by_reference.remove(reference)?;
        inner.order.retain(|r| r != reference);
        Some(removed)
    }

    /// Replace the whole cache, e.g. after a fresh listing from the ledger.
    pub fn replace_all(&self, txs: Vec<LedgerTransaction>) {
        let mut inner = self.lock();
        inner.by_reference.clear();
        inner.order.clear();
        for tx in txs {
            if !inner.by_reference.contains_key(&tx.tx_id) {
                inner.order.push(tx.tx_id.clone());
                inner.by_reference.insert(tx.tx_id.clone(), tx);
            }
        }
    }

    /// Drop everything (logout / session expiry).
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.by_reference.clear();
        inner.order.clear();
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.lock().by_reference.contains_key(reference)
    }

    pub fn get(&self, reference: &str) -> Option<LedgerTransaction> {
        self.lock().by_reference.get(reference).cloned()
    }

    /// Snapshot of the known reference set.
    pub fn known_references(&self) -> HashSet<String> {
        self.lock().by_reference.keys().cloned().collect()
    }

    /// All cached transactions, newest first.
    pub fn list(&self) -> Vec<LedgerTransaction> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .rev()
            .filter_map(|r| inner.by_reference.get(r).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().by_reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
