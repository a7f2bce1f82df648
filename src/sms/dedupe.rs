// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Duplicate guard keyed on transaction reference.

use std::collections::HashSet;

use crate::storage::TxCache;

/// An index of references the ledger already holds.
pub trait KnownReferences {
    fn contains_reference(&self, reference: &str) -> bool;
}

impl KnownReferences for HashSet<String> {
    fn contains_reference(&self, reference: &str) -> bool {
        self.contains(reference)
    }
}

impl KnownReferences for TxCache {
    fn contains_reference(&self, reference: &str) -> bool {
        self.contains(reference)
    }
}

/// True when `reference` is already known.
pub fn is_duplicate<K: KnownReferences + ?Sized>(reference: &str, known: &K) -> bool {
    known.contains_reference(reference)
}
