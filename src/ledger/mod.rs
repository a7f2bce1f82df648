// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Module
//!
//! Wire types, request signing and typed REST calls for the remote ledger.

pub mod api;
pub mod models;
pub mod signing;

pub use api::{LedgerApi, LedgerError};
pub use models::{
    ExpenseCategory, ExpenseDraft, LedgerExpense, LedgerTransaction, Platform,
    TransactionCandidate,
};
pub use signing::{RequestSigner, Signable, SigningError};
