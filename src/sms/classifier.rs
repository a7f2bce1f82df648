// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cheap pre-filter deciding whether a message is worth parsing.
//!
//! Tuned for recall: a false positive costs one failed parse, a false
//! negative loses a payment.

use std::sync::LazyLock;

use regex::Regex;

static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bGHS|\bGHC|\bGH₵)\s*\.?\s*\d").expect("valid regex")
});

static SETTLEMENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:received|payment|paid|sent|transfer(?:red)?|credited|debited|cash\s+in|momo|mobile\s+money|you\s+have)\b",
    )
    .expect("valid regex")
});

static REFERENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ref|reference|transaction\s+id|txn\s+id)\b")
        .expect("valid regex")
});

/// True when the text carries a currency amount, a settlement keyword or a
/// reference marker.
pub fn looks_like_transaction(text: &str) -> bool {
    CURRENCY_AMOUNT.is_match(text)
        || SETTLEMENT_KEYWORD.is_match(text)
        || REFERENCE_MARKER.is_match(text)
}
