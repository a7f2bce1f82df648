// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mobile-money notification parser.
//!
//! Extracts amount, reference and counterparty from a notification and
//! applies the platform commission split. Parsing is a pure function of the
//! text and the parser settings: the same text always yields the same
//! candidate. A message without a usable amount or reference yields `None`.
//!
//! ```text
//! You have received GHS 50.00 from YANGO GH. Ref: 1234567890.
//! Fee: GHS 0.00. Your balance is GHS 150.00.
//!                 ^^^^^ amount        ^^^^^^^^^^ reference
//!                            ^^^^^^^^ counterparty -> platform YANGO
//! ```

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use super::commission::CommissionRates;
use super::source::RawMessage;
use crate::ledger::models::{Platform, TransactionCandidate};

/// Amounts at or above this are treated as balance figures, not payments.
pub const DEFAULT_MAX_AMOUNT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\bGHS|\bGHC|\bGH₵)\s*\.?\s*(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)",
    )
    .expect("valid regex")
});

/// `Amount: 25.00`, `Amt 25`, `Received: 25.00` without a currency marker.
static LABELLED_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:amount|amt|received)\s*:?\s*(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)\b",
    )
    .expect("valid regex")
});

/// `50.00 received` / `50.00 paid`. Two decimals are required.
static TRAILING_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\s*(?:received|paid)\b")
        .expect("valid regex")
});

/// Amount forms in order of preference. A later form is only tried when no
/// earlier one matched outside a balance or fee.
static AMOUNT_FORMS: [&LazyLock<Regex>; 3] = [&AMOUNT, &LABELLED_AMOUNT, &TRAILING_AMOUNT];

/// Matches when the text right before an amount introduces a balance or fee.
static TRAP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:balance|bal|fee|fees|charge|charges|charged)\b\W*(?:is|of|was|now)?\W*$")
        .expect("valid regex")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:ref(?:erence)?|transaction\s+id|txn\s+id|trans\s+id|id)\b[\s:.#]*(?:(?:no|number)\b[\s:.#]*)?([A-Za-z0-9]+)",
    )
    .expect("valid regex")
});

static COUNTERPARTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bfrom\s+(.+?)(?:\.\s|\.$|[,;:]|\s+(?:ref|reference|transaction\s+id|txn\s+id|on|at)\b|$)",
    )
    .expect("valid regex")
});

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parser {
    pub rates: CommissionRates,
    /// Exclusive ceiling for a plausible payment amount.
    pub max_amount: Decimal,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            rates: CommissionRates::default(),
            max_amount: DEFAULT_MAX_AMOUNT,
        }
    }
}

impl Parser {
    pub fn new(rates: CommissionRates, max_amount: Decimal) -> Self {
        Self { rates, max_amount }
    }

    /// Parse notification text. `received_at` is left unset.
    pub fn parse(&self, text: &str) -> Option<TransactionCandidate> {
        let Some(amount) = self.extract_amount(text) else {
            debug!("No usable amount in message");
            return None;
        };
        let Some(reference_id) = extract_reference(text) else {
            debug!("No reference in message");
            return None;
        };

        let counterparty = extract_counterparty(text);
        let platform = match &counterparty {
            Some(name) => Platform::from_text(name),
            None => Platform::from_text(text),
        };
        let split = self.rates.split(amount, platform);

        Some(TransactionCandidate {
            reference_id,
            amount_received: amount,
            rider_profit: split.rider_profit,
            platform_debt: split.platform_debt,
            platform,
            is_tip: false,
            counterparty,
            received_at: None,
        })
    }

    /// Parse a raw message, stamping the candidate with its delivery time.
    pub fn parse_message(&self, message: &RawMessage) -> Option<TransactionCandidate> {
        let mut candidate = self.parse(&message.body)?;
        candidate.received_at = message.received_at();
        Some(candidate)
    }

    fn extract_amount(&self, text: &str) -> Option<Decimal> {
        let amount = AMOUNT_FORMS
            .iter()
            .find_map(|form| first_untrapped(form, text))
            .and_then(|raw| Decimal::from_str(&raw.replace(',', "")).ok())?;

        if amount <= Decimal::ZERO || amount >= self.max_amount {
            debug!(amount = %amount, "Amount outside plausible range");
            return None;
        }
        Some(amount)
    }
}

fn first_untrapped<'t>(form: &Regex, text: &'t str) -> Option<&'t str> {
    form.captures_iter(text)
        .filter(|caps| {
            caps.get(0)
                .is_some_and(|m| !TRAP_PREFIX.is_match(&text[..m.start()]))
        })
        .find_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn extract_reference(text: &str) -> Option<String> {
    REFERENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

fn extract_counterparty(text: &str) -> Option<String> {
    let name = COUNTERPARTY.captures(text)?.get(1)?.as_str().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
