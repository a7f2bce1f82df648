// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire and domain types shared by the parser, the ledger API and the cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Earning platform a payment is attributed to.
///
/// Ride-hailing platforms take a commission from every payout; `Private`
/// covers person-to-person transfers that owe nothing to anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Yango,
    Bolt,
    Private,
}

impl Platform {
    /// Platforms that can be recognised by name in a message.
    pub const KNOWN: [Platform; 2] = [Platform::Yango, Platform::Bolt];

    /// Wire name used by the ledger and in request hashes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Yango => "YANGO",
            Platform::Bolt => "BOLT",
            Platform::Private => "PRIVATE",
        }
    }

    /// Classify free text by case-insensitive substring match against the
    /// known platform names, defaulting to `Private`.
    pub fn from_text(text: &str) -> Self {
        let upper = text.to_uppercase();
        Self::KNOWN
            .into_iter()
            .find(|platform| upper.contains(platform.as_str()))
            .unwrap_or(Platform::Private)
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Platform::Private)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, not-yet-submitted transaction derived from one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionCandidate {
    /// Reference printed in the message; the idempotency key of the pipeline.
    pub reference_id: String,
    pub amount_received: Decimal,
    pub rider_profit: Decimal,
    pub platform_debt: Decimal,
    pub platform: Platform,
    /// Always `false` at parse time; tips are flagged later by the user.
    pub is_tip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    /// Delivery time of the source message, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl TransactionCandidate {
    /// `rider_profit + platform_debt == amount_received`, and private
    /// transfers carry no platform debt.
    pub fn split_is_consistent(&self) -> bool {
        self.rider_profit + self.platform_debt == self.amount_received
            && (!self.platform.is_private() || self.platform_debt.is_zero())
    }
}

/// Transaction record as stored by the remote ledger.
///
/// The split fields here are authoritative and may differ from the local
/// estimate that was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub tx_id: String,
    pub amount_received: Decimal,
    pub rider_profit: Decimal,
    pub platform_debt: Decimal,
    pub platform: Platform,
    #[serde(default)]
    pub is_tip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Expense categories accepted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseCategory {
    Fuel,
    Data,
    Food,
    Repairs,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Fuel => "FUEL",
            ExpenseCategory::Data => "DATA",
            ExpenseCategory::Food => "FOOD",
            ExpenseCategory::Repairs => "REPAIRS",
            ExpenseCategory::Other => "OTHER",
        }
    }
}

/// An expense about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Expense record as stored by the remote ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerExpense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_text_is_case_insensitive() {
        assert_eq!(Platform::from_text("yango gh"), Platform::Yango);
        assert_eq!(Platform::from_text("Bolt Food"), Platform::Bolt);
        assert_eq!(Platform::from_text("KWAME MENSAH"), Platform::Private);
    }

    #[test]
    fn platform_wire_names() {
        assert_eq!(serde_json::to_string(&Platform::Yango).unwrap(), r#""YANGO""#);
        let parsed: Platform = serde_json::from_str(r#""PRIVATE""#).unwrap();
        assert_eq!(parsed, Platform::Private);
    }

    #[test]
    fn ledger_transaction_accepts_string_decimals() {
        let json = r#"{
            "id": 7,
            "tx_id": "AB123",
            "amount_received": "50.00",
            "rider_profit": "45.00",
            "platform_debt": "5.00",
            "platform": "YANGO",
            "is_tip": false,
            "created_at": "2026-10-16T09:30:00Z"
        }"#;
        let tx: LedgerTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, Some(7));
        assert_eq!(tx.amount_received, Decimal::new(5000, 2));
        assert_eq!(tx.platform, Platform::Yango);
        assert!(tx.created_at.is_some());
    }

    #[test]
    fn expense_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExpenseCategory::Repairs).unwrap(),
            r#""REPAIRS""#
        );
        assert_eq!(ExpenseCategory::Fuel.as_str(), "FUEL");
    }
}
