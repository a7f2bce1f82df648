// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # SMS Module
//!
//! Turning inbound mobile-money notifications into transaction candidates.
//!
//! ```text
//! RawMessage -> classifier -> parser (+ commission) -> dedupe -> candidate
//! ```

pub mod classifier;
pub mod commission;
pub mod dedupe;
pub mod parser;
pub mod source;

pub use classifier::looks_like_transaction;
pub use commission::{CommissionRates, Split, DEFAULT_COMMISSION_RATE};
pub use dedupe::{is_duplicate, KnownReferences};
pub use parser::{Parser, DEFAULT_MAX_AMOUNT};
pub use source::{
    detect, Capability, JsonInboxProvider, JsonInboxSource, MessageSource, MessageSourceProvider,
    RawMessage, SourceError,
};
