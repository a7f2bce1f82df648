// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Signing
//!
//! Adds a `request_hash` to transaction and expense payloads so the ledger
//! can reject tampered or replayed-with-changes requests.
//!
//! ## Canonical Strings
//!
//! ```text
//! transaction: {reference}:{amount}:{PLATFORM}
//! expense:     EXPENSE:{amount}:{CATEGORY}:{description, first 50 chars}
//! ```
//!
//! Amounts use their shortest decimal form (`50.00` signs as `50`). The hash
//! is hex-encoded HMAC-SHA256 keyed by a per-install secret.
//!
//! ## Install Secret
//!
//! 32 random bytes, base64-encoded, generated on first use and kept in the
//! secret store under `sms_api_secret`. It is cached in memory and never sent
//! anywhere.

use std::sync::{Arc, RwLock};

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::Value;
use sha2::Sha256;
use tracing::info;

use crate::ledger::models::{ExpenseDraft, TransactionCandidate};
use crate::storage::{SecretStore, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Secret store key of the install secret.
pub const SECRET_KEY: &str = "sms_api_secret";

/// Characters of an expense description covered by its hash.
const DESCRIPTION_PREFIX_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing secret storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("system random generator failed")]
    Random,

    #[error("invalid signing key")]
    InvalidKey,
}

/// Something with a canonical string to sign.
pub trait Signable {
    fn canonical_string(&self) -> String;
}

impl Signable for TransactionCandidate {
    fn canonical_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.reference_id,
            self.amount_received.normalize(),
            self.platform.as_str()
        )
    }
}

impl Signable for ExpenseDraft {
    fn canonical_string(&self) -> String {
        let description: String = self
            .description
            .chars()
            .take(DESCRIPTION_PREFIX_CHARS)
            .collect();
        format!(
            "EXPENSE:{}:{}:{}",
            self.amount.normalize(),
            self.category.as_str(),
            description
        )
    }
}

/// HMAC request signer backed by the secret store.
pub struct RequestSigner {
    secrets: Arc<dyn SecretStore>,
    cached: RwLock<Option<String>>,
    rng: SystemRandom,
}

impl RequestSigner {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            secrets,
            cached: RwLock::new(None),
            rng: SystemRandom::new(),
        }
    }

    /// Current install secret, generating and persisting one if absent.
    fn secret(&self) -> Result<String, SigningError> {
        if let Some(secret) = self
            .cached
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
        {
            return Ok(secret.clone());
        }

        let mut cached = self
            .cached
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(secret) = cached.as_ref() {
            return Ok(secret.clone());
        }

        let secret = match self.secrets.get(SECRET_KEY)? {
            Some(stored) => stored,
            None => {
                let mut bytes = [0u8; 32];
                self.rng.fill(&mut bytes).map_err(|_| SigningError::Random)?;
                let generated = Base64::encode_string(&bytes);
                self.secrets.put(SECRET_KEY, &generated)?;
                info!("Generated new request signing secret");
                generated
            }
        };
        *cached = Some(secret.clone());
        Ok(secret)
    }

    /// Forget the cached secret (logout). The stored secret is kept.
    pub fn clear_cached_secret(&self) {
        *self
            .cached
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// Hex HMAC-SHA256 of `message`.
    pub fn hash(&self, message: &str) -> Result<String, SigningError> {
        let secret = self.secret()?;
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::InvalidKey)?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Return `payload` with `request_hash` set to the signature of `item`.
    pub fn sign<S: Signable>(&self, item: &S, mut payload: Value) -> Result<Value, SigningError> {
        let hash = self.hash(&item.canonical_string())?;
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("request_hash".to_string(), Value::String(hash));
        }
        Ok(payload)
    }
}
