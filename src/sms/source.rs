// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw messages and where they come from.
//!
//! Whether the host can read messages at all is decided once at startup by
//! [`detect`] and injected into the poller as a [`Capability`]; the poller
//! never probes for an inbox on its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One inbound text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Sender address or short code.
    #[serde(default)]
    pub address: String,
    pub body: String,
    /// Delivery time in milliseconds since the Unix epoch.
    #[serde(default, alias = "date")]
    pub timestamp_millis: i64,
}

impl RawMessage {
    pub fn new(address: impl Into<String>, body: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            timestamp_millis,
        }
    }

    /// A message typed or pasted by the user, stamped with the current time.
    pub fn manual(body: impl Into<String>) -> Self {
        Self::new("manual", body, Utc::now().timestamp_millis())
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp_millis <= 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.timestamp_millis)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("message source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read messages: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message inbox: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Something that can list recent inbound messages.
pub trait MessageSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Up to `limit` most recent messages, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<RawMessage>, SourceError>;
}

/// Tries to open a [`MessageSource`] on this host.
pub trait MessageSourceProvider: Send + Sync {
    fn name(&self) -> &str;
    fn open(&self) -> Result<Arc<dyn MessageSource>, SourceError>;
}

/// Outcome of message-source detection.
#[derive(Clone)]
pub enum Capability {
    Available(Arc<dyn MessageSource>),
    Unavailable(String),
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Available(source) => f
                .debug_tuple("Available")
                .field(&source.name())
                .finish(),
            Capability::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Return the first provider that opens, or why none did.
pub fn detect(providers: &[Box<dyn MessageSourceProvider>]) -> Capability {
    let mut reasons = Vec::new();
    for provider in providers {
        match provider.open() {
            Ok(source) => {
                info!(provider = provider.name(), "Message source available");
                return Capability::Available(source);
            }
            Err(e) => {
                debug!(provider = provider.name(), error = %e, "Message source provider failed");
                reasons.push(format!("{}: {e}", provider.name()));
            }
        }
    }

    let reason = if reasons.is_empty() {
        "no message source configured".to_string()
    } else {
        reasons.join("; ")
    };
    warn!(reason = %reason, "No message source available, automatic capture disabled");
    Capability::Unavailable(reason)
}

/// Messages read from a JSON array on disk, as written by an SMS bridge.
///
/// A missing file is an empty inbox; a malformed one is an error.
#[derive(Debug, Clone)]
pub struct JsonInboxSource {
    path: PathBuf,
}

impl JsonInboxSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageSource for JsonInboxSource {
    fn name(&self) -> &str {
        "json-inbox"
    }

    fn recent(&self, limit: usize) -> Result<Vec<RawMessage>, SourceError> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut messages: Vec<RawMessage> = serde_json::from_slice(&data)?;
        messages.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
        messages.truncate(limit);
        Ok(messages)
    }
}

/// Opens a [`JsonInboxSource`] when the inbox's directory exists.
#[derive(Debug, Clone)]
pub struct JsonInboxProvider {
    path: PathBuf,
}

impl JsonInboxProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MessageSourceProvider for JsonInboxProvider {
    fn name(&self) -> &str {
        "json-inbox"
    }

    fn open(&self) -> Result<Arc<dyn MessageSource>, SourceError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(SourceError::Unavailable(format!(
                "inbox directory {} does not exist",
                dir.display()
            )));
        }
        Ok(Arc::new(JsonInboxSource::new(self.path.clone())))
    }
}
