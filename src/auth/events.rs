// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-expiry broadcast.
//!
//! Independent parts of the application (UI redirect, local cache wipe,
//! ingestion halt) register handlers here. When the request client gives up on
//! a session, every handler registered at that moment runs exactly once.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use tracing::info;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The ledger rejected the refresh credential.
    RefreshRejected,
    /// A 401 arrived and there was no refresh credential to try.
    NoRefreshCredential,
    /// The access credential from a successful refresh was refused too.
    RefreshedAccessRejected,
}

/// Payload delivered to session-expiry handlers.
#[derive(Debug, Clone)]
pub struct SessionExpired {
    /// Monotonic per-process event number.
    pub sequence: u64,
    pub reason: ExpiryReason,
    pub at: DateTime<Utc>,
}

type Handler = Arc<dyn Fn(&SessionExpired) + Send + Sync>;

#[derive(Default)]
struct Registry {
    handlers: Mutex<BTreeMap<u64, Handler>>,
    next_id: AtomicU64,
    next_sequence: AtomicU64,
}

impl Registry {
    fn handlers(&self) -> MutexGuard<'_, BTreeMap<u64, Handler>> {
        self.handlers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Publish/subscribe channel for session expiry.
///
/// Cheap to clone; clones share one registry.
#[derive(Clone, Default)]
pub struct SessionEvents {
    registry: Arc<Registry>,
}

impl SessionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped or explicitly unsubscribed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionExpired) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers().insert(id, Arc::new(handler));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers().len()
    }

    /// Fire one expiry event to every current subscriber.
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe or
    /// unsubscribe without deadlocking.
    pub fn publish(&self, reason: ExpiryReason) -> SessionExpired {
        let event = SessionExpired {
            sequence: self.registry.next_sequence.fetch_add(1, Ordering::Relaxed),
            reason,
            at: Utc::now(),
        };
        let handlers: Vec<Handler> = self.registry.handlers().values().cloned().collect();

        info!(
            sequence = event.sequence,
            reason = ?event.reason,
            subscribers = handlers.len(),
            "Session expired, notifying subscribers"
        );

        for handler in handlers {
            handler(&event);
        }
        event
    }
}

/// Handle returned by [`SessionEvents::subscribe`].
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Remove the handler now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.handlers().remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
