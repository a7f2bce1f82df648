// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Client-side credential handling for the ledger API.
//!
//! ## Auth Flow
//!
//! 1. `POST /auth/login` exchanges username/password for an access and a
//!    refresh credential, both kept in the [`CredentialStore`]
//! 2. Every call sends `Authorization: Bearer <access>`
//! 3. On a 401 the [`AuthClient`]:
//!    - exchanges the refresh credential at `POST /auth/refresh`
//!      (one exchange in flight at a time)
//!    - retries the original call once with the new access credential
//!    - on a rejected refresh, clears both credentials and broadcasts
//!      [`SessionExpired`] to every subscriber
//!
//! ## Security
//!
//! - Credentials are never logged; `CredentialPair`'s `Debug` hides them
//! - Durable writes happen before the in-memory cache is updated

pub mod client;
pub mod credentials;
pub mod error;
pub mod events;
pub mod session;

pub use client::{AuthClient, AuthClientConfig, LoginOutcome, RequestOptions};
pub use credentials::{CredentialKind, CredentialPair, CredentialStore};
pub use error::ClientError;
pub use events::{ExpiryReason, SessionEvents, SessionExpired, Subscription};
pub use session::SessionManager;
