// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Storage seams for the authentication sub-core.
//!
//! Grounded on trait-object adapter seams like `ReceiptStorageAdapter`:
//! an `#[async_trait]` interface with `Send + Sync` bounds so the workspace
//! never commits to a concrete database driver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use btps_types::{Identity, PrivacyType, TrustRecord};

use crate::error::AuthError;

/// A single issued auth token, as handed to [`TokenStore::put`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenRecord {
    pub token: String,
    pub identity: Identity,
    pub issued_by_server_identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<Identity>,
    pub issued_at: String,
    pub expires_at: String,
}

/// Stores short-lived auth tokens keyed by their token string.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put(&self, record: AuthTokenRecord) -> Result<(), AuthError>;
    async fn get(&self, token: &str) -> Result<Option<AuthTokenRecord>, AuthError>;
    async fn delete(&self, token: &str) -> Result<(), AuthError>;
}

/// A single issued refresh token, keyed by the agent it was issued to.
///
/// Carries the identity pair a trust record is keyed on (the
/// directional `sender_id:receiver_id` id law) so that reissuing a
/// refresh token can locate and update that same record without the
/// caller having to resupply it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub agent_id: String,
    pub token: String,
    pub user_identity: Identity,
    pub receiver_identity: Identity,
    pub issued_at: String,
    pub expires_at: String,
}

/// Stores long-lived refresh tokens keyed by agent id.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn put(&self, record: RefreshTokenRecord) -> Result<(), AuthError>;
    async fn get(&self, agent_id: &str) -> Result<Option<RefreshTokenRecord>, AuthError>;
    async fn delete(&self, agent_id: &str) -> Result<(), AuthError>;
}

/// The trust-record seam shared with `btps-delegation`'s notion of an
/// active trust relationship, scoped here to agent device keys.
#[async_trait]
pub trait TrustStore: Send + Sync {
    async fn put(&self, record: TrustRecord) -> Result<(), AuthError>;
    async fn get(&self, sender_id: &Identity, receiver_id: &Identity) -> Result<Option<TrustRecord>, AuthError>;
}

/// Arbitrary per-agent metadata the authentication flow needs to persist
/// and hand back verbatim (e.g. free-form `agent_info`), kept separate
/// from the trust record so `btps-auth` never has to know its shape.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn put_agent_info(&self, agent_id: &str, info: Value) -> Result<(), AuthError>;
    async fn get_agent_info(&self, agent_id: &str) -> Result<Option<Value>, AuthError>;
}

/// Picks a privacy classification for a freshly-trusted agent device key.
/// All current callers issue unencrypted device trust; this stays a
/// distinct helper so the authentication flow never has to guess.
pub fn default_privacy() -> PrivacyType {
    PrivacyType::Unencrypted
}
