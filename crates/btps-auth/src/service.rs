// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The authentication sub-core: auth-token issuance,
//! refresh-token reissue, and agent device-key trust.
//!
//! Grounded on a verify-and-store middleware shape
//! (`middleware/auth/tap.rs`'s `tap_receipt_authorize`, which verifies a
//! receipt and delegates to an abstract manager) adapted from an HTTP
//! authorization layer into plain async methods: `btps-auth` holds no
//! sockets and is invoked directly by `btps-agent`'s dispatch when the
//! resolved action is `auth.*`, never by a transport-layer middleware.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use btps_crypto::keys::{fingerprint, pem_from_base64_spki, public_key_from_pem};
use btps_crypto::token;
use btps_types::constants::{AUTH_TOKEN_TTL, REFRESH_TOKEN_TTL};
use btps_types::{Identity, TrustRecord, TrustStatus};

use crate::error::AuthError;
use crate::store::{
    default_privacy, AuthTokenRecord, IdentityStore, RefreshTokenRecord, RefreshTokenStore, TokenStore, TrustStore,
};

#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auth_token_ttl: StdDuration,
    pub refresh_token_ttl: StdDuration,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self { auth_token_ttl: AUTH_TOKEN_TTL, refresh_token_ttl: REFRESH_TOKEN_TTL }
    }
}

/// Parameters for [`AuthService::create_agent`], mirroring
/// [`btps_types::artifact::AuthRequestDocument`].
#[derive(Debug, Clone)]
pub struct CreateAgentRequest {
    pub user_identity: Identity,
    pub public_key_base64: String,
    pub agent_info: Value,
    pub decided_by: Option<String>,
}

/// The device-key trust and refresh-token material handed back to a
/// newly authenticated agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCredentials {
    pub agent_id: String,
    pub refresh_token: String,
    pub expires_at: String,
    pub decrypt_by: Identity,
}

/// Parameters for [`AuthService::validate_and_reissue_refresh_token`].
#[derive(Debug, Clone)]
pub struct ReissueRequest {
    pub decrypt_by: Identity,
    pub decided_by: Option<String>,
    pub public_key_base64: String,
    pub agent_info: Value,
}

/// The authentication sub-core, parameterized entirely over store
/// traits so the workspace never commits to a concrete database.
pub struct AuthService {
    tokens: Arc<dyn TokenStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    trust: Arc<dyn TrustStore>,
    identities: Arc<dyn IdentityStore>,
    server_identity: Identity,
    options: AuthOptions,
}

impl AuthService {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        trust: Arc<dyn TrustStore>,
        identities: Arc<dyn IdentityStore>,
        server_identity: Identity,
        options: AuthOptions,
    ) -> Self {
        Self { tokens, refresh_tokens, trust, identities, server_identity, options }
    }

    /// Issues and stores a short-lived auth token for `identity`.
    pub async fn generate_auth_token(
        &self,
        identity: &Identity,
        purpose: Option<String>,
        requested_by: Option<Identity>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = Duration::from_std(self.options.auth_token_ttl).unwrap_or(Duration::minutes(15));
        let token = token::generate_default(&identity.to_string());
        let record = AuthTokenRecord {
            token: token.clone(),
            identity: identity.clone(),
            issued_by_server_identity: self.server_identity.clone(),
            purpose,
            requested_by,
            issued_at: now.to_rfc3339(),
            expires_at: (now + ttl).to_rfc3339(),
        };
        self.tokens.put(record).await?;
        tracing::debug!(identity = %identity, "issued auth token");
        Ok(token)
    }

    /// Checks whether `token` is a live, unexpired grant for
    /// `principal_identity`. Unknown, mismatched, or expired tokens
    /// return `Ok(false)` rather than an error — a validation
    /// outcome, not a fault.
    pub async fn validate_auth_token(&self, principal_identity: &Identity, token: &str) -> Result<bool, AuthError> {
        let Some(record) = self.tokens.get(token).await? else {
            return Ok(false);
        };
        if &record.identity != principal_identity {
            return Ok(false);
        }
        if is_expired(&record.expires_at) {
            self.tokens.delete(token).await?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Registers an agent device key as trusted for `signed_by` and
    /// issues its refresh token.
    pub async fn create_agent(
        &self,
        request: CreateAgentRequest,
        signed_by: &Identity,
    ) -> Result<AgentCredentials, AuthError> {
        let public_key = public_key_from_pem(&pem_from_base64_spki(&request.public_key_base64))?;
        let key_fingerprint = fingerprint(&public_key)?;

        let now = Utc::now();
        let agent_id = uuid::Uuid::new_v4().to_string();
        let decided_by = request.decided_by.unwrap_or_else(|| signed_by.to_string());
        let user_identity = request.user_identity.clone();

        let trust_record = TrustRecord::new(
            request.user_identity.clone(),
            signed_by.clone(),
            TrustStatus::Accepted,
            now.to_rfc3339(),
            decided_by,
            now.to_rfc3339(),
            request.public_key_base64,
            key_fingerprint,
            default_privacy(),
        );
        self.trust.put(trust_record).await?;
        self.identities.put_agent_info(&agent_id, request.agent_info).await?;

        let ttl = Duration::from_std(self.options.refresh_token_ttl).unwrap_or(Duration::days(7));
        let expires_at = (now + ttl).to_rfc3339();
        let refresh_token = token::generate_default(&agent_id);
        self.refresh_tokens
            .put(RefreshTokenRecord {
                agent_id: agent_id.clone(),
                token: refresh_token.clone(),
                user_identity: request.user_identity,
                receiver_identity: signed_by.clone(),
                issued_at: now.to_rfc3339(),
                expires_at: expires_at.clone(),
            })
            .await?;

        tracing::info!(%user_identity, receiver = %signed_by, %agent_id, "registered agent device key");
        Ok(AgentCredentials { agent_id, refresh_token, expires_at, decrypt_by: signed_by.clone() })
    }

    /// Verifies a refresh token, rotates it, and folds any new key
    /// material into the agent's trust record.
    pub async fn validate_and_reissue_refresh_token(
        &self,
        agent_id: &str,
        token: &str,
        update: ReissueRequest,
    ) -> Result<AgentCredentials, AuthError> {
        let record = self
            .refresh_tokens
            .get(agent_id)
            .await?
            .ok_or_else(|| AuthError::RefreshTokenNotFound(agent_id.to_string()))?;
        if record.token != token {
            return Err(AuthError::RefreshTokenMismatch(agent_id.to_string()));
        }
        if is_expired(&record.expires_at) {
            return Err(AuthError::RefreshTokenExpired(agent_id.to_string()));
        }

        let public_key = public_key_from_pem(&pem_from_base64_spki(&update.public_key_base64))?;
        let key_fingerprint = fingerprint(&public_key)?;

        let mut trust_record = self
            .trust
            .get(&record.user_identity, &record.receiver_identity)
            .await?
            .ok_or_else(|| AuthError::Store(format!("no trust record for agent {agent_id}")))?;
        if trust_record.public_key_fingerprint != key_fingerprint {
            trust_record.key_history.push(trust_record.public_key_fingerprint.clone());
        }
        trust_record.public_key_base64 = update.public_key_base64;
        trust_record.public_key_fingerprint = key_fingerprint;
        if let Some(decided_by) = update.decided_by {
            trust_record.decided_by = decided_by;
        }
        trust_record.decided_at = Utc::now().to_rfc3339();
        self.trust.put(trust_record).await?;
        self.identities.put_agent_info(agent_id, update.agent_info).await?;

        let now = Utc::now();
        let ttl = Duration::from_std(self.options.refresh_token_ttl).unwrap_or(Duration::days(7));
        let expires_at = (now + ttl).to_rfc3339();
        let new_token = token::generate_default(agent_id);
        self.refresh_tokens
            .put(RefreshTokenRecord {
                agent_id: agent_id.to_string(),
                token: new_token.clone(),
                user_identity: record.user_identity,
                receiver_identity: record.receiver_identity.clone(),
                issued_at: now.to_rfc3339(),
                expires_at: expires_at.clone(),
            })
            .await?;

        tracing::debug!(%agent_id, "rotated refresh token");
        Ok(AgentCredentials {
            agent_id: agent_id.to_string(),
            refresh_token: new_token,
            expires_at,
            decrypt_by: update.decrypt_by,
        })
    }
}

fn is_expired(expires_at: &str) -> bool {
    match DateTime::parse_from_rfc3339(expires_at) {
        Ok(expires_at) => Utc::now() > expires_at,
        Err(_) => true,
    }
}
