// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The trust record shape consumed through an abstract store and the
//! directional, deterministic id law that names it.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Accepted,
    Rejected,
    Revoked,
    Pending,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyType {
    Unencrypted,
    Encrypted,
    EncryptedTwoFactor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub id: String,
    pub sender_id: Identity,
    pub receiver_id: Identity,
    pub status: TrustStatus,
    pub created_at: String,
    pub decided_by: String,
    pub decided_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_date: Option<String>,
    pub public_key_base64: String,
    pub public_key_fingerprint: String,
    #[serde(default)]
    pub key_history: Vec<String>,
    pub privacy_type: PrivacyType,
}

impl TrustRecord {
    /// Builds a new record, computing its deterministic, directional id.
    pub fn new(
        sender_id: Identity,
        receiver_id: Identity,
        status: TrustStatus,
        created_at: impl Into<String>,
        decided_by: impl Into<String>,
        decided_at: impl Into<String>,
        public_key_base64: impl Into<String>,
        public_key_fingerprint: impl Into<String>,
        privacy_type: PrivacyType,
    ) -> Self {
        let id = compute_trust_id(&sender_id, &receiver_id);
        Self {
            id,
            sender_id,
            receiver_id,
            status,
            created_at: created_at.into(),
            decided_by: decided_by.into(),
            decided_at: decided_at.into(),
            expires_at: None,
            retry_after_date: None,
            public_key_base64: public_key_base64.into(),
            public_key_fingerprint: public_key_fingerprint.into(),
            key_history: Vec::new(),
            privacy_type,
        }
    }
}

/// `sha256(lower(sender_id + ":" + receiver_id))`, hex-encoded. Directional
/// and deterministic: swapping sender/receiver yields a different id
/// whenever the two identities differ.
pub fn compute_trust_id(sender_id: &Identity, receiver_id: &Identity) -> String {
    let joined = format!("{sender_id}:{receiver_id}").to_lowercase();
    let digest = Sha256::digest(joined.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to a String never fails");
    }
    out
}

/// Base64-encodes a SHA-256 digest, used by [`crate::Signature::fingerprint`]
/// construction sites across the workspace.
pub fn base64_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trust_id_is_directional() {
        let a: Identity = "alice$example.com".parse().unwrap();
        let b: Identity = "bob$company.com".parse().unwrap();
        let forward = compute_trust_id(&a, &b);
        let backward = compute_trust_id(&b, &a);
        assert_ne!(forward, backward);
    }

    #[test]
    fn trust_id_is_deterministic() {
        let a: Identity = "alice$example.com".parse().unwrap();
        let b: Identity = "bob$company.com".parse().unwrap();
        assert_eq!(compute_trust_id(&a, &b), compute_trust_id(&a, &b));
    }

    #[test]
    fn trust_id_is_case_insensitive() {
        let a: Identity = "Alice$Example.com".parse().unwrap();
        let b: Identity = "alice$example.com".parse().unwrap();
        let other: Identity = "bob$company.com".parse().unwrap();
        assert_eq!(compute_trust_id(&a, &other), compute_trust_id(&b, &other));
    }
}
