// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Wire artifacts: the transporter (end-to-end) and agent
//! (hop-to-hop) envelopes, their signature and encryption blocks, the
//! unsigned identity lookup control frame, the server response, and the
//! delegation/attestation blocks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::AgentAction;
use crate::identity::Identity;

/// A type whose canonical, signature-excluding byte representation is
/// well-defined. The signing input for any artifact is this byte string;
/// both signer and verifier call the same method on the same struct
/// definition, so field order here is load-bearing (see `DESIGN.md`).
pub trait Signable {
    fn canonical_bytes(&self) -> Vec<u8>;
}

/// `{algorithm_hash, value, fingerprint}` — a detached RSA signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm_hash: String,
    pub value: String,
    pub fingerprint: String,
}

/// `standardEncrypt` | `2faEncrypt` | `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncryptionType {
    StandardEncrypt,
    #[serde(rename = "2faEncrypt")]
    TwoFaEncrypt,
    None,
}

/// `aes-256-gcm` (current) or `aes-256-cbc` (legacy, no auth tag). These
/// are two incompatible on-the-wire variants — parsing code
/// must never mix them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionAlgorithm {
    Aes256Gcm,
    Aes256Cbc,
}

/// The encryption block attached to an artifact whose `document` is
/// ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionBlock {
    pub algorithm: EncryptionAlgorithm,
    pub encrypted_key: String,
    pub iv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_tag: Option<String>,
    #[serde(rename = "type")]
    pub kind: EncryptionType,
}

impl EncryptionBlock {
    /// Legacy CBC artifacts never carry an auth tag; GCM artifacts always
    /// do. Mixed-mode blocks are rejected rather than guessed.
    pub fn is_well_formed(&self) -> bool {
        match self.algorithm {
            EncryptionAlgorithm::Aes256Gcm => self.auth_tag.is_some(),
            EncryptionAlgorithm::Aes256Cbc => self.auth_tag.is_none(),
        }
    }
}

/// `TRUST_REQ` | `TRUST_RES` | `BTPS_DOC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransporterKind {
    TrustReq,
    TrustRes,
    BtpsDoc,
}

/// The document carried by a trust.request artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustRequestDocument {
    pub id: String,
    pub name: String,
    pub email: String,
    pub reason: String,
    pub phone: String,
}

/// The decision document carried by trust.respond / trust.update /
/// trust.delete artifacts. The exact decision fields are store-specific;
/// `extra` preserves whatever isn't covered by a typed field so none of
/// it is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustResponseDocument {
    pub decision: TrustDecision,
    pub decided_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustDecision {
    Accepted,
    Rejected,
    Revoked,
}

/// The `document` field of a [`TransporterArtifact`]: either a structured
/// object matching the artifact's `type`, or a base64 ciphertext string
/// when `encryption` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransporterDocument {
    Ciphertext(String),
    TrustRequest(TrustRequestDocument),
    TrustResponse(TrustResponseDocument),
    Business(Value),
}

/// End-to-end envelope carrying a business document between two
/// identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransporterArtifact {
    pub version: String,
    pub id: String,
    pub issued_at: String,
    pub from: Identity,
    pub to: Identity,
    #[serde(rename = "type")]
    pub kind: TransporterKind,
    pub document: TransporterDocument,
    pub signature: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionBlock>,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<Delegation>,
}

impl Signable for TransporterArtifact {
    fn canonical_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Payload<'a> {
            version: &'a str,
            id: &'a str,
            issued_at: &'a str,
            from: &'a Identity,
            to: &'a Identity,
            #[serde(rename = "type")]
            kind: TransporterKind,
            document: &'a TransporterDocument,
            #[serde(skip_serializing_if = "Option::is_none")]
            encryption: &'a Option<EncryptionBlock>,
            selector: &'a str,
        }
        let payload = Payload {
            version: &self.version,
            id: &self.id,
            issued_at: &self.issued_at,
            from: &self.from,
            to: &self.to,
            kind: self.kind,
            document: &self.document,
            encryption: &self.encryption,
            selector: &self.selector,
        };
        serde_json::to_vec(&payload).expect("artifact payload is always serializable")
    }
}

/// The document carried by an `auth.request` agent artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequestDocument {
    pub user_identity: Identity,
    pub public_key: String,
    #[serde(default)]
    pub agent_info: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

/// The `document` field of an [`AgentArtifact`]: a nested transporter
/// artifact, an auth-request document, a query/mutation payload, or a
/// bare id list, discriminated structurally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentDocument {
    Transporter(Box<TransporterArtifact>),
    AuthRequest(AuthRequestDocument),
    IdList(Vec<String>),
    Value(Value),
}

/// Hop-to-hop envelope from an agent to its principal's server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentArtifact {
    pub version: String,
    pub id: String,
    pub issued_at: String,
    pub to: Identity,
    pub agent_id: String,
    pub action: AgentAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<AgentDocument>,
    pub signature: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionBlock>,
}

impl Signable for AgentArtifact {
    fn canonical_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Payload<'a> {
            version: &'a str,
            id: &'a str,
            issued_at: &'a str,
            to: &'a Identity,
            agent_id: &'a str,
            action: AgentAction,
            #[serde(skip_serializing_if = "Option::is_none")]
            document: &'a Option<AgentDocument>,
            #[serde(skip_serializing_if = "Option::is_none")]
            encryption: &'a Option<EncryptionBlock>,
        }
        let payload = Payload {
            version: &self.version,
            id: &self.id,
            issued_at: &self.issued_at,
            to: &self.to,
            agent_id: &self.agent_id,
            action: self.action,
            document: &self.document,
            encryption: &self.encryption,
        };
        serde_json::to_vec(&payload).expect("artifact payload is always serializable")
    }
}

/// Unsigned control frame used to ask a server to resolve an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityLookupRequest {
    pub version: String,
    pub id: String,
    pub issued_at: String,
    pub identity: Identity,
    pub from: Identity,
    pub host_selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_selector: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerResponseKind {
    BtpsResponse,
    BtpsError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseStatus {
    pub ok: bool,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A reply to any request on the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse {
    pub version: String,
    pub id: String,
    pub issued_at: String,
    #[serde(rename = "type")]
    pub kind: ServerResponseKind,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

impl ServerResponse {
    /// Per `process_message`'s contract: a response with neither a
    /// signature nor an encryption block is a bare system response.
    pub fn is_system_response(&self) -> bool {
        self.signature.is_none() && self.encryption.is_none()
    }
}

impl Signable for ServerResponse {
    fn canonical_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Payload<'a> {
            version: &'a str,
            id: &'a str,
            issued_at: &'a str,
            #[serde(rename = "type")]
            kind: ServerResponseKind,
            status: &'a ResponseStatus,
            #[serde(skip_serializing_if = "Option::is_none")]
            req_id: &'a Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            document: &'a Option<Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            encryption: &'a Option<EncryptionBlock>,
            #[serde(skip_serializing_if = "Option::is_none")]
            signed_by: &'a Option<Identity>,
            #[serde(skip_serializing_if = "Option::is_none")]
            selector: &'a Option<String>,
        }
        let payload = Payload {
            version: &self.version,
            id: &self.id,
            issued_at: &self.issued_at,
            kind: self.kind,
            status: &self.status,
            req_id: &self.req_id,
            document: &self.document,
            encryption: &self.encryption,
            signed_by: &self.signed_by,
            selector: &self.selector,
        };
        serde_json::to_vec(&payload).expect("server response payload is always serializable")
    }
}

/// Binds an agent's ephemeral key to a principal identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub agent_id: String,
    pub agent_pub_key: String,
    pub signed_by: Identity,
    pub signature: Signature,
    pub issued_at: String,
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationBlock>,
}

/// A second signature over a delegation, issued by a SaaS identity on
/// behalf of a user who signed the delegation themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationBlock {
    pub signed_by: Identity,
    pub issued_at: String,
    pub signature: Signature,
    pub selector: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signature() -> Signature {
        Signature {
            algorithm_hash: "sha256".into(),
            value: "sig".into(),
            fingerprint: "fp".into(),
        }
    }

    #[test]
    fn canonical_bytes_excludes_signature_and_delegation() {
        let artifact = TransporterArtifact {
            version: "1.0.0".into(),
            id: "req-1".into(),
            issued_at: "2024-01-01T00:00:00Z".into(),
            from: "alice$example.com".parse().unwrap(),
            to: "bob$company.com".parse().unwrap(),
            kind: TransporterKind::TrustReq,
            document: TransporterDocument::Business(serde_json::json!({"a": 1})),
            signature: sample_signature(),
            encryption: None,
            selector: "btps1".into(),
            delegation: None,
        };
        let bytes = artifact.canonical_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("signature"));
        assert!(!text.contains("delegation"));
        assert!(text.contains("req-1"));
    }

    #[test]
    fn canonical_bytes_are_deterministic() {
        let artifact = TransporterArtifact {
            version: "1.0.0".into(),
            id: "req-1".into(),
            issued_at: "2024-01-01T00:00:00Z".into(),
            from: "alice$example.com".parse().unwrap(),
            to: "bob$company.com".parse().unwrap(),
            kind: TransporterKind::TrustReq,
            document: TransporterDocument::Business(serde_json::json!({"a": 1})),
            signature: sample_signature(),
            encryption: None,
            selector: "btps1".into(),
            delegation: None,
        };
        assert_eq!(artifact.canonical_bytes(), artifact.canonical_bytes());
    }
}
