// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Delegator: lets a service sign artifacts on behalf of a
//! principal, and/or attest that a device/agent key belongs to one.

use chrono::Utc;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use serde_json::Value;

use btps_crypto::sign::sign_bytes;
use btps_resolver::Resolver;
use btps_types::artifact::{AttestationBlock, Delegation, Signable, TransporterArtifact};
use btps_types::Identity;

use crate::error::DelegationError;

const SELF_CHECK_MESSAGE: &[u8] = b"btps-delegator-self-check";

/// A principal whose delegation the delegator signs on their behalf,
/// in "user-signs + SaaS-attests" mode.
pub struct Principal {
    pub identity: Identity,
    pub selector: String,
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

#[derive(Serialize)]
struct DelegationFields {
    agent_id: String,
    agent_pub_key: String,
    signed_by: Identity,
    issued_at: String,
    selector: String,
}

#[derive(Serialize)]
struct AttestationFields {
    signed_by: Identity,
    issued_at: String,
    selector: String,
}

#[derive(Serialize)]
struct ArtifactDelegationPayload<'a> {
    artifact: Value,
    delegation: &'a DelegationFields,
}

#[derive(Serialize)]
struct DelegationAttestationPayload<'a> {
    delegation: &'a Delegation,
    attestation: &'a AttestationFields,
}

fn artifact_delegation_bytes(artifact: &TransporterArtifact, fields: &DelegationFields) -> Vec<u8> {
    let artifact_value: Value =
        serde_json::from_slice(&artifact.canonical_bytes()).expect("canonical artifact bytes are valid JSON");
    let payload = ArtifactDelegationPayload {
        artifact: artifact_value,
        delegation: fields,
    };
    serde_json::to_vec(&payload).expect("delegation payload is always serializable")
}

fn delegation_attestation_bytes(delegation: &Delegation, fields: &AttestationFields) -> Vec<u8> {
    let payload = DelegationAttestationPayload {
        delegation,
        attestation: fields,
    };
    serde_json::to_vec(&payload).expect("attestation payload is always serializable")
}

/// Signs delegation and attestation blocks on behalf of `identity`,
/// having verified at construction that its own private key matches the
/// key it publishes at `selector`.
#[derive(Debug)]
pub struct Delegator {
    identity: Identity,
    selector: String,
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl Delegator {
    pub async fn new(
        identity: Identity,
        private_key: RsaPrivateKey,
        resolver: &Resolver,
    ) -> Result<Self, DelegationError> {
        let host = resolver.resolve_host(&identity).await?;
        let published_pem = resolver.resolve_public_key(&identity, &host.selector).await?;
        let published_key = btps_crypto::keys::public_key_from_pem(&published_pem)?;
        let public_key = RsaPublicKey::from(&private_key);

        let signature = sign_bytes(SELF_CHECK_MESSAGE, &private_key, &public_key)?;
        btps_crypto::sign::verify_bytes(SELF_CHECK_MESSAGE, &signature, &published_key)
            .map_err(|_| DelegationError::SelfVerificationFailed)?;

        Ok(Self {
            identity,
            selector: host.selector,
            private_key,
            public_key,
        })
    }

    /// Attaches a delegation (and, in user-signs mode, an attestation) to
    /// a copy of `artifact`. `principal` absent means "SaaS-signs" mode;
    /// present means "user-signs + SaaS-attests" mode.
    pub fn delegate_artifact(
        &self,
        agent_id: &str,
        agent_pub_key: &str,
        mut artifact: TransporterArtifact,
        principal: Option<&Principal>,
    ) -> Result<TransporterArtifact, DelegationError> {
        let delegation = match principal {
            None => self.sign_delegation_as_self(agent_id, agent_pub_key, &artifact)?,
            Some(principal) => {
                let mut delegation =
                    self.sign_delegation_as_principal(agent_id, agent_pub_key, &artifact, principal)?;
                let attestation = self.sign_attestation(&delegation)?;
                delegation.attestation = Some(attestation);
                delegation
            }
        };
        artifact.delegation = Some(delegation);
        Ok(artifact)
    }

    fn sign_delegation_as_self(
        &self,
        agent_id: &str,
        agent_pub_key: &str,
        artifact: &TransporterArtifact,
    ) -> Result<Delegation, DelegationError> {
        let fields = DelegationFields {
            agent_id: agent_id.to_string(),
            agent_pub_key: agent_pub_key.to_string(),
            signed_by: self.identity.clone(),
            issued_at: Utc::now().to_rfc3339(),
            selector: self.selector.clone(),
        };
        let bytes = artifact_delegation_bytes(artifact, &fields);
        let signature = sign_bytes(&bytes, &self.private_key, &self.public_key)?;
        Ok(Delegation {
            agent_id: fields.agent_id,
            agent_pub_key: fields.agent_pub_key,
            signed_by: fields.signed_by,
            signature,
            issued_at: fields.issued_at,
            selector: fields.selector,
            attestation: None,
        })
    }

    fn sign_delegation_as_principal(
        &self,
        agent_id: &str,
        agent_pub_key: &str,
        artifact: &TransporterArtifact,
        principal: &Principal,
    ) -> Result<Delegation, DelegationError> {
        let fields = DelegationFields {
            agent_id: agent_id.to_string(),
            agent_pub_key: agent_pub_key.to_string(),
            signed_by: principal.identity.clone(),
            issued_at: Utc::now().to_rfc3339(),
            selector: principal.selector.clone(),
        };
        let bytes = artifact_delegation_bytes(artifact, &fields);
        let signature = sign_bytes(&bytes, &principal.private_key, &principal.public_key)?;
        Ok(Delegation {
            agent_id: fields.agent_id,
            agent_pub_key: fields.agent_pub_key,
            signed_by: fields.signed_by,
            signature,
            issued_at: fields.issued_at,
            selector: fields.selector,
            attestation: None,
        })
    }

    fn sign_attestation(&self, delegation: &Delegation) -> Result<AttestationBlock, DelegationError> {
        let fields = AttestationFields {
            signed_by: self.identity.clone(),
            issued_at: Utc::now().to_rfc3339(),
            selector: self.selector.clone(),
        };
        let bytes = delegation_attestation_bytes(delegation, &fields);
        let signature = sign_bytes(&bytes, &self.private_key, &self.public_key)?;
        Ok(AttestationBlock {
            signed_by: fields.signed_by,
            issued_at: fields.issued_at,
            signature,
            selector: fields.selector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use btps_resolver::DnsLookup;
    use btps_types::artifact::{TransporterDocument, TransporterKind};
    use btps_types::Signature;
    use rand::thread_rng;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct InMemoryDns {
        records: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl DnsLookup for InMemoryDns {
        async fn lookup_txt(&self, owner: &str) -> Result<String, btps_resolver::ResolveError> {
            self.records
                .lock()
                .unwrap()
                .get(owner)
                .cloned()
                .ok_or_else(|| btps_resolver::ResolveError::NotFound(owner.to_string()))
        }
    }

    async fn delegator_with_published_key() -> (Delegator, Identity) {
        let mut rng = thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        let spki_b64 = btps_crypto::keys::public_key_to_base64_spki(&public).unwrap();

        let identity: Identity = "saas$example.com".parse().unwrap();
        let mut records = HashMap::new();
        records.insert(
            "_btps.host.example.com".to_string(),
            "v=1.0.0; u=btps://host.example.com; s=btps1".to_string(),
        );
        records.insert(
            "btps1._btps.host.saas.example.com".to_string(),
            format!("k=rsa; v=1.0.0; p={spki_b64}"),
        );
        let dns = Arc::new(InMemoryDns {
            records: Mutex::new(records),
        });
        let resolver = Resolver::new(dns);
        let delegator = Delegator::new(identity.clone(), private, &resolver).await.unwrap();
        (delegator, identity)
    }

    fn sample_artifact() -> TransporterArtifact {
        TransporterArtifact {
            version: "1.0.0".into(),
            id: "req-1".into(),
            issued_at: "2024-01-01T00:00:00Z".into(),
            from: "alice$example.com".parse().unwrap(),
            to: "bob$company.com".parse().unwrap(),
            kind: TransporterKind::TrustReq,
            document: TransporterDocument::Business(serde_json::json!({"hello": "world"})),
            signature: Signature {
                algorithm_hash: "sha256".into(),
                value: String::new(),
                fingerprint: String::new(),
            },
            encryption: None,
            selector: "btps1".into(),
            delegation: None,
        }
    }

    #[tokio::test]
    async fn construction_fails_when_self_key_mismatches_published_key() {
        let mut rng = thread_rng();
        let wrong_private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let right_private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let right_public = RsaPublicKey::from(&right_private);
        let spki_b64 = btps_crypto::keys::public_key_to_base64_spki(&right_public).unwrap();

        let mut records = HashMap::new();
        records.insert(
            "_btps.host.example.com".to_string(),
            "v=1.0.0; u=btps://host.example.com; s=btps1".to_string(),
        );
        records.insert(
            "btps1._btps.host.saas.example.com".to_string(),
            format!("k=rsa; v=1.0.0; p={spki_b64}"),
        );
        let dns = Arc::new(InMemoryDns {
            records: Mutex::new(records),
        });
        let resolver = Resolver::new(dns);
        let identity: Identity = "saas$example.com".parse().unwrap();
        let err = Delegator::new(identity, wrong_private, &resolver).await.unwrap_err();
        assert!(matches!(err, DelegationError::SelfVerificationFailed));
    }

    #[tokio::test]
    async fn saas_signs_mode_attaches_a_delegation_without_attestation() {
        let (delegator, saas_identity) = delegator_with_published_key().await;
        let artifact = sample_artifact();
        let delegated = delegator
            .delegate_artifact("agent-1", "agent-pub-key", artifact, None)
            .unwrap();
        let delegation = delegated.delegation.unwrap();
        assert_eq!(delegation.signed_by, saas_identity);
        assert!(delegation.attestation.is_none());
    }

    #[tokio::test]
    async fn user_signs_mode_attaches_both_signatures() {
        let mut rng = thread_rng();
        let user_private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let user_public = RsaPublicKey::from(&user_private);
        let principal = Principal {
            identity: "alice$example.com".parse().unwrap(),
            selector: "btps1".into(),
            private_key: user_private,
            public_key: user_public,
        };

        let (delegator, saas_identity) = delegator_with_published_key().await;
        let artifact = sample_artifact();
        let delegated = delegator
            .delegate_artifact("agent-1", "agent-pub-key", artifact, Some(&principal))
            .unwrap();
        let delegation = delegated.delegation.unwrap();
        assert_eq!(delegation.signed_by, principal.identity);
        let attestation = delegation.attestation.unwrap();
        assert_eq!(attestation.signed_by, saas_identity);
    }
}
