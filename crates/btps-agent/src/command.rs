// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Outbound command construction: validates an
//! action against its schema, optionally builds and signs an inner
//! transporter artifact, then always builds and signs the wrapping agent
//! artifact that actually goes out over the wire.

use chrono::Utc;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use uuid::Uuid;

use btps_crypto::encrypt::{self, EncryptOptions, OaepDigest};
use btps_crypto::keys::public_key_from_pem;
use btps_crypto::sign;
use btps_delegation::{Delegator, Principal};
use btps_resolver::Resolver;
use btps_types::artifact::{
    AgentArtifact, AgentDocument, AuthRequestDocument, Signature, TransporterArtifact,
    TransporterDocument,
};
use btps_types::constants::PROTOCOL_VERSION;
use btps_types::{AgentAction, Identity};

use crate::error::AgentError;

/// End-to-end encryption options for the inner transporter artifact of a
/// trust/document-carrying command. `None` sends the document in the
/// clear.
#[derive(Debug, Clone, Copy)]
pub struct CryptoOpts {
    pub options: EncryptOptions,
}

/// A single agent's signing identity and routing context: the keypair
/// it signs agent/transporter artifacts with, the selector that key is
/// published under, and the principal (home server) every agent
/// artifact is addressed to.
pub struct AgentFramer {
    pub agent_id: String,
    pub principal: Identity,
    pub selector: String,
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
    pub resolver: Resolver,
    pub delegator: Option<Delegator>,
    pub delegation_principal: Option<Principal>,
}

impl AgentFramer {
    /// Builds, signs, and returns a ready-to-send agent artifact for
    /// `action` addressed (end-to-end, when applicable) to `to`.
    pub async fn command(
        &self,
        action: AgentAction,
        to: Identity,
        document: Option<Value>,
        crypto_opts: Option<CryptoOpts>,
    ) -> Result<AgentArtifact, AgentError> {
        if action.requires_document() && document.is_none() {
            return Err(AgentError::MissingDocument("document"));
        }
        let crypto_opts = if action.forbids_encryption() { None } else { crypto_opts };

        let agent_document = if action.builds_transporter_artifact() {
            let document = document.expect("requires_document() was checked above");
            let transporter = self.build_transporter_artifact(action, &to, document, crypto_opts).await?;
            Some(AgentDocument::Transporter(Box::new(transporter)))
        } else if action == AgentAction::AuthRequest {
            let document = document.expect("requires_document() was checked above");
            let auth_request: AuthRequestDocument = serde_json::from_value(document)
                .map_err(|_| AgentError::MissingDocument("a valid auth.request document"))?;
            Some(AgentDocument::AuthRequest(auth_request))
        } else {
            document.map(AgentDocument::Value)
        };

        // Agent artifacts travel hop-to-hop to the principal's own server
        // over an already-authenticated TLS channel; encryption always
        // lives on the inner transporter artifact, never here.
        let encryption = None;

        let mut artifact = AgentArtifact {
            version: PROTOCOL_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            issued_at: Utc::now().to_rfc3339(),
            to: self.principal.clone(),
            agent_id: self.agent_id.clone(),
            action,
            document: agent_document,
            signature: placeholder_signature(),
            encryption,
        };
        artifact.signature = sign::sign(&artifact, &self.private_key, &self.public_key)?;
        Ok(artifact)
    }

    async fn build_transporter_artifact(
        &self,
        action: AgentAction,
        to: &Identity,
        document: Value,
        crypto_opts: Option<CryptoOpts>,
    ) -> Result<TransporterArtifact, AgentError> {
        let kind = action
            .transporter_kind()
            .expect("builds_transporter_artifact() implies a transporter kind");

        let (transporter_document, encryption) = match crypto_opts {
            Some(opts) => {
                let host = self.resolver.resolve_host(to).await?;
                let pem = self.resolver.resolve_public_key(to, &host.selector).await?;
                let receiver_public = public_key_from_pem(&pem)?;
                let plaintext = serde_json::to_string(&document)
                    .expect("a transporter document is always serializable");
                let payload = encrypt::encrypt(&plaintext, &receiver_public, opts.options)?;
                (TransporterDocument::Ciphertext(payload.data), Some(payload.encryption))
            }
            None => (TransporterDocument::Business(document), None),
        };

        let mut artifact = TransporterArtifact {
            version: PROTOCOL_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            issued_at: Utc::now().to_rfc3339(),
            from: self.principal.clone(),
            to: to.clone(),
            kind,
            document: transporter_document,
            signature: placeholder_signature(),
            encryption,
            selector: self.selector.clone(),
            delegation: None,
        };
        artifact.signature = sign::sign(&artifact, &self.private_key, &self.public_key)?;

        if let Some(delegator) = &self.delegator {
            let agent_pub_key = btps_crypto::keys::public_key_to_base64_spki(&self.public_key)?;
            artifact = delegator.delegate_artifact(
                &self.agent_id,
                &agent_pub_key,
                artifact,
                self.delegation_principal.as_ref(),
            )?;
        }

        Ok(artifact)
    }
}

fn placeholder_signature() -> Signature {
    Signature {
        algorithm_hash: String::new(),
        value: String::new(),
        fingerprint: String::new(),
    }
}

/// OAEP digest to negotiate for `CryptoOpts`'s receiver key wrap; kept
/// separate from [`EncryptOptions`] defaults so callers opting into
/// SHA-256 out-of-band don't have to rebuild the whole options struct.
pub fn crypto_opts_with_digest(mut options: EncryptOptions, digest: OaepDigest) -> CryptoOpts {
    options.oaep_digest = digest;
    CryptoOpts { options }
}
