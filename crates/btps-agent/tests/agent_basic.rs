// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rsa::{RsaPrivateKey, RsaPublicKey};

use btps_agent::command::AgentFramer;
use btps_agent::process::ProcessedMessage;
use btps_crypto::keys::public_key_to_base64_spki;
use btps_crypto::sign;
use btps_resolver::{DnsLookup, ResolveError, Resolver};
use btps_types::artifact::{
    AgentDocument, ResponseStatus, ServerResponse, ServerResponseKind, Signature,
    TransporterDocument,
};
use btps_types::{AgentAction, Identity};

struct InMemoryDns {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryDns {
    fn new(records: &[(&str, &str)]) -> Self {
        Self {
            records: Mutex::new(records.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
        }
    }
}

#[async_trait]
impl DnsLookup for InMemoryDns {
    async fn lookup_txt(&self, owner: &str) -> Result<String, ResolveError> {
        self.records
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(owner.to_string()))
    }
}

fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = RsaPublicKey::from(&private);
    (private, public)
}

fn framer_for(identity: &str, private: RsaPrivateKey, public: RsaPublicKey, dns: Arc<InMemoryDns>) -> AgentFramer {
    AgentFramer {
        agent_id: "agent-1".to_string(),
        principal: identity.parse().unwrap(),
        selector: "btps1".to_string(),
        private_key: private,
        public_key: public,
        resolver: Resolver::new(dns),
        delegator: None,
        delegation_principal: None,
    }
}

fn dns_record_for(account_domain: &str, selector: &str, public: &RsaPublicKey) -> (String, String) {
    let spki = public_key_to_base64_spki(public).unwrap();
    let (account, domain) = account_domain.split_once('$').unwrap();
    (
        format!("{selector}._btps.host.{account}.{domain}"),
        format!("k=rsa; v=1.0.0; p={spki}"),
    )
}

#[tokio::test]
async fn system_ping_carries_no_document_and_no_transporter_artifact() {
    let (private, public) = test_keypair();
    let dns = Arc::new(InMemoryDns::new(&[]));
    let framer = framer_for("alice$example.com", private, public, dns);

    let artifact = framer
        .command(AgentAction::SystemPing, "alice$example.com".parse().unwrap(), None, None)
        .await
        .unwrap();

    assert!(artifact.document.is_none());
    assert!(artifact.encryption.is_none());
}

#[tokio::test]
async fn trust_request_wraps_a_signed_inner_transporter_artifact() {
    let (private, public) = test_keypair();
    let dns = Arc::new(InMemoryDns::new(&[]));
    let framer = framer_for("alice$example.com", private, public.clone(), dns);

    let document = serde_json::json!({
        "id": "req-1",
        "name": "Alice",
        "email": "alice@example.com",
        "reason": "vendor onboarding",
        "phone": "+10000000000",
    });
    let to: Identity = "bob$company.com".parse().unwrap();
    let artifact = framer
        .command(AgentAction::TrustRequest, to.clone(), Some(document), None)
        .await
        .unwrap();

    match artifact.document.as_ref().unwrap() {
        AgentDocument::Transporter(inner) => {
            assert_eq!(inner.from, "alice$example.com".parse::<Identity>().unwrap());
            assert_eq!(inner.to, to);
            assert!(matches!(inner.document, TransporterDocument::TrustRequest(_) | TransporterDocument::Business(_)));
            assert!(sign::verify(inner.as_ref(), &inner.signature, &public).is_ok());
        }
        other => panic!("expected a transporter artifact, got {other:?}"),
    }
    assert!(sign::verify(&artifact, &artifact.signature, &public).is_ok());
}

#[tokio::test]
async fn requires_document_rejects_trust_request_without_one() {
    let (private, public) = test_keypair();
    let dns = Arc::new(InMemoryDns::new(&[]));
    let framer = framer_for("alice$example.com", private, public, dns);

    let err = framer
        .command(AgentAction::TrustRequest, "bob$company.com".parse().unwrap(), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, btps_agent::AgentError::MissingDocument(_)));
}

#[tokio::test]
async fn process_message_passes_through_bare_system_responses() {
    let (private, public) = test_keypair();
    let dns = Arc::new(InMemoryDns::new(&[]));
    let framer = framer_for("alice$example.com", private, public, dns);

    let response = ServerResponse {
        version: "1.0.0".into(),
        id: "resp-1".into(),
        issued_at: "2024-01-01T00:00:00Z".into(),
        kind: ServerResponseKind::BtpsResponse,
        status: ResponseStatus { ok: true, code: 200, message: None },
        req_id: None,
        document: None,
        signature: None,
        encryption: None,
        signed_by: None,
        selector: None,
    };
    let processed = framer.process_message(response).await.unwrap();
    assert!(matches!(processed, ProcessedMessage::System(_)));
}

#[tokio::test]
async fn process_message_verifies_signed_responses_against_the_published_key() {
    let (private, public) = test_keypair();
    let (owner, txt) = dns_record_for("alice$example.com", "btps1", &public);
    let dns = Arc::new(InMemoryDns::new(&[(&owner, &txt)]));
    let framer = framer_for("alice$example.com", private.clone(), public.clone(), dns);

    let mut response = ServerResponse {
        version: "1.0.0".into(),
        id: "resp-1".into(),
        issued_at: "2024-01-01T00:00:00Z".into(),
        kind: ServerResponseKind::BtpsResponse,
        status: ResponseStatus { ok: true, code: 200, message: None },
        req_id: None,
        document: Some(serde_json::json!({"trust": "accepted"})),
        signature: None,
        encryption: None,
        signed_by: Some("alice$example.com".parse().unwrap()),
        selector: Some("btps1".into()),
    };
    response.signature = Some(sign::sign(&response, &private, &public).unwrap());

    let processed = framer.process_message(response).await.unwrap();
    match processed {
        ProcessedMessage::Verified(r) => {
            assert_eq!(r.document.unwrap(), serde_json::json!({"trust": "accepted"}));
        }
        other => panic!("expected a verified response, got {other:?}"),
    }
}

#[tokio::test]
async fn process_message_rejects_a_signed_response_missing_signer_context() {
    let (private, public) = test_keypair();
    let dns = Arc::new(InMemoryDns::new(&[]));
    let framer = framer_for("alice$example.com", private.clone(), public.clone(), dns);

    let mut response = ServerResponse {
        version: "1.0.0".into(),
        id: "resp-1".into(),
        issued_at: "2024-01-01T00:00:00Z".into(),
        kind: ServerResponseKind::BtpsResponse,
        status: ResponseStatus { ok: true, code: 200, message: None },
        req_id: None,
        document: None,
        signature: Some(Signature {
            algorithm_hash: "sha256".into(),
            value: "x".into(),
            fingerprint: "y".into(),
        }),
        encryption: None,
        signed_by: None,
        selector: None,
    };
    // has a signature but no signed_by/selector
    response.signature = Some(sign::sign_bytes(b"irrelevant", &private, &public).unwrap());

    let err = framer.process_message(response).await.unwrap_err();
    assert!(matches!(err, btps_agent::AgentError::MissingSignerContext));
}
