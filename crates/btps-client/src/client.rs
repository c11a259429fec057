// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! `BtpsClient`: the end-user-facing facade wiring the
//! identity resolver, crypto envelope, optional delegation, a single
//! Connection Engine to the principal's own server, and the serial
//! command queue that frames and dispatches agent artifacts over it.
//!
//! Grounded on a `service::run()`-style composition root
//! (`crates/service/src/service.rs`): one struct built once at startup
//! from a handful of already-resolved dependencies, exposing a small set
//! of high-level operations rather than the pieces that compose them.

use std::sync::Arc;

use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use tokio::sync::mpsc;

use btps_agent::{AgentFramer, CommandQueue, CryptoOpts, ProcessedMessage};
use btps_delegation::{Delegator, Principal};
use btps_resolver::{DnsLookup, Resolver};
use btps_transport::{ConnectionEngine, Connector, EngineConfig};
use btps_types::{AgentAction, Identity};

use crate::error::ClientError;

/// Everything needed to stand up a [`BtpsClient`] for one principal.
pub struct BtpsClientConfig {
    pub agent_id: String,
    pub principal: Identity,
    pub selector: String,
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
    pub dns: Arc<dyn DnsLookup>,
    pub connector: Arc<dyn Connector>,
    pub engine_config: EngineConfig,
    /// Present when this client signs on behalf of the principal as a
    /// delegated SaaS identity rather than as the principal itself.
    pub delegator: Option<Delegator>,
    pub delegation_principal: Option<Principal>,
}

/// A live connection to the principal's own server plus the serial
/// command queue dispatching agent artifacts over it.
pub struct BtpsClient {
    queue: Arc<CommandQueue>,
    principal: Identity,
}

impl BtpsClient {
    /// Resolves the principal's own server, connects a Connection Engine
    /// to it, and starts the background command queue.
    pub async fn connect(config: BtpsClientConfig) -> Result<Self, ClientError> {
        let engine_resolver = Arc::new(Resolver::new(config.dns.clone()));
        let engine = ConnectionEngine::new(engine_resolver, config.connector, config.engine_config);

        let framer = Arc::new(AgentFramer {
            agent_id: config.agent_id,
            principal: config.principal.clone(),
            selector: config.selector,
            private_key: config.private_key,
            public_key: config.public_key,
            resolver: Resolver::new(config.dns),
            delegator: config.delegator,
            delegation_principal: config.delegation_principal,
        });

        let principal = config.principal.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        engine.connect(config.principal.clone(), tx.clone())
            .await
            .map_err(ClientError::Transport)?;

        let queue = CommandQueue::new(framer, engine, config.principal, tx, rx);
        Ok(Self { queue, principal })
    }

    /// `system.ping` — the one trust-ungated liveness probe.
    /// Its agent artifact's `to` is always the principal's own server
    /// regardless of the `to` argument `command()` takes, so this passes
    /// the principal identity through for uniformity with the other
    /// operations rather than introducing a placeholder.
    pub async fn system_ping(&self) -> Result<ProcessedMessage, ClientError> {
        self.queue
            .submit(AgentAction::SystemPing, self.principal.clone(), None, None)
            .await
            .map_err(ClientError::Agent)
    }

    /// `trust.request` — asks `to` to open a trust relationship.
    pub async fn trust_request(&self, to: Identity, document: Value) -> Result<ProcessedMessage, ClientError> {
        self.queue
            .submit(AgentAction::TrustRequest, to, Some(document), None)
            .await
            .map_err(ClientError::Agent)
    }

    /// `artifact.send` — delivers a business document, optionally
    /// end-to-end encrypted for `to`.
    pub async fn send_artifact(
        &self,
        to: Identity,
        document: Value,
        crypto_opts: Option<CryptoOpts>,
    ) -> Result<ProcessedMessage, ClientError> {
        self.queue
            .submit(AgentAction::ArtifactSend, to, Some(document), crypto_opts)
            .await
            .map_err(ClientError::Agent)
    }
}
