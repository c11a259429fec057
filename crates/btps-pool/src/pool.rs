// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Connection Transporter: a bounded pool of Connection
//! Engines keyed by destination identity, reused across calls and
//! evicted after `connection_ttl_seconds` of inactivity.
//!
//! Grounded on a `TapManager`-style registry: an `Arc<RwLock<HashMap<Key,
//! Value>>>` of per-key state plus a background task per managed entry,
//! rather than one shared update loop — pool entries have independent
//! TTLs, so one watchdog per entry maps more directly onto an
//! independent per-entry timer than one shared sweep would (see
//! `DESIGN.md`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, Mutex};

use btps_resolver::Resolver;
use btps_transport::{Connector, ConnectionEngine, EngineConfig, EngineEvent};
use btps_types::artifact::{ServerResponse, TransporterArtifact};
use btps_types::constants::{DEFAULT_CONNECTION_TTL_SECONDS, DEFAULT_MAX_CONNECTIONS};
use btps_types::{BtpsError, Identity};

use crate::error::PoolError;
use crate::events::PoolEvent;
use crate::metrics::{ACTIVE_CONNECTIONS, TOTAL_CONNECTIONS};

#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_connections: usize,
    pub connection_ttl: Duration,
    pub engine_config: EngineConfig,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connection_ttl: Duration::from_secs(DEFAULT_CONNECTION_TTL_SECONDS),
            engine_config: EngineConfig::default(),
        }
    }
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<ServerResponse, BtpsError>>>>>;

struct Entry {
    engine: Arc<ConnectionEngine>,
    pending: PendingMap,
    last_used: Arc<Mutex<Instant>>,
}

pub struct ConnectionPool {
    resolver: Arc<Resolver>,
    connector: Arc<dyn Connector>,
    options: PoolOptions,
    connections: Mutex<HashMap<Identity, Entry>>,
    listeners: Mutex<Option<mpsc::UnboundedSender<PoolEvent>>>,
    destroyed: Mutex<bool>,
}

impl ConnectionPool {
    pub fn new(resolver: Arc<Resolver>, connector: Arc<dyn Connector>, options: PoolOptions) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            connector,
            options,
            connections: Mutex::new(HashMap::new()),
            listeners: Mutex::new(None),
            destroyed: Mutex::new(false),
        })
    }

    pub async fn set_listener(&self, tx: mpsc::UnboundedSender<PoolEvent>) {
        *self.listeners.lock().await = Some(tx);
    }

    async fn emit(&self, event: PoolEvent) {
        if let Some(tx) = self.listeners.lock().await.as_ref() {
            let _ = tx.send(event);
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Creates and registers a new engine for `to`. Fails with
    /// `AlreadyExists` unless `override_existing` is set, in which case
    /// the prior entry is torn down first.
    pub async fn register_connection(
        self: &Arc<Self>,
        to: Identity,
        override_existing: bool,
    ) -> Result<(), PoolError> {
        if *self.destroyed.lock().await {
            return Err(PoolError::Transport(BtpsError::from(btps_types::BtpsErrorKind::Destroyed)));
        }
        let already_registered = self.connections.lock().await.contains_key(&to);
        if already_registered {
            if !override_existing {
                return Err(PoolError::AlreadyExists(to.to_string()));
            }
            self.deregister_connection(&to).await;
        }
        let at_capacity = self.connections.lock().await.len() >= self.options.max_connections;
        if at_capacity {
            return Err(PoolError::MaxConnectionsReached(self.options.max_connections));
        }

        let engine = ConnectionEngine::new(
            Arc::clone(&self.resolver),
            Arc::clone(&self.connector),
            self.options.engine_config,
        );
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let last_used = Arc::new(Mutex::new(Instant::now()));

        let (tx, rx) = mpsc::unbounded_channel();
        engine
            .connect(to.clone(), tx)
            .await
            .map_err(PoolError::Transport)?;

        let forward_pool = Arc::clone(self);
        let forward_to = to.clone();
        let forward_pending = Arc::clone(&pending);
        let forward_last_used = Arc::clone(&last_used);
        tokio::spawn(async move {
            forward_pool
                .forward_events(forward_to, rx, forward_pending, forward_last_used)
                .await;
        });

        self.connections.lock().await.insert(
            to.clone(),
            Entry {
                engine,
                pending,
                last_used: Arc::clone(&last_used),
            },
        );
        TOTAL_CONNECTIONS.inc();

        let watchdog_pool = Arc::clone(self);
        let watchdog_to = to.clone();
        let ttl = self.options.connection_ttl;
        tokio::spawn(async move { watchdog_pool.ttl_watchdog(watchdog_to, last_used, ttl).await });

        self.emit(PoolEvent::Created { to }).await;
        Ok(())
    }

    /// Safe to call on a key with no entry.
    pub async fn deregister_connection(self: &Arc<Self>, to: &Identity) {
        let entry = self.connections.lock().await.remove(to);
        if let Some(entry) = entry {
            entry.engine.destroy().await;
            TOTAL_CONNECTIONS.dec();
        }
        self.emit(PoolEvent::Destroyed { to: to.clone() }).await;
    }

    /// Resets an entry's idle timer, extending it past eviction.
    pub async fn update_connection(&self, to: &Identity) -> Result<(), PoolError> {
        let connections = self.connections.lock().await;
        let entry = connections
            .get(to)
            .ok_or_else(|| PoolError::InvalidArtifact(format!("no connection registered for {to}")))?;
        *entry.last_used.lock().await = Instant::now();
        drop(connections);
        self.emit(PoolEvent::Updated { to: to.clone() }).await;
        Ok(())
    }

    /// Ensures a connection exists, sends `artifact`, and resolves with
    /// the matching server response (correlated by `artifact.id` ==
    /// `response.req_id`).
    pub async fn transport(
        self: &Arc<Self>,
        to: &Identity,
        artifact: &TransporterArtifact,
        timeout_override_ms: Option<u64>,
    ) -> Result<ServerResponse, PoolError> {
        validate_transporter_artifact(artifact)?;

        let already_registered = self.connections.lock().await.contains_key(to);
        if !already_registered {
            match self.register_connection(to.clone(), false).await {
                Ok(()) | Err(PoolError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let (pending, engine) = {
            let connections = self.connections.lock().await;
            let entry = connections
                .get(to)
                .ok_or_else(|| PoolError::InvalidArtifact(format!("no connection registered for {to}")))?;
            *entry.last_used.lock().await = Instant::now();
            (Arc::clone(&entry.pending), Arc::clone(&entry.engine))
        };

        let (responder, rx) = oneshot::channel();
        pending.lock().await.insert(artifact.id.clone(), responder);

        let line = serde_json::to_string(artifact)
            .map_err(|e| PoolError::InvalidArtifact(e.to_string()))?;
        engine.send_line(line).await.map_err(PoolError::Transport)?;

        let timeout_ms = timeout_override_ms.unwrap_or(self.options.engine_config.connection_timeout_ms);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(result)) => result.map_err(PoolError::Transport),
            Ok(Err(_)) => Err(PoolError::Unresolved(artifact.id.clone())),
            Err(_) => {
                pending.lock().await.remove(&artifact.id);
                Err(PoolError::Transport(BtpsError::from(
                    btps_types::BtpsErrorKind::ConnectionTimeout,
                )))
            }
        }
    }

    /// Concurrent `transport()` per artifact on the shared engine,
    /// returning results in the same order as `artifacts`.
    pub async fn transport_batch(
        self: &Arc<Self>,
        to: &Identity,
        artifacts: &[TransporterArtifact],
        timeout_override_ms: Option<u64>,
    ) -> Vec<Result<ServerResponse, PoolError>> {
        let futures = artifacts
            .iter()
            .map(|artifact| self.transport(to, artifact, timeout_override_ms));
        futures::future::join_all(futures).await
    }

    /// Deregisters every entry and stops accepting new registrations.
    pub async fn destroy(self: &Arc<Self>) {
        *self.destroyed.lock().await = true;
        let keys: Vec<Identity> = self.connections.lock().await.keys().cloned().collect();
        for to in keys {
            self.deregister_connection(&to).await;
        }
        *self.listeners.lock().await = None;
    }

    async fn evict(self: &Arc<Self>, to: &Identity) {
        let still_registered = self.connections.lock().await.contains_key(to);
        if still_registered {
            self.emit(PoolEvent::Evicted { to: to.clone() }).await;
            self.deregister_connection(to).await;
        }
    }

    async fn ttl_watchdog(self: Arc<Self>, to: Identity, last_used: Arc<Mutex<Instant>>, ttl: Duration) {
        loop {
            let elapsed = last_used.lock().await.elapsed();
            if elapsed >= ttl {
                self.evict(&to).await;
                return;
            }
            tokio::time::sleep(ttl - elapsed).await;
            let still_registered = self.connections.lock().await.contains_key(&to);
            if !still_registered {
                return;
            }
        }
    }

    async fn forward_events(
        self: Arc<Self>,
        to: Identity,
        mut events: mpsc::UnboundedReceiver<EngineEvent>,
        pending: PendingMap,
        last_used: Arc<Mutex<Instant>>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Connected => {
                    ACTIVE_CONNECTIONS.inc();
                    self.emit(PoolEvent::Connected { to: to.clone() }).await;
                }
                EngineEvent::Message(response) => {
                    *last_used.lock().await = Instant::now();
                    if let Some(req_id) = &response.req_id {
                        if let Some(responder) = pending.lock().await.remove(req_id) {
                            let _ = responder.send(Ok(response.clone()));
                        }
                    }
                    self.emit(PoolEvent::Message { to: to.clone(), response }).await;
                }
                EngineEvent::Error { error, will_retry, retries_left, attempt } => {
                    self.emit(PoolEvent::Error {
                        to: to.clone(),
                        error,
                        will_retry,
                        retries_left,
                        attempt,
                    })
                    .await;
                }
                EngineEvent::End { will_retry, retries_left, attempt } => {
                    if !will_retry {
                        ACTIVE_CONNECTIONS.dec();
                        let mut pending = pending.lock().await;
                        for (_, responder) in pending.drain() {
                            let _ = responder.send(Err(BtpsError::from(
                                btps_types::BtpsErrorKind::ConnectionEndedEarly,
                            )));
                        }
                    }
                    self.emit(PoolEvent::End { to: to.clone(), will_retry, retries_left, attempt })
                        .await;
                    if !will_retry {
                        self.emit(PoolEvent::Close { to: to.clone() }).await;
                        return;
                    }
                }
            }
        }
    }
}

fn validate_transporter_artifact(artifact: &TransporterArtifact) -> Result<(), PoolError> {
    if artifact.signature.value.is_empty() || artifact.signature.fingerprint.is_empty() {
        return Err(PoolError::InvalidArtifact("artifact is unsigned".into()));
    }
    if artifact.selector.is_empty() {
        return Err(PoolError::InvalidArtifact("artifact is missing a selector".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_the_published_defaults() {
        let options = PoolOptions::default();
        assert_eq!(options.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(options.connection_ttl, Duration::from_secs(DEFAULT_CONNECTION_TTL_SECONDS));
    }

    #[test]
    fn an_unsigned_artifact_fails_validation() {
        let artifact = TransporterArtifact {
            version: "1.0.0".into(),
            id: "req-1".into(),
            issued_at: "2024-01-01T00:00:00Z".into(),
            from: "alice$example.com".parse().unwrap(),
            to: "bob$company.com".parse().unwrap(),
            kind: btps_types::artifact::TransporterKind::BtpsDoc,
            document: btps_types::artifact::TransporterDocument::Business(serde_json::json!({})),
            signature: btps_types::artifact::Signature {
                algorithm_hash: "sha256".into(),
                value: "".into(),
                fingerprint: "".into(),
            },
            encryption: None,
            selector: "btps1".into(),
            delegation: None,
        };
        assert!(validate_transporter_artifact(&artifact).is_err());
    }
}
