// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Serial per-engine command queue: exactly one agent
//! artifact is ever in flight on a given [`ConnectionEngine`], later
//! submissions wait their turn keyed by a fresh id, and a terminal
//! connection event resolves every outstanding submission with the same
//! error rather than leaving callers hanging.

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use uuid::Uuid;

use btps_transport::{ConnectionEngine, EngineEvent, EngineState};
use btps_types::{AgentAction, BtpsError, BtpsErrorKind, Identity};

use crate::command::{AgentFramer, CryptoOpts};
use crate::error::AgentError;
use crate::process::ProcessedMessage;

struct QueuedCommand {
    #[allow(dead_code)]
    id: String,
    action: AgentAction,
    to: Identity,
    document: Option<Value>,
    crypto_opts: Option<CryptoOpts>,
    responder: oneshot::Sender<Result<ProcessedMessage, AgentError>>,
}

struct QueueState {
    pending: VecDeque<QueuedCommand>,
    inflight: Option<oneshot::Sender<Result<ProcessedMessage, AgentError>>>,
}

pub struct CommandQueue {
    framer: Arc<AgentFramer>,
    engine: Arc<ConnectionEngine>,
    to: Identity,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    state: Mutex<QueueState>,
}

impl CommandQueue {
    /// Spawns the background worker that drains `events` and advances
    /// the queue. `events`/`events_tx` are the two halves of the channel
    /// passed to the first `engine.connect()`; `to` is that same call's
    /// target, kept so a later drain-then-idle engine can be reconnected
    /// for a subsequent command without the caller redoing the dial.
    pub fn new(
        framer: Arc<AgentFramer>,
        engine: Arc<ConnectionEngine>,
        to: Identity,
        events_tx: mpsc::UnboundedSender<EngineEvent>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
    ) -> Arc<Self> {
        let queue = Arc::new(Self {
            framer,
            engine,
            to,
            events_tx,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                inflight: None,
            }),
        });
        let worker = Arc::clone(&queue);
        tokio::spawn(async move { worker.run(events).await });
        queue
    }

    /// Enqueues a command and waits for its response (or for the
    /// connection to end without one).
    pub async fn submit(
        &self,
        action: AgentAction,
        to: Identity,
        document: Option<Value>,
        crypto_opts: Option<CryptoOpts>,
    ) -> Result<ProcessedMessage, AgentError> {
        let (responder, rx) = oneshot::channel();
        let id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.pending.push_back(QueuedCommand {
                id,
                action,
                to,
                document,
                crypto_opts,
                responder,
            });
        }
        self.try_advance().await;
        rx.await.unwrap_or_else(|_| {
            Err(AgentError::Unresolved(BtpsError::new(BtpsErrorKind::Destroyed)))
        })
    }

    /// Builds and sends the next queued command if none is currently in
    /// flight. Soft-ends the engine once the queue is empty, mirroring a
    /// one-shot-then-release connection lifecycle: the engine half-closes
    /// rather than being irreversibly destroyed, so a later command on
    /// this same queue can redial it.
    ///
    /// `submit()` calls this eagerly, before the engine has necessarily
    /// finished its DNS/TLS handshake, so a pending command is left in
    /// place (rather than failed) until the engine reports `Connected` —
    /// the `EngineEvent::Connected` arm in `run()` below is what actually
    /// drains the queue in that common case. A command submitted after
    /// the engine has already wound down (`Ended`/`Failed` from a prior
    /// drain) finds no one left to redial it, so this also kicks off a
    /// fresh `connect()` before waiting on that same event.
    async fn try_advance(&self) {
        loop {
            let engine_state = self.engine.state().await;
            let mut has_pending = false;
            let next = {
                let mut state = self.state.lock().await;
                if state.inflight.is_some() {
                    return;
                }
                has_pending = !state.pending.is_empty();
                if !has_pending {
                    None
                } else if engine_state == EngineState::Connected {
                    state.pending.pop_front()
                } else {
                    None
                }
            };
            if next.is_none() && has_pending {
                if engine_state.is_terminal() && engine_state != EngineState::Destroyed {
                    let _ = self
                        .engine
                        .connect(self.to.clone(), self.events_tx.clone())
                        .await;
                }
                return;
            }
            let Some(cmd) = next else {
                self.engine.end().await;
                return;
            };

            let artifact = match self
                .framer
                .command(cmd.action, cmd.to, cmd.document, cmd.crypto_opts)
                .await
            {
                Ok(artifact) => artifact,
                Err(err) => {
                    let _ = cmd.responder.send(Err(err));
                    continue;
                }
            };
            let line = match serde_json::to_string(&artifact) {
                Ok(line) => line,
                Err(_) => {
                    let _ = cmd.responder.send(Err(AgentError::MissingSignerContext));
                    continue;
                }
            };

            {
                let mut state = self.state.lock().await;
                state.inflight = Some(cmd.responder);
            }
            if let Err(e) = self.engine.send_line(line).await {
                let mut state = self.state.lock().await;
                if let Some(responder) = state.inflight.take() {
                    let _ = responder.send(Err(AgentError::Unresolved(e)));
                }
                continue;
            }
            return;
        }
    }

    async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
        let mut last_error: Option<BtpsError> = None;
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Connected => self.try_advance().await,
                EngineEvent::Message(response) => {
                    let responder = {
                        let mut state = self.state.lock().await;
                        state.inflight.take()
                    };
                    let result = self.framer.process_message(response).await;
                    if let Some(responder) = responder {
                        let _ = responder.send(result);
                    }
                    self.try_advance().await;
                }
                EngineEvent::Error { error, .. } => {
                    last_error = Some(error);
                }
                EngineEvent::End { will_retry, .. } => {
                    if !will_retry {
                        self.fail_all(last_error.take()).await;
                        return;
                    }
                }
            }
        }
        self.fail_all(last_error).await;
    }

    async fn fail_all(&self, error: Option<BtpsError>) {
        let error = error.unwrap_or_else(|| BtpsError::new(BtpsErrorKind::ConnectionEndedEarly));
        let mut state = self.state.lock().await;
        if let Some(responder) = state.inflight.take() {
            let _ = responder.send(Err(AgentError::Unresolved(error.clone())));
        }
        while let Some(cmd) = state.pending.pop_front() {
            let _ = cmd.responder.send(Err(AgentError::Unresolved(error.clone())));
        }
    }
}
