// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Connection Engine: a single TLS stream's lifecycle with
//! one peer, exposing an in-order event stream to a single listener set
//! per `connect()` call.
//!
//! Deliberately not built on an actor framework such as `ractor`: the
//! state table below maps onto a direct `tokio`-task event loop more
//! simply than onto an actor's message-handler model (see `DESIGN.md`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{split, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use btps_resolver::Resolver;
use btps_types::artifact::ServerResponse;
use btps_types::{BtpsError, Identity};

use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::error::TransportError;
use crate::events::EngineEvent;
use crate::retry::is_non_retryable;
use crate::state::EngineState;
use crate::stream::BoxedStream;

struct Inner {
    state: EngineState,
    to: Option<Identity>,
    listeners: Option<mpsc::UnboundedSender<EngineEvent>>,
    is_connecting: bool,
    is_draining: bool,
    destroyed: bool,
    should_retry: bool,
    attempt: u32,
    retries_left: u32,
    write_tx: Option<mpsc::UnboundedSender<String>>,
    pending_writes: Arc<AtomicUsize>,
    /// Bumped on every connect()/end()/destroy(); background tasks check
    /// their captured generation before acting so a stale retry attempt
    /// from a previous connect() call can never clobber a newer one.
    generation: u64,
}

impl Inner {
    fn fresh() -> Self {
        Self {
            state: EngineState::Idle,
            to: None,
            listeners: None,
            is_connecting: false,
            is_draining: false,
            destroyed: false,
            should_retry: true,
            attempt: 0,
            retries_left: 0,
            write_tx: None,
            pending_writes: Arc::new(AtomicUsize::new(0)),
            generation: 0,
        }
    }
}

pub struct ConnectionEngine {
    resolver: Arc<Resolver>,
    connector: Arc<dyn Connector>,
    config: EngineConfig,
    inner: Mutex<Inner>,
}

impl ConnectionEngine {
    pub fn new(resolver: Arc<Resolver>, connector: Arc<dyn Connector>, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            resolver,
            connector,
            config,
            inner: Mutex::new(Inner::fresh()),
        })
    }

    pub async fn state(&self) -> EngineState {
        self.inner.lock().await.state
    }

    pub fn get_protocol_version(&self) -> &'static str {
        btps_types::constants::PROTOCOL_VERSION
    }

    /// Idempotent w.r.t. the already-connected/connecting case (spec
    /// §4.4): emits `connected` immediately, or an `AlreadyConnecting`
    /// error, rather than starting a second resolution.
    pub async fn connect(
        self: &Arc<Self>,
        to: Identity,
        listeners: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), BtpsError> {
        let mut inner = self.inner.lock().await;
        if inner.destroyed {
            return Err(TransportError::Destroyed.into());
        }
        if inner.state == EngineState::Connected {
            let _ = listeners.send(EngineEvent::Connected);
            return Ok(());
        }
        if inner.is_connecting {
            return Err(TransportError::AlreadyConnecting.into());
        }

        inner.listeners = Some(listeners);
        inner.to = Some(to.clone());
        inner.attempt = 0;
        inner.retries_left = self.config.max_retries;
        inner.should_retry = true;
        inner.state = EngineState::Resolving;
        inner.generation += 1;
        let generation = inner.generation;
        drop(inner);

        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_connect_cycle(to, generation).await });
        Ok(())
    }

    /// Serializes `line` (already-JSON) and pushes it onto the
    /// per-connection backpressure queue; the writer task drains it
    /// against the socket. Sending while nothing is connected queues the
    /// artifact to be lost on the dropped sender, which surfaces to the
    /// caller as a closed-channel condition — callers are expected to
    /// `connect()` first.
    pub async fn send_line(&self, line: String) -> Result<(), BtpsError> {
        let inner = self.inner.lock().await;
        if inner.destroyed {
            return Err(TransportError::Destroyed.into());
        }
        let tx = inner
            .write_tx
            .clone()
            .ok_or_else(|| BtpsError::from(TransportError::Io("not connected".into())))?;
        inner.pending_writes.fetch_add(1, Ordering::SeqCst);
        drop(inner);
        tx.send(line)
            .map_err(|_| BtpsError::from(TransportError::Io("writer task has stopped".into())))
    }

    /// Half-close: stop accepting new writes and drop the socket
    /// reference. The writer/reader tasks observe the closed channel /
    /// dropped stream and wind down on their own.
    pub async fn end(&self) {
        let mut inner = self.inner.lock().await;
        inner.is_connecting = false;
        inner.state = EngineState::Ended;
        inner.write_tx = None;
        inner.generation += 1;
    }

    /// Hard close: clears queues, drops listeners, and rejects all
    /// further calls with `Destroyed`.
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        inner.destroyed = true;
        inner.state = EngineState::Destroyed;
        inner.is_connecting = false;
        inner.listeners = None;
        inner.write_tx = None;
        inner.pending_writes.store(0, Ordering::SeqCst);
        inner.generation += 1;
    }

    async fn run_connect_cycle(self: Arc<Self>, to: Identity, generation: u64) {
        loop {
            if self.is_stale(generation).await {
                return;
            }

            let host = match self.resolver.resolve_host(&to).await {
                Ok(host) => host,
                Err(e) => {
                    if self
                        .handle_attempt_failure(generation, BtpsError::from(e))
                        .await
                    {
                        continue;
                    }
                    return;
                }
            };

            {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation || inner.destroyed {
                    return;
                }
                inner.is_connecting = true;
                inner.state = EngineState::Connecting;
            }

            let connect_result = tokio::time::timeout(
                Duration::from_millis(self.config.connection_timeout_ms),
                self.connector.connect(&host.host_url),
            )
            .await;

            let stream = match connect_result {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    if self
                        .handle_attempt_failure(generation, BtpsError::from(e))
                        .await
                    {
                        continue;
                    }
                    return;
                }
                Err(_) => {
                    if self
                        .handle_attempt_failure(generation, BtpsError::from(TransportError::Timeout))
                        .await
                    {
                        continue;
                    }
                    return;
                }
            };

            {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation || inner.destroyed {
                    return;
                }
                inner.state = EngineState::Connected;
            }

            self.spawn_io_tasks(stream, generation).await;

            let inner = self.inner.lock().await;
            if let Some(listeners) = &inner.listeners {
                let _ = listeners.send(EngineEvent::Connected);
            }
            return;
        }
    }

    async fn is_stale(&self, generation: u64) -> bool {
        let inner = self.inner.lock().await;
        inner.generation != generation || inner.destroyed
    }

    /// Emits the `error` event for a resolve/connect-time failure and
    /// decides whether the caller's loop should retry. Returns `true`
    /// when the caller should sleep and attempt again.
    async fn handle_attempt_failure(&self, generation: u64, error: BtpsError) -> bool {
        let (will_retry, retries_left, attempt, listeners, retry_delay_ms) = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation || inner.destroyed {
                return false;
            }
            inner.attempt += 1;
            let non_retryable = is_non_retryable(&error.message) || !error.kind.is_retryable() && matches!(
                error.kind,
                btps_types::BtpsErrorKind::InvalidIdentity
                    | btps_types::BtpsErrorKind::InvalidHostname
                    | btps_types::BtpsErrorKind::UnsupportedProtocol
                    | btps_types::BtpsErrorKind::SignatureVerificationFailed
                    | btps_types::BtpsErrorKind::Destroyed
                    | btps_types::BtpsErrorKind::ResolveDns
                    | btps_types::BtpsErrorKind::AlreadyConnecting
            );
            let will_retry = inner.attempt <= self.config.max_retries
                && !inner.destroyed
                && !non_retryable
                && inner.should_retry;
            if inner.retries_left > 0 {
                inner.retries_left -= 1;
            }
            if will_retry {
                inner.state = EngineState::Retrying;
            } else {
                inner.state = EngineState::Failed;
                inner.is_connecting = false;
            }
            (
                will_retry,
                inner.retries_left,
                inner.attempt,
                inner.listeners.clone(),
                self.config.retry_delay_ms,
            )
        };

        if let Some(listeners) = &listeners {
            let _ = listeners.send(EngineEvent::Error {
                error: error.clone(),
                will_retry,
                retries_left,
                attempt,
            });
        }

        if !will_retry {
            if let Some(listeners) = &listeners {
                let _ = listeners.send(EngineEvent::End {
                    will_retry: false,
                    retries_left,
                    attempt,
                });
            }
            return false;
        }

        tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
        if self.is_stale(generation).await {
            return false;
        }
        {
            let mut inner = self.inner.lock().await;
            inner.state = EngineState::Resolving;
        }
        true
    }

    fn spawn_io_tasks<'a>(
        self: &'a Arc<Self>,
        stream: BoxedStream,
        generation: u64,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let (read_half, write_half) = split(stream);

            let (write_tx, write_rx) = mpsc::unbounded_channel::<String>();
            {
                let mut inner = self.inner.lock().await;
                inner.write_tx = Some(write_tx);
            }

            let writer_engine = Arc::clone(self);
            tokio::spawn(async move { writer_engine.run_writer(write_half, write_rx, generation).await });

            let reader_engine = Arc::clone(self);
            tokio::spawn(async move { reader_engine.run_reader(read_half, generation).await });
        })
    }

    async fn run_writer(
        self: Arc<Self>,
        write_half: WriteHalf<BoxedStream>,
        mut write_rx: mpsc::UnboundedReceiver<String>,
        generation: u64,
    ) {
        let mut framed = FramedWrite::new(write_half, LinesCodec::new());
        while let Some(line) = write_rx.recv().await {
            if self.is_stale(generation).await {
                return;
            }
            {
                let mut inner = self.inner.lock().await;
                if inner.pending_writes.load(Ordering::SeqCst) > 1 {
                    inner.is_draining = true;
                }
            }
            if let Err(e) = framed.send(line).await {
                tracing::warn!(error = %e, "connection engine write failed");
                return;
            }
            let mut inner = self.inner.lock().await;
            let remaining = inner.pending_writes.fetch_sub(1, Ordering::SeqCst) - 1;
            if remaining == 0 {
                inner.is_draining = false;
            }
        }
    }

    async fn run_reader(self: Arc<Self>, read_half: ReadHalf<BoxedStream>, generation: u64) {
        let mut framed = FramedRead::new(read_half, LinesCodec::new());
        loop {
            let next = framed.next().await;
            if self.is_stale(generation).await {
                return;
            }
            match next {
                Some(Ok(line)) => match serde_json::from_str::<ServerResponse>(&line) {
                    Ok(response) => {
                        let mut inner = self.inner.lock().await;
                        inner.should_retry = false;
                        if let Some(listeners) = &inner.listeners {
                            let _ = listeners.send(EngineEvent::Message(response));
                        }
                    }
                    Err(e) => {
                        self.end_stream(generation, Some(TransportError::Syntax(e.to_string()).into()), true)
                            .await;
                        return;
                    }
                },
                Some(Err(e)) => {
                    self.end_stream(generation, Some(TransportError::Io(e.to_string()).into()), false)
                        .await;
                    return;
                }
                None => {
                    self.end_stream(generation, None, false).await;
                    return;
                }
            }
        }
    }

    /// Handles a peer-initiated end (`cause = None`) or a framing/IO
    /// error (`cause = Some`), applying the retry policy and emitting
    /// `error`/`end` events. `syntax_error` forces a non-retryable end
    /// regardless of attempt count.
    async fn end_stream(self: &Arc<Self>, generation: u64, cause: Option<BtpsError>, syntax_error: bool) {
        let (will_retry, retries_left, attempt, listeners) = {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation || inner.destroyed {
                return;
            }
            inner.attempt += 1;
            let non_retryable = syntax_error
                || cause
                    .as_ref()
                    .map(|e| is_non_retryable(&e.message))
                    .unwrap_or(false);
            let will_retry = inner.attempt <= self.config.max_retries
                && !inner.destroyed
                && !syntax_error
                && !non_retryable
                && inner.should_retry;
            if inner.retries_left > 0 {
                inner.retries_left -= 1;
            }
            inner.state = if will_retry {
                EngineState::Retrying
            } else if cause.is_some() {
                EngineState::Failed
            } else {
                EngineState::Ended
            };
            inner.is_connecting = false;
            (will_retry, inner.retries_left, inner.attempt, inner.listeners.clone())
        };

        if let (Some(err), Some(listeners)) = (&cause, &listeners) {
            let _ = listeners.send(EngineEvent::Error {
                error: err.clone(),
                will_retry,
                retries_left,
                attempt,
            });
        }
        if let Some(listeners) = &listeners {
            let _ = listeners.send(EngineEvent::End {
                will_retry,
                retries_left,
                attempt,
            });
        }

        if will_retry {
            if let Some(to) = self.inner.lock().await.to.clone() {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                if self.is_stale(generation).await {
                    return;
                }
                {
                    let mut inner = self.inner.lock().await;
                    inner.state = EngineState::Resolving;
                }
                let engine = Arc::clone(self);
                tokio::spawn(async move { engine.run_connect_cycle(to, generation).await });
            }
        }
    }
}
