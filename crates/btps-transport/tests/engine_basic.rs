// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use btps_resolver::{DnsLookup, ResolveError, Resolver};
use btps_transport::{ConnectionEngine, EngineConfig, EngineEvent, EngineState, PlainTcpConnector};
use btps_types::Identity;

struct StaticDns {
    owner: String,
    txt: String,
}

#[async_trait]
impl DnsLookup for StaticDns {
    async fn lookup_txt(&self, owner: &str) -> Result<String, ResolveError> {
        if owner == self.owner {
            Ok(self.txt.clone())
        } else {
            Err(ResolveError::NotFound(owner.to_string()))
        }
    }
}

#[tokio::test]
async fn connect_against_loopback_peer_emits_connected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let response = serde_json::json!({
            "version": "1.0.0",
            "id": "resp-1",
            "issued_at": "2024-01-01T00:00:00Z",
            "type": "btps_response",
            "status": {"ok": true, "code": 200}
        });
        let line = format!("{}\n", response);
        socket.write_all(line.as_bytes()).await.unwrap();
    });

    let dns = Arc::new(StaticDns {
        owner: "_btps.host.example.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let engine = ConnectionEngine::new(resolver, connector, EngineConfig::default());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let identity: Identity = "bob$example.com".parse().unwrap();
    engine.connect(identity, tx).await.unwrap();

    let mut saw_connected = false;
    let mut saw_message = false;
    for _ in 0..2 {
        match tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap()
        {
            EngineEvent::Connected => saw_connected = true,
            EngineEvent::Message(_) => saw_message = true,
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(saw_connected);
    assert!(saw_message);
    assert_eq!(engine.state().await, EngineState::Connected);
}

#[tokio::test]
async fn connect_twice_while_connecting_reports_already_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    });

    let dns = Arc::new(StaticDns {
        owner: "_btps.host.example.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let engine = ConnectionEngine::new(resolver, connector, EngineConfig::default());

    let (tx1, _rx1) = mpsc::unbounded_channel();
    let identity: Identity = "bob$example.com".parse().unwrap();
    engine.connect(identity.clone(), tx1).await.unwrap();

    // Give the background task a moment to move past Idle into Resolving.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let (tx2, _rx2) = mpsc::unbounded_channel();
    let err = engine.connect(identity, tx2).await.unwrap_err();
    assert_eq!(err.kind, btps_types::BtpsErrorKind::AlreadyConnecting);
}
