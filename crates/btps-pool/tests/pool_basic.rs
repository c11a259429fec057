// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use btps_pool::{ConnectionPool, PoolError, PoolOptions};
use btps_resolver::{DnsLookup, ResolveError, Resolver};
use btps_transport::PlainTcpConnector;
use btps_types::artifact::{Signature, TransporterArtifact, TransporterDocument, TransporterKind};
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

fn sample_artifact(id: &str) -> TransporterArtifact {
    TransporterArtifact {
        version: "1.0.0".into(),
        id: id.into(),
        issued_at: "2024-01-01T00:00:00Z".into(),
        from: "alice$example.com".parse().unwrap(),
        to: "bob$company.com".parse().unwrap(),
        kind: TransporterKind::BtpsDoc,
        document: TransporterDocument::Business(serde_json::json!({"hello": "world"})),
        signature: Signature {
            algorithm_hash: "sha256".into(),
            value: "sig".into(),
            fingerprint: "fp".into(),
        },
        encryption: None,
        selector: "btps1".into(),
        delegation: None,
    }
}

/// Accepts one connection and echoes a server response for each
/// newline-delimited request it reads, keyed by the request's own id.
async fn spawn_echo_server(listener: TcpListener) {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        loop {
            let mut chunk = [0u8; 4096];
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line);
                let request: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
                let response = serde_json::json!({
                    "version": "1.0.0",
                    "id": format!("resp-{}", request["id"]),
                    "issued_at": "2024-01-01T00:00:00Z",
                    "type": "btps_response",
                    "status": {"ok": true, "code": 200},
                    "req_id": request["id"],
                });
                let out = format!("{}\n", response);
                if socket.write_all(out.as_bytes()).await.is_err() {
                    return;
                }
            }
        }
    });
}

fn pool_for(addr: std::net::SocketAddr) -> Arc<ConnectionPool> {
    let dns = Arc::new(StaticDns {
        owner: "_btps.host.company.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    ConnectionPool::new(resolver, connector, PoolOptions::default())
}

#[tokio::test]
async fn transport_registers_on_demand_and_resolves_by_req_id() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_echo_server(listener).await;

    let pool = pool_for(addr);
    let to: Identity = "bob$company.com".parse().unwrap();
    let artifact = sample_artifact("req-1");

    let response = pool.transport(&to, &artifact, Some(2_000)).await.unwrap();
    assert_eq!(response.req_id.as_deref(), Some("req-1"));
    assert_eq!(pool.len().await, 1);
}

#[tokio::test]
async fn register_connection_twice_without_override_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_echo_server(listener).await;

    let pool = pool_for(addr);
    let to: Identity = "bob$company.com".parse().unwrap();
    pool.register_connection(to.clone(), false).await.unwrap();
    let err = pool.register_connection(to.clone(), false).await.unwrap_err();
    assert!(matches!(err, PoolError::AlreadyExists(_)));
}

#[tokio::test]
async fn pool_rejects_registration_past_max_connections() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_echo_server(listener).await;

    let dns = Arc::new(StaticDns {
        owner: "_btps.host.company.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let options = PoolOptions { max_connections: 1, ..PoolOptions::default() };
    let pool = ConnectionPool::new(resolver, connector, options);

    let a: Identity = "bob$company.com".parse().unwrap();
    let b: Identity = "carol$company.com".parse().unwrap();
    pool.register_connection(a, false).await.unwrap();
    let err = pool.register_connection(b, false).await.unwrap_err();
    assert!(matches!(err, PoolError::MaxConnectionsReached(1)));
}

#[tokio::test]
async fn deregister_is_safe_on_a_nonexistent_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let dns = Arc::new(StaticDns {
        owner: "_btps.host.company.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let pool = ConnectionPool::new(resolver, connector, PoolOptions::default());

    let to: Identity = "nobody$company.com".parse().unwrap();
    pool.deregister_connection(&to).await;
    assert_eq!(pool.len().await, 0);
}

#[tokio::test]
async fn an_idle_entry_is_evicted_once_its_ttl_elapses() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_echo_server(listener).await;

    let dns = Arc::new(StaticDns {
        owner: "_btps.host.company.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let ttl = std::time::Duration::from_millis(50);
    let options = PoolOptions { connection_ttl: ttl, ..PoolOptions::default() };
    let pool = ConnectionPool::new(resolver, connector, options);

    let to: Identity = "bob$company.com".parse().unwrap();
    pool.register_connection(to.clone(), false).await.unwrap();
    assert_eq!(pool.len().await, 1);

    tokio::time::sleep(ttl * 4).await;
    assert_eq!(pool.len().await, 0);
}

#[tokio::test]
async fn update_connection_resets_the_ttl_clock() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_echo_server(listener).await;

    let dns = Arc::new(StaticDns {
        owner: "_btps.host.company.com".to_string(),
        txt: format!("v=1.0.0; u=btps://127.0.0.1:{}; s=btps1", addr.port()),
    });
    let resolver = Arc::new(Resolver::new(dns));
    let connector = Arc::new(PlainTcpConnector { default_port: addr.port() });
    let ttl = std::time::Duration::from_millis(80);
    let options = PoolOptions { connection_ttl: ttl, ..PoolOptions::default() };
    let pool = ConnectionPool::new(resolver, connector, options);

    let to: Identity = "bob$company.com".parse().unwrap();
    pool.register_connection(to.clone(), false).await.unwrap();

    tokio::time::sleep(ttl / 2).await;
    pool.update_connection(&to).await.unwrap();
    tokio::time::sleep(ttl / 2).await;
    assert_eq!(pool.len().await, 1, "refreshed entry must survive past its original deadline");

    tokio::time::sleep(ttl * 4).await;
    assert_eq!(pool.len().await, 0);
}

