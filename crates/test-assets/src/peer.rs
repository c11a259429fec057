// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! A minimal loopback peer for `ConnectionEngine`/`ConnectionPool`
//! integration tests, generalizing the one-off TCP listeners written ad
//! hoc in `btps-transport`'s and `btps-pool`'s own test files.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Binds an ephemeral loopback port and returns it alongside the bound
/// listener, so callers can register DNS records before the peer starts
/// accepting.
pub async fn bind_loopback() -> (TcpListener, std::net::SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("loopback bind never fails in tests");
    let addr = listener.local_addr().expect("a bound socket always has a local address");
    (listener, addr)
}

/// Accepts a single connection and echoes back one `btps_response` line,
/// correlated to the request's own `id` via `req_id`, for every
/// newline-delimited JSON line it reads.
pub fn spawn_echo_responder(listener: TcpListener) {
    tokio::spawn(async move {
        let Ok((socket, _)) = listener.accept().await else { return };
        echo_one_connection(socket).await;
    });
}

/// Like [`spawn_echo_responder`], but keeps accepting a fresh connection
/// after each one closes — for exercising a client that ends its engine
/// between commands and redials for the next one.
pub fn spawn_echo_responder_multi(listener: TcpListener) {
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else { return };
            echo_one_connection(socket).await;
        }
    });
}

async fn echo_one_connection(mut socket: tokio::net::TcpStream) {
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
            let Ok(text) = std::str::from_utf8(&line) else { continue };
            let Ok(request) = serde_json::from_str::<serde_json::Value>(text.trim()) else { continue };
            let response = serde_json::json!({
                "version": "1.0.0",
                "id": format!("resp-{}", request["id"]),
                "issued_at": "2024-01-01T00:00:00Z",
                "type": "btps_response",
                "status": {"ok": true, "code": 200},
                "req_id": request["id"],
            });
            let out = format!("{response}\n");
            if socket.write_all(out.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}
