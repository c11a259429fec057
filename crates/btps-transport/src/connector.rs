// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The socket-opening seam: production dials mutual TLS, `test-assets`
//! substitutes a plain loopback connector.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector as RustlsConnector;

use crate::error::TransportError;
use crate::stream::BoxedStream;

/// Parses a `host:port` (or bare `host`, defaulting per-caller) pair out
/// of a `btps://host:port` URL as published by `resolve_host`.
pub fn parse_host_url(host_url: &str, default_port: u16) -> Result<(String, u16), TransportError> {
    let stripped = host_url
        .strip_prefix("btps://")
        .or_else(|| host_url.strip_prefix("btps+tls://"))
        .unwrap_or(host_url);
    match stripped.split_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| TransportError::Io(format!("invalid port in host url: {host_url}")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((stripped.to_string(), default_port)),
    }
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host_url: &str) -> Result<BoxedStream, TransportError>;
}

/// Plain TCP, no TLS — used by `test-assets`' mock peer.
pub struct PlainTcpConnector {
    pub default_port: u16,
}

#[async_trait]
impl Connector for PlainTcpConnector {
    async fn connect(&self, host_url: &str) -> Result<BoxedStream, TransportError> {
        let (host, port) = parse_host_url(host_url, self.default_port)?;
        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Box::pin(stream))
    }
}

/// Mutual-TLS connector used in production.
pub struct TlsConnector {
    pub default_port: u16,
    pub client_config: Arc<ClientConfig>,
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self, host_url: &str) -> Result<BoxedStream, TransportError> {
        let (host, port) = parse_host_url(host_url, self.default_port)?;
        let tcp = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let server_name = ServerName::try_from(host.clone())
            .map_err(|_| TransportError::Tls(format!("invalid server name: {host}")))?;
        let connector = RustlsConnector::from(self.client_config.clone());
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        Ok(Box::pin(tls))
    }
}
