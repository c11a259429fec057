// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Mutual-TLS client configuration: client certificate plus
//! CA roots, built once and reused across connections.

use std::io::BufReader;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::error::TransportError;

/// Builds a `rustls::ClientConfig` presenting `cert_pem`/`key_pem` as the
/// client certificate and trusting `ca_pem` for server verification.
pub fn build_client_config(
    cert_pem: &[u8],
    key_pem: &[u8],
    ca_pem: &[u8],
) -> Result<Arc<ClientConfig>, TransportError> {
    let mut root_store = RootCertStore::empty();
    let mut ca_reader = BufReader::new(ca_pem);
    for cert in rustls_pemfile::certs(&mut ca_reader) {
        let cert = cert.map_err(|e| TransportError::Tls(e.to_string()))?;
        root_store
            .add(cert)
            .map_err(|e| TransportError::Tls(e.to_string()))?;
    }

    let mut cert_reader = BufReader::new(cert_pem);
    let cert_chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(e.to_string()))?;

    let mut key_reader = BufReader::new(key_pem);
    let private_key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| TransportError::Tls(e.to_string()))?
        .ok_or_else(|| TransportError::Tls("no private key found in PEM".into()))?;

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_client_auth_cert(cert_chain, private_key)
        .map_err(|e| TransportError::Tls(e.to_string()))?;

    Ok(Arc::new(config))
}
