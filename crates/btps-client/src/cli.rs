// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface for manual smoke testing against a BTPS peer.
//! Grounded on a `clap::Parser`-derived `Cli` struct
//! (`crates/service/src/service.rs`'s `Cli::parse()` composition root).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "btps", about = "BTPS protocol engine command-line client")]
pub struct Cli {
    /// YAML config file to read defaults from; CLI flags and env vars
    /// override whatever it sets.
    #[arg(long, env = "BTPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// This client's own identity, `account$domain`.
    #[arg(long, env = "BTPS_IDENTITY")]
    pub identity: Option<String>,

    /// DNS selector this identity publishes keys under.
    #[arg(long, env = "BTPS_SELECTOR")]
    pub selector: Option<String>,

    /// PKCS#8 PEM file holding this identity's RSA private key.
    #[arg(long, env = "BTPS_PRIVATE_KEY")]
    pub private_key: Option<PathBuf>,

    /// Skip TLS and dial plaintext TCP — local/loopback testing only.
    #[arg(long, env = "BTPS_INSECURE")]
    pub insecure: bool,

    /// Client certificate PEM (required unless --insecure).
    #[arg(long, env = "BTPS_CERT")]
    pub cert: Option<PathBuf>,

    /// Client private key PEM for the TLS handshake (required unless
    /// --insecure; may differ from --private-key, which signs artifacts).
    #[arg(long, env = "BTPS_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// CA bundle PEM trusted for server certificate verification
    /// (required unless --insecure).
    #[arg(long, env = "BTPS_CA")]
    pub ca: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send `system.ping` to the principal's own server.
    Ping,
    /// Send `trust.request` to a peer identity.
    TrustRequest {
        /// The identity to request trust from.
        to: String,
        /// Freeform contact details as a JSON object.
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        phone: String,
    },
}
