// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use clap::Parser;
use rsa::RsaPublicKey;

use btps_client::{BtpsClient, BtpsClientConfig};
use btps_crypto::keys::private_key_from_pem;
use btps_resolver::{DnsLookup, HickoryDnsLookup};
use btps_transport::{Connector, EngineConfig, PlainTcpConnector, TlsConnector};
use btps_types::constants::DEFAULT_PORT;

mod cli;
mod config;

use cli::{Cli, Command};
use config::FileConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let mut cli = Cli::parse();
    if let Some(path) = cli.config.clone() {
        FileConfig::load(&path).await?.apply_defaults(&mut cli);
    }

    let identity_str = cli.identity.ok_or_else(|| anyhow::anyhow!("--identity is required (or set BTPS_IDENTITY / config identity:)"))?;
    let identity = identity_str.parse().map_err(|e: btps_types::BtpsError| anyhow::anyhow!(e.to_string()))?;
    let private_key_path = cli.private_key.ok_or_else(|| anyhow::anyhow!("--private-key is required (or set BTPS_PRIVATE_KEY / config private-key:)"))?;
    let pem = tokio::fs::read_to_string(&private_key_path).await?;
    let private_key = private_key_from_pem(&pem)?;
    let public_key = RsaPublicKey::from(&private_key);

    let dns: Arc<dyn DnsLookup> = Arc::new(HickoryDnsLookup::new()?);
    let connector: Arc<dyn Connector> = if cli.insecure {
        Arc::new(PlainTcpConnector { default_port: DEFAULT_PORT })
    } else {
        let cert = tokio::fs::read(cli.cert.as_ref().ok_or_else(|| anyhow::anyhow!("--cert is required unless --insecure"))?).await?;
        let tls_key = tokio::fs::read(cli.tls_key.as_ref().ok_or_else(|| anyhow::anyhow!("--tls-key is required unless --insecure"))?).await?;
        let ca = tokio::fs::read(cli.ca.as_ref().ok_or_else(|| anyhow::anyhow!("--ca is required unless --insecure"))?).await?;
        let client_config = btps_transport::tls::build_client_config(&cert, &tls_key, &ca)?;
        Arc::new(TlsConnector { default_port: DEFAULT_PORT, client_config })
    };

    let selector = cli.selector.unwrap_or_else(|| "btps1".to_string());
    let config = BtpsClientConfig {
        agent_id: format!("{}-cli", identity_str),
        principal: identity,
        selector,
        private_key,
        public_key,
        dns,
        connector,
        engine_config: EngineConfig::default(),
        delegator: None,
        delegation_principal: None,
    };
    let client = BtpsClient::connect(config).await?;

    match cli.command {
        Command::Ping => {
            let response = client.system_ping().await?;
            println!("{}", serde_json::to_string_pretty(response.response())?);
        }
        Command::TrustRequest { to, name, email, reason, phone } => {
            let to = to.parse().map_err(|e: btps_types::BtpsError| anyhow::anyhow!(e.to_string()))?;
            let document = serde_json::json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "name": name,
                "email": email,
                "reason": reason,
                "phone": phone,
            });
            let response = client.trust_request(to, document).await?;
            println!("{}", serde_json::to_string_pretty(response.response())?);
        }
    }

    Ok(())
}
