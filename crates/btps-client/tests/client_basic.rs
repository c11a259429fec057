// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use btps_client::{BtpsClient, BtpsClientConfig};
use btps_resolver::DnsLookup;
use btps_transport::{Connector, EngineConfig, PlainTcpConnector};
use test_assets::{dns::InMemoryDns, generate_keypair, peer};

#[tokio::test]
async fn system_ping_round_trips_through_a_live_connection() {
    let (listener, addr) = peer::bind_loopback().await;
    peer::spawn_echo_responder(listener);

    let (private_key, public_key) = generate_keypair();
    let identity = "alice$example.com";

    let dns = Arc::new(InMemoryDns::new());
    dns.insert_host(identity, addr, "btps1");
    dns.insert_key(identity, "btps1", &public_key);
    let dns: Arc<dyn DnsLookup> = dns;

    let connector: Arc<dyn Connector> = Arc::new(PlainTcpConnector { default_port: addr.port() });

    let config = BtpsClientConfig {
        agent_id: "agent-1".to_string(),
        principal: identity.parse().unwrap(),
        selector: "btps1".to_string(),
        private_key,
        public_key,
        dns,
        connector,
        engine_config: EngineConfig::default(),
        delegator: None,
        delegation_principal: None,
    };

    let client = BtpsClient::connect(config).await.unwrap();
    let response = tokio::time::timeout(std::time::Duration::from_secs(2), client.system_ping())
        .await
        .expect("ping did not time out")
        .expect("ping succeeded");
    assert!(response.response().status.ok);
}

/// The command queue ends (not destroys) its engine once a command's
/// response drains the queue, so a second command on the same client must
/// redial rather than hang forever waiting on an engine that can never
/// connect again.
#[tokio::test]
async fn a_second_command_on_the_same_client_does_not_hang() {
    let (listener, addr) = peer::bind_loopback().await;
    peer::spawn_echo_responder_multi(listener);

    let (private_key, public_key) = generate_keypair();
    let identity = "alice$example.com";

    let dns = Arc::new(InMemoryDns::new());
    dns.insert_host(identity, addr, "btps1");
    dns.insert_key(identity, "btps1", &public_key);
    let dns: Arc<dyn DnsLookup> = dns;

    let connector: Arc<dyn Connector> = Arc::new(PlainTcpConnector { default_port: addr.port() });

    let config = BtpsClientConfig {
        agent_id: "agent-1".to_string(),
        principal: identity.parse().unwrap(),
        selector: "btps1".to_string(),
        private_key,
        public_key,
        dns,
        connector,
        engine_config: EngineConfig::default(),
        delegator: None,
        delegation_principal: None,
    };

    let client = BtpsClient::connect(config).await.unwrap();

    for _ in 0..2 {
        let response = tokio::time::timeout(std::time::Duration::from_secs(2), client.system_ping())
            .await
            .expect("ping did not time out")
            .expect("ping succeeded");
        assert!(response.response().status.ok);
    }
}
