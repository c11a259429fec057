// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! An in-memory `DnsLookup`, generalizing the `InMemoryDns`/`StaticDns`
//! test doubles duplicated across `btps-resolver`, `btps-delegation`,
//! `btps-transport`, `btps-agent`, and `btps-pool`'s own test files.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rsa::RsaPublicKey;

use btps_crypto::keys::public_key_to_base64_spki;
use btps_resolver::{DnsLookup, ResolveError};

pub struct InMemoryDns {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryDns {
    pub fn new() -> Self {
        Self { records: Mutex::new(HashMap::new()) }
    }

    pub fn with_records(records: &[(&str, &str)]) -> Self {
        let dns = Self::new();
        for (owner, txt) in records {
            dns.insert(owner, txt);
        }
        dns
    }

    pub fn insert(&self, owner: &str, txt: &str) {
        self.records.lock().unwrap().insert(owner.to_string(), txt.to_string());
    }

    /// Registers the host TXT record a [`btps_resolver::Resolver`] reads
    /// to find where `account$domain` listens.
    pub fn insert_host(&self, account_domain: &str, addr: std::net::SocketAddr, selector: &str) {
        let (_, domain) = account_domain.split_once('$').expect("account$domain");
        self.insert(
            &format!("_btps.host.{domain}"),
            &format!("v=1.0.0; u=btps://{}:{}; s={selector}", addr.ip(), addr.port()),
        );
    }

    /// Registers the per-selector public key TXT record a
    /// [`btps_resolver::Resolver`] reads to verify `account$domain`'s
    /// signatures.
    pub fn insert_key(&self, account_domain: &str, selector: &str, public: &RsaPublicKey) {
        let spki = public_key_to_base64_spki(public).expect("a valid RSA public key");
        let (account, domain) = account_domain.split_once('$').expect("account$domain");
        self.insert(&format!("{selector}._btps.host.{account}.{domain}"), &format!("k=rsa; v=1.0.0; p={spki}"));
    }
}

impl Default for InMemoryDns {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsLookup for InMemoryDns {
    async fn lookup_txt(&self, owner: &str) -> Result<String, ResolveError> {
        self.records
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(owner.to_string()))
    }
}
