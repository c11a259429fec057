// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The `DnsLookup` seam: the resolver never talks to
//! `hickory-resolver` directly outside of [`HickoryDnsLookup`], so tests
//! can swap in an in-memory map.

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;

use crate::error::ResolveError;

/// Resolves the concatenated TXT record text for a DNS owner name. BTPS
/// TXT records are a single logical string; multi-segment TXT records are
/// concatenated in order, matching how resolvers commonly join character
/// strings within one RR.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_txt(&self, owner: &str) -> Result<String, ResolveError>;
}

pub struct HickoryDnsLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryDnsLookup {
    pub fn new() -> Result<Self, ResolveError> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self { resolver })
    }
}

impl Default for HickoryDnsLookup {
    fn default() -> Self {
        Self::new().expect("default resolver config is always valid")
    }
}

#[async_trait]
impl DnsLookup for HickoryDnsLookup {
    async fn lookup_txt(&self, owner: &str) -> Result<String, ResolveError> {
        let response = self
            .resolver
            .txt_lookup(owner)
            .await
            .map_err(|e| ResolveError::Dns(e.to_string()))?;

        let mut joined = String::new();
        for record in response.iter() {
            for chunk in record.txt_data() {
                joined.push_str(&String::from_utf8_lossy(chunk));
            }
        }
        if joined.is_empty() {
            return Err(ResolveError::NotFound(format!("no TXT data at {owner}")));
        }
        Ok(joined)
    }
}
