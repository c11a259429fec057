// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Identity Resolver: turns a BTPS identity into a transport
//! target and into the signing key published for a given selector.

use std::sync::Arc;

use btps_crypto::keys::pem_from_base64_spki;
use btps_types::Identity;

use crate::dns::DnsLookup;
use crate::error::ResolveError;
use crate::txt::parse_kv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub version: String,
    pub host_url: String,
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub key_type: String,
    pub version: String,
    pub pem: String,
}

pub struct Resolver {
    dns: Arc<dyn DnsLookup>,
}

impl Resolver {
    pub fn new(dns: Arc<dyn DnsLookup>) -> Self {
        Self { dns }
    }

    fn host_owner(domain: &str) -> String {
        format!("_btps.host.{domain}")
    }

    fn key_owner(selector: &str, account: &str, domain: &str) -> String {
        format!("{selector}._btps.host.{account}.{domain}")
    }

    /// Resolves the transport target for `identity`. The returned
    /// selector is only meaningful for *outbound* discovery — callers
    /// verifying an inbound artifact must resolve by the selector
    /// declared on that artifact instead, to honor key rotation, never
    /// by calling this again.
    pub async fn resolve_host(&self, identity: &Identity) -> Result<HostRecord, ResolveError> {
        let owner = Self::host_owner(&identity.domain);
        let txt = self
            .dns
            .lookup_txt(&owner)
            .await
            .map_err(|e| Self::as_host_not_found(e, &owner))?;
        let fields = parse_kv(&txt);

        let version = fields
            .get("v")
            .ok_or_else(|| ResolveError::HostNotFound(format!("{owner} missing 'v'")))?
            .clone();
        let host_url = fields
            .get("u")
            .ok_or_else(|| ResolveError::HostNotFound(format!("{owner} missing 'u'")))?
            .clone();
        let selector = fields
            .get("s")
            .ok_or_else(|| ResolveError::HostNotFound(format!("{owner} missing 's'")))?
            .clone();

        Ok(HostRecord {
            version,
            host_url,
            selector,
        })
    }

    /// The [`DnsLookup`] trait reports an absent TXT record as
    /// [`ResolveError::NotFound`] regardless of which owner was queried;
    /// a caller resolving the host record recasts that into
    /// [`ResolveError::HostNotFound`] so it maps to a distinct
    /// [`btps_types::BtpsErrorKind`] than a missing key at a selector.
    fn as_host_not_found(err: ResolveError, owner: &str) -> ResolveError {
        match err {
            ResolveError::NotFound(_) => ResolveError::HostNotFound(owner.to_string()),
            other => other,
        }
    }

    /// Resolves the published signing key for `identity` at the given
    /// `selector`. The selector pins exactly which key rotation epoch is
    /// being referenced; it is never inferred from `resolve_host`.
    pub async fn resolve_identity_key(
        &self,
        identity: &Identity,
        selector: &str,
    ) -> Result<KeyRecord, ResolveError> {
        let owner = Self::key_owner(selector, &identity.account, &identity.domain);
        let txt = self.dns.lookup_txt(&owner).await?;
        let fields = parse_kv(&txt);

        let key_type = fields
            .get("k")
            .ok_or_else(|| ResolveError::NotFound(format!("{owner} missing 'k'")))?
            .clone();
        let version = fields
            .get("v")
            .ok_or_else(|| ResolveError::NotFound(format!("{owner} missing 'v'")))?
            .clone();
        let spki_b64 = fields
            .get("p")
            .ok_or_else(|| ResolveError::NotFound(format!("{owner} missing 'p'")))?;

        Ok(KeyRecord {
            key_type,
            version,
            pem: pem_from_base64_spki(spki_b64),
        })
    }

    /// Convenience wrapper returning just the PEM.
    pub async fn resolve_public_key(
        &self,
        identity: &Identity,
        selector: &str,
    ) -> Result<String, ResolveError> {
        Ok(self.resolve_identity_key(identity, selector).await?.pem)
    }
}
