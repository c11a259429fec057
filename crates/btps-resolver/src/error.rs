// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("dns lookup failed: {0}")]
    Dns(String),
    /// A selector's key record is missing or malformed — specifically the
    /// `resolve_identity_key()` case, distinct from [`Self::HostNotFound`].
    #[error("identity record not found or malformed: {0}")]
    NotFound(String),
    /// An identity's `_btps.host.<domain>` record is missing or malformed —
    /// the `resolve_host()` case. Kept separate from [`Self::NotFound`] so
    /// the two map onto distinct [`BtpsErrorKind`] variants: a caller
    /// can't reach a selector to resolve a key at until the host record
    /// itself resolves.
    #[error("host record not found or malformed: {0}")]
    HostNotFound(String),
}

impl From<ResolveError> for BtpsError {
    fn from(err: ResolveError) -> Self {
        let kind = match &err {
            ResolveError::InvalidIdentity(_) => BtpsErrorKind::InvalidIdentity,
            ResolveError::Dns(_) => BtpsErrorKind::ResolveDns,
            ResolveError::HostNotFound(_) => BtpsErrorKind::ResolveDns,
            ResolveError::NotFound(_) => BtpsErrorKind::ResolvePubkey,
        };
        BtpsError::new(kind).with_cause(err.to_string())
    }
}
