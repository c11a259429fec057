// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_crypto::CryptoError;
use btps_resolver::ResolveError;
use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("could not resolve the delegator's own published key: {0}")]
    Resolve(#[from] ResolveError),
    #[error("crypto operation failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("delegator's private key does not match its own published key")]
    SelfVerificationFailed,
}

impl From<DelegationError> for BtpsError {
    fn from(err: DelegationError) -> Self {
        let kind = match &err {
            DelegationError::Resolve(_) => BtpsErrorKind::ResolvePubkey,
            DelegationError::Crypto(_) => BtpsErrorKind::SignatureVerificationFailed,
            DelegationError::SelfVerificationFailed => BtpsErrorKind::SignatureVerificationFailed,
        };
        BtpsError::new(kind).with_cause(err.to_string())
    }
}
