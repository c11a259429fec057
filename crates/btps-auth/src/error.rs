// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_crypto::CryptoError;
use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("no refresh token found for agent {0}")]
    RefreshTokenNotFound(String),
    #[error("refresh token for agent {0} has expired")]
    RefreshTokenExpired(String),
    #[error("refresh token for agent {0} does not match the stored value")]
    RefreshTokenMismatch(String),
    #[error("store operation failed: {0}")]
    Store(String),
}

impl From<AuthError> for BtpsError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(e) => e.into(),
            AuthError::Store(reason) => BtpsError::new(BtpsErrorKind::Unknown).with_cause(reason),
            other => BtpsError::new(BtpsErrorKind::AuthenticationInvalid).with_cause(other.to_string()),
        }
    }
}
