// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed PEM key: {0}")]
    MalformedKey(String),
    #[error("signature fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("unsupported or failed encryption: {0}")]
    UnsupportedEncrypt(String),
    #[error("decryption failed for an unintended recipient")]
    DecryptionUnintended,
    #[error("encryption block is malformed: {0}")]
    MalformedEncryption(String),
}

impl From<CryptoError> for BtpsError {
    fn from(err: CryptoError) -> Self {
        let kind = match &err {
            CryptoError::MalformedKey(_) => BtpsErrorKind::ResolvePubkey,
            CryptoError::FingerprintMismatch { .. } => BtpsErrorKind::SignatureFingerprintMismatch,
            CryptoError::VerificationFailed => BtpsErrorKind::SignatureVerificationFailed,
            CryptoError::UnsupportedEncrypt(_) | CryptoError::MalformedEncryption(_) => {
                BtpsErrorKind::UnsupportedEncrypt
            }
            CryptoError::DecryptionUnintended => BtpsErrorKind::DecryptionUnintended,
        };
        BtpsError::new(kind).with_cause(err.to_string())
    }
}
