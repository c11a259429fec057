// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The flat wire-level error taxonomy shared across the protocol,
//! realized as a `thiserror` enum. Every crate-specific error type in
//! this workspace ultimately converts into a [`BtpsError`] at its
//! public API boundary.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// One variant per wire-level error condition the protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BtpsErrorKind {
    #[error("invalid identity")]
    InvalidIdentity,
    #[error("dns resolution failed")]
    ResolveDns,
    #[error("invalid hostname")]
    InvalidHostname,
    #[error("unsupported protocol")]
    UnsupportedProtocol,
    #[error("no public key at selector")]
    ResolvePubkey,
    #[error("schema validation failed")]
    Validation,
    #[error("signature fingerprint mismatch")]
    SignatureFingerprintMismatch,
    #[error("signature verification failed")]
    SignatureVerificationFailed,
    #[error("unsupported or failed encryption")]
    UnsupportedEncrypt,
    #[error("decryption unintended recipient")]
    DecryptionUnintended,
    #[error("unknown error")]
    Unknown,
    #[error("trust already active")]
    TrustAlreadyActive,
    #[error("trust blocked")]
    TrustBlocked,
    #[error("trust not allowed")]
    TrustNotAllowed,
    #[error("connection timeout")]
    ConnectionTimeout,
    #[error("connection ended before any message")]
    ConnectionEndedEarly,
    #[error("malformed json frame")]
    SyntaxError,
    #[error("engine was destroyed")]
    Destroyed,
    #[error("auth token invalid")]
    AuthenticationInvalid,
    #[error("connection pool is full")]
    MaxConnectionsReached,
    #[error("connection already exists")]
    ConnectionAlreadyExists,
    #[error("connect() called while already connecting")]
    AlreadyConnecting,
}

impl BtpsErrorKind {
    /// Classifies whether each error kind is worth retrying, as a total
    /// function. This is the single source of truth for retry eligibility
    /// of errors that already arrived as a typed [`BtpsErrorKind`]; opaque
    /// errors from the socket/TLS layer are classified separately by the
    /// transport's `is_non_retryable` string matcher.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            BtpsErrorKind::ConnectionTimeout | BtpsErrorKind::ConnectionEndedEarly
        )
    }
}

/// Structured context carried alongside an error, e.g. the offending
/// identity or selector.
pub type ErrorMeta = BTreeMap<String, String>;

/// The error value delivered as engine events and as failed results from
/// higher-level `command`/`transport` calls. The engine itself never
/// panics or throws across an `await` point; this is always the value
/// handed back instead.
#[derive(Debug, Clone)]
pub struct BtpsError {
    pub kind: BtpsErrorKind,
    pub message: String,
    pub cause: Option<String>,
    pub meta: ErrorMeta,
}

impl BtpsError {
    pub fn new(kind: BtpsErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            cause: None,
            meta: ErrorMeta::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for BtpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BtpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<BtpsErrorKind> for BtpsError {
    fn from(kind: BtpsErrorKind) -> Self {
        BtpsError::new(kind)
    }
}
