// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_resolver::ResolveError;
use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not resolve destination: {0}")]
    Resolve(#[from] ResolveError),
    #[error("tls setup failed: {0}")]
    Tls(String),
    #[error("socket i/o error: {0}")]
    Io(String),
    #[error("malformed json frame: {0}")]
    Syntax(String),
    #[error("connection timed out")]
    Timeout,
    #[error("connect() called while already connecting")]
    AlreadyConnecting,
    #[error("engine was destroyed")]
    Destroyed,
}

impl From<TransportError> for BtpsError {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Resolve(_) => BtpsErrorKind::ResolveDns,
            TransportError::Tls(_) | TransportError::Io(_) => BtpsErrorKind::ConnectionEndedEarly,
            TransportError::Syntax(_) => BtpsErrorKind::SyntaxError,
            TransportError::Timeout => BtpsErrorKind::ConnectionTimeout,
            TransportError::AlreadyConnecting => BtpsErrorKind::AlreadyConnecting,
            TransportError::Destroyed => BtpsErrorKind::Destroyed,
        };
        BtpsError::new(kind).with_cause(err.to_string())
    }
}
