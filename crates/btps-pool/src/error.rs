// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("a connection to {0} already exists")]
    AlreadyExists(String),
    #[error("pool is full ({0} connections)")]
    MaxConnectionsReached(usize),
    #[error("artifact failed schema validation: {0}")]
    InvalidArtifact(String),
    #[error(transparent)]
    Transport(#[from] BtpsError),
    #[error("no response arrived for request {0} before the connection ended")]
    Unresolved(String),
}

impl From<PoolError> for BtpsError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::AlreadyExists(to) => {
                BtpsError::new(BtpsErrorKind::ConnectionAlreadyExists).with_meta("to", to)
            }
            PoolError::MaxConnectionsReached(n) => {
                BtpsError::new(BtpsErrorKind::MaxConnectionsReached).with_meta("max_connections", n.to_string())
            }
            PoolError::InvalidArtifact(reason) => {
                BtpsError::new(BtpsErrorKind::Validation).with_cause(reason)
            }
            PoolError::Transport(e) => e,
            PoolError::Unresolved(id) => {
                BtpsError::new(BtpsErrorKind::ConnectionEndedEarly).with_meta("request_id", id)
            }
        }
    }
}
