// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_crypto::CryptoError;
use btps_delegation::DelegationError;
use btps_resolver::ResolveError;
use btps_types::{BtpsError, BtpsErrorKind};
use thiserror::Error;

/// Errors raised while building an outbound command or processing an
/// inbound response.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Delegation(#[from] DelegationError),
    #[error("{0} is required for this action")]
    MissingDocument(&'static str),
    #[error("a response claiming a signature must carry signed_by and selector")]
    MissingSignerContext,
    #[error("the connection ended before this command received a response")]
    Unresolved(BtpsError),
}

impl From<AgentError> for BtpsError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Resolve(e) => e.into(),
            AgentError::Crypto(e) => e.into(),
            AgentError::Delegation(e) => e.into(),
            AgentError::MissingDocument(_) => {
                BtpsError::new(BtpsErrorKind::Validation).with_cause(err.to_string())
            }
            AgentError::MissingSignerContext => {
                BtpsError::new(BtpsErrorKind::Validation).with_cause(err.to_string())
            }
            AgentError::Unresolved(inner) => inner,
        }
    }
}
