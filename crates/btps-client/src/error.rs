// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use btps_agent::AgentError;
use btps_types::BtpsError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Transport(#[from] BtpsError),
}
