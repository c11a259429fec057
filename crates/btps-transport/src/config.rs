// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::constants::{DEFAULT_CONNECTION_TIMEOUT_MS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub connection_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}
