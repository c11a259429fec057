// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Protocol-wide default timeouts, TTLs, and limits.

use std::time::Duration;

pub const PROTOCOL_VERSION: &str = "1.0.0";
pub const DEFAULT_SELECTOR: &str = "btps1";
pub const DEFAULT_PORT: u16 = 3443;

pub const DEFAULT_MAX_CONNECTIONS: usize = 50;
pub const DEFAULT_CONNECTION_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

pub const AUTH_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Algorithm tag for the digest underlying a [`crate::Signature`].
pub const SIGNATURE_HASH_ALGORITHM: &str = "sha256";
