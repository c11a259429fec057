// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The `BtpsClient` facade: resolver, crypto envelope,
//! delegation, transport, and the agent command queue wired together
//! behind a handful of high-level operations.

pub mod client;
pub mod error;

pub use client::{BtpsClient, BtpsClientConfig};
pub use error::ClientError;
