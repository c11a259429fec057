// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Connection Transporter pool: bounds and reuses Connection
//! Engines keyed by destination identity.

pub mod error;
pub mod events;
pub mod metrics;
pub mod pool;

pub use error::PoolError;
pub use events::PoolEvent;
pub use pool::{ConnectionPool, PoolOptions};
