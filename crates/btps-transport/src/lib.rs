// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Connection Engine: a single TLS stream's lifecycle with one peer
//!.

pub mod config;
pub mod connector;
pub mod engine;
pub mod error;
pub mod events;
pub mod retry;
pub mod state;
pub mod stream;
pub mod tls;

pub use config::EngineConfig;
pub use connector::{Connector, PlainTcpConnector, TlsConnector};
pub use engine::ConnectionEngine;
pub use error::TransportError;
pub use events::EngineEvent;
pub use state::EngineState;
pub use stream::{BoxedStream, BtpsStream};
