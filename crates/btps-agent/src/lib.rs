// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Agent Framing: outbound command construction, a serial
//! per-connection command queue, and inbound response verification.

pub mod command;
pub mod error;
pub mod process;
pub mod queue;

pub use command::{AgentFramer, CryptoOpts};
pub use error::AgentError;
pub use process::ProcessedMessage;
pub use queue::CommandQueue;
