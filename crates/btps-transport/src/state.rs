// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The Connection Engine's state machine.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Resolving,
    Connecting,
    Connected,
    Draining,
    Retrying,
    Ended,
    Failed,
    Destroyed,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Ended | EngineState::Failed | EngineState::Destroyed)
    }
}
