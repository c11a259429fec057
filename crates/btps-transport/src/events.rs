// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::artifact::ServerResponse;
use btps_types::BtpsError;

/// Delivered in order to a single listener set per `connect()` call
///.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Connected,
    Message(ServerResponse),
    Error {
        error: BtpsError,
        will_retry: bool,
        retries_left: u32,
        attempt: u32,
    },
    End {
        will_retry: bool,
        retries_left: u32,
        attempt: u32,
    },
}
