// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use btps_types::artifact::ServerResponse;
use btps_types::{BtpsError, Identity};

/// Pool-level events, each forwarded from a member engine and stamped
/// with the entry's identity. `Evicted` is this
/// implementation's ninth event: it fires on TTL expiry, immediately
/// before the `Destroyed` that `deregister_connection` always emits, so
/// listeners can distinguish an idle timeout from an explicit teardown.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    Created { to: Identity },
    Connected { to: Identity },
    Message { to: Identity, response: ServerResponse },
    Error { to: Identity, error: BtpsError, will_retry: bool, retries_left: u32, attempt: u32 },
    End { to: Identity, will_retry: bool, retries_left: u32, attempt: u32 },
    Close { to: Identity },
    Updated { to: Identity },
    Evicted { to: Identity },
    Destroyed { to: Identity },
}

impl PoolEvent {
    pub fn to(&self) -> &Identity {
        match self {
            PoolEvent::Created { to }
            | PoolEvent::Connected { to }
            | PoolEvent::Message { to, .. }
            | PoolEvent::Error { to, .. }
            | PoolEvent::End { to, .. }
            | PoolEvent::Close { to }
            | PoolEvent::Updated { to }
            | PoolEvent::Evicted { to }
            | PoolEvent::Destroyed { to } => to,
        }
    }
}
