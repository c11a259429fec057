// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Pool-wide gauges: `{total_connections, active_connections}`.

use lazy_static::lazy_static;
use prometheus::{register_int_gauge, IntGauge};

lazy_static! {
    pub static ref TOTAL_CONNECTIONS: IntGauge = register_int_gauge!(
        "btps_pool_total_connections",
        "Number of connection transporter pool entries currently registered"
    )
    .unwrap();
    pub static ref ACTIVE_CONNECTIONS: IntGauge = register_int_gauge!(
        "btps_pool_active_connections",
        "Number of connection transporter pool entries whose engine is currently connected"
    )
    .unwrap();
}
