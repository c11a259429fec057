// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! DNS TXT-based identity resolution.

pub mod dns;
pub mod error;
mod resolver;
mod txt;

pub use dns::{DnsLookup, HickoryDnsLookup};
pub use error::ResolveError;
pub use resolver::{HostRecord, KeyRecord, Resolver};
