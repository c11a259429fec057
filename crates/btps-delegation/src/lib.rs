// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Delegation and attestation signing.

pub mod delegator;
pub mod error;

pub use delegator::{Delegator, Principal};
pub use error::DelegationError;
