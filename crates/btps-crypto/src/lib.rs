// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Cryptographic primitives for BTPS: key handling, signing/verification,
//! hybrid encryption, and the auth token generator.

pub mod encrypt;
pub mod error;
pub mod keys;
pub mod sign;
pub mod token;

pub use error::CryptoError;
