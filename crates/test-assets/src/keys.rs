// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! RSA keypair generation shared across crate test suites, replacing the
//! `test_keypair()` helper duplicated in `btps-agent`/`btps-delegation`
//! tests.

use rsa::{RsaPrivateKey, RsaPublicKey};

/// A fresh 2048-bit RSA keypair. Deliberately not cached: each call spends
/// real CPU time, but test suites that need distinct keys for distinct
/// identities (the common case) would otherwise have to route around a
/// shared instance.
pub fn generate_keypair() -> (RsaPrivateKey, RsaPublicKey) {
    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).expect("2048-bit RSA key generation");
    let public = RsaPublicKey::from(&private);
    (private, public)
}
