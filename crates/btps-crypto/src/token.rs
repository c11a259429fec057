// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Auth token generation: a short, URL-safe, human-typable
//! identifier derived from an identity, the current time, and a handful
//! of random bytes, projected into Crockford base-32.

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

const CROCKFORD_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const MIN_LEN: usize = 8;
const MAX_LEN: usize = 24;
const DEFAULT_LEN: usize = 12;

/// Generates a token for `identity`, hashing it together with a
/// high-resolution timestamp and fresh random bytes so that two tokens
/// for the same identity never collide. `len` is clamped to `[8, 24]`.
pub fn generate(identity: &str, len: usize) -> String {
    let len = len.clamp(MIN_LEN, MAX_LEN);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let mut random = [0u8; 4];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut random);

    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(now.as_nanos().to_be_bytes());
    hasher.update(random);
    let digest = hasher.finalize();

    crockford_base32(&digest, len)
}

/// Generates a token at the default length of 12 characters.
pub fn generate_default(identity: &str) -> String {
    generate(identity, DEFAULT_LEN)
}

fn crockford_base32(bytes: &[u8], len: usize) -> String {
    let mut bits: u64 = 0;
    let mut bit_count: u32 = 0;
    let mut out = String::with_capacity(len);

    for &byte in bytes {
        bits = (bits << 8) | byte as u64;
        bit_count += 8;

        while bit_count >= 5 {
            bit_count -= 5;
            let index = ((bits >> bit_count) & 0x1F) as usize;
            out.push(CROCKFORD_ALPHABET[index] as char);
            if out.len() == len {
                return out;
            }
        }
    }

    if bit_count > 0 {
        let index = ((bits << (5 - bit_count)) & 0x1F) as usize;
        out.push(CROCKFORD_ALPHABET[index] as char);
    }

    // Digest ran out of bits before reaching `len` characters (only
    // possible for `len` well past a SHA-256 digest's 51-character
    // capacity); pad deterministically rather than panic.
    while out.len() < len {
        out.push(CROCKFORD_ALPHABET[0] as char);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_requested_length() {
        let token = generate("alice$example.com", 16);
        assert_eq!(token.len(), 16);
    }

    #[test]
    fn token_length_is_clamped() {
        assert_eq!(generate("alice$example.com", 1).len(), MIN_LEN);
        assert_eq!(generate("alice$example.com", 999).len(), MAX_LEN);
    }

    #[test]
    fn token_uses_only_crockford_alphabet() {
        let token = generate_default("alice$example.com");
        for ch in token.chars() {
            assert!(CROCKFORD_ALPHABET.contains(&(ch as u8)));
        }
    }

    #[test]
    fn tokens_for_same_identity_do_not_collide() {
        let a = generate_default("alice$example.com");
        let b = generate_default("alice$example.com");
        assert_ne!(a, b);
    }
}
