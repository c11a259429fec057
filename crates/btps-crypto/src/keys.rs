// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! PEM/SPKI plumbing shared by signing, encryption, and the identity
//! resolver's base64-to-PEM key reconstruction.

use base64::Engine as _;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::CryptoError;

const PEM_LINE_WIDTH: usize = 64;

/// Reconstructs a standard `-----BEGIN PUBLIC KEY-----` PEM block from a
/// bare base64 SPKI DER string, wrapping at 64 columns the way its DNS
/// TXT record representation does.
pub fn pem_from_base64_spki(b64: &str) -> String {
    wrap_pem(b64, "PUBLIC KEY")
}

fn wrap_pem(b64: &str, label: &str) -> String {
    let mut body = String::new();
    for chunk in b64.as_bytes().chunks(PEM_LINE_WIDTH) {
        body.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        body.push('\n');
    }
    format!("-----BEGIN {label}-----\n{body}-----END {label}-----\n")
}

/// Parses an RSA public key from a PEM string (SPKI, `BEGIN PUBLIC KEY`).
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))
}

/// Parses an RSA private key from a PKCS#8 PEM string.
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem.trim())
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))
}

/// The bare base64 SPKI DER encoding of a public key, as published in a
/// DNS TXT record's `p=` field.
pub fn public_key_to_base64_spki(key: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(der.as_bytes()))
}

/// `base64(sha256(SPKI-DER(public_key)))` — the fingerprint that ties a
/// [`btps_types::Signature`] to the key that produced it.
pub fn fingerprint(key: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    Ok(btps_types::trust::base64_sha256(der.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 2048).unwrap()
    }

    #[test]
    fn pem_round_trips_through_base64() {
        let key = test_key();
        let pub_key = RsaPublicKey::from(&key);
        let b64 = public_key_to_base64_spki(&pub_key).unwrap();
        let reconstructed_pem = pem_from_base64_spki(&b64);
        let parsed = public_key_from_pem(&reconstructed_pem).unwrap();
        assert_eq!(parsed, pub_key);
    }

    #[test]
    fn fingerprint_is_stable_for_same_key() {
        let key = test_key();
        let pub_key = RsaPublicKey::from(&key);
        assert_eq!(fingerprint(&pub_key).unwrap(), fingerprint(&pub_key).unwrap());
    }

    #[test]
    fn fingerprint_differs_for_different_keys() {
        let a = RsaPublicKey::from(&test_key());
        let b = RsaPublicKey::from(&test_key());
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn pem_wraps_at_64_columns() {
        let key = test_key();
        let pub_key = RsaPublicKey::from(&key);
        let pem_text = pub_key.to_public_key_pem(Default::default()).unwrap();
        let b64: String = pem_text
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        let reconstructed = pem_from_base64_spki(&b64);
        for line in reconstructed.lines().filter(|l| !l.starts_with("-----")) {
            assert!(line.len() <= PEM_LINE_WIDTH);
        }
    }
}
