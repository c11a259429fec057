// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Signing and verification: RSA PKCS#1 v1.5 over SHA-256 of
//! an artifact's canonical bytes.

use rsa::pkcs1v15::{Signature as Pkcs1v15Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use btps_types::artifact::Signable;
use btps_types::constants::SIGNATURE_HASH_ALGORITHM;
use btps_types::Signature;

use crate::error::CryptoError;
use crate::keys;

/// Signs any [`Signable`] value, producing a detached signature whose
/// fingerprint is derived from `public`.
pub fn sign<T: Signable>(value: &T, private: &RsaPrivateKey, public: &RsaPublicKey) -> Result<Signature, CryptoError> {
    sign_bytes(&value.canonical_bytes(), private, public)
}

/// Signs an arbitrary byte string — the primitive composite-signing flows
/// (delegation, attestation) build on, since their signing input is a
/// hand-assembled JSON object rather than a single [`Signable`] artifact.
pub fn sign_bytes(bytes: &[u8], private: &RsaPrivateKey, public: &RsaPublicKey) -> Result<Signature, CryptoError> {
    let signing_key = SigningKey::<Sha256>::new(private.clone());
    let mut rng = rand::thread_rng();
    let signature = signing_key.sign_with_rng(&mut rng, bytes);
    let fingerprint = keys::fingerprint(public)?;
    Ok(Signature {
        algorithm_hash: SIGNATURE_HASH_ALGORITHM.to_string(),
        value: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, signature.to_bytes()),
        fingerprint,
    })
}

/// Verifies a [`Signable`] value against a detached signature and the
/// claimed sender's public key. Checks the fingerprint law before ever
/// touching the RSA signature: a fingerprint mismatch
/// is reported as its own, distinct error kind.
pub fn verify<T: Signable>(
    value: &T,
    signature: &Signature,
    sender_public: &RsaPublicKey,
) -> Result<(), CryptoError> {
    verify_bytes(&value.canonical_bytes(), signature, sender_public)
}

pub fn verify_bytes(
    bytes: &[u8],
    signature: &Signature,
    sender_public: &RsaPublicKey,
) -> Result<(), CryptoError> {
    let expected_fingerprint = keys::fingerprint(sender_public)?;
    if expected_fingerprint != signature.fingerprint {
        return Err(CryptoError::FingerprintMismatch {
            expected: expected_fingerprint,
            actual: signature.fingerprint.clone(),
        });
    }

    let raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &signature.value)
        .map_err(|e| CryptoError::MalformedKey(e.to_string()))?;
    let parsed = Pkcs1v15Signature::try_from(raw.as_slice())
        .map_err(|_| CryptoError::VerificationFailed)?;

    let verifying_key = VerifyingKey::<Sha256>::new(sender_public.clone());
    verifying_key
        .verify(bytes, &parsed)
        .map_err(|_| CryptoError::VerificationFailed)
}
