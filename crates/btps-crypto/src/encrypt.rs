// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Hybrid AES+RSA encryption and decryption. A fresh AES
//! content-encryption key is generated per call and wrapped for the
//! receiver with RSA-OAEP; the two AES modes (GCM, legacy CBC) are kept
//! as strictly separate code paths, never interpolated.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

use btps_types::artifact::{EncryptionAlgorithm, EncryptionBlock, EncryptionType};

use crate::error::CryptoError;

const AES_KEY_LEN: usize = 32;
const GCM_NONCE_LEN: usize = 12;
const CBC_IV_LEN: usize = 16;

/// SHA-1 is kept as the default OAEP digest for wire compatibility (spec
/// §4.2, §9's open question); SHA-256 is offered as an opt-in the two
/// sides must negotiate out-of-band (e.g. via the DNS `v` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OaepDigest {
    #[default]
    Sha1,
    Sha256,
}

#[derive(Debug, Clone, Copy)]
pub struct EncryptOptions {
    pub algorithm: EncryptionAlgorithm,
    pub kind: EncryptionType,
    pub oaep_digest: OaepDigest,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            algorithm: EncryptionAlgorithm::Aes256Gcm,
            kind: EncryptionType::StandardEncrypt,
            oaep_digest: OaepDigest::default(),
        }
    }
}

pub struct EncryptedPayload {
    pub data: String,
    pub encryption: EncryptionBlock,
}

fn wrap_key(key: &[u8], receiver_public: &RsaPublicKey, digest: OaepDigest) -> Result<Vec<u8>, CryptoError> {
    let mut rng = rand::thread_rng();
    match digest {
        OaepDigest::Sha1 => receiver_public
            .encrypt(&mut rng, Oaep::new::<Sha1>(), key)
            .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string())),
        OaepDigest::Sha256 => receiver_public
            .encrypt(&mut rng, Oaep::new::<Sha256>(), key)
            .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string())),
    }
}

fn unwrap_key(wrapped: &[u8], receiver_private: &RsaPrivateKey, digest: OaepDigest) -> Result<Vec<u8>, CryptoError> {
    let result = match digest {
        OaepDigest::Sha1 => receiver_private.decrypt(Oaep::new::<Sha1>(), wrapped),
        OaepDigest::Sha256 => receiver_private.decrypt(Oaep::new::<Sha256>(), wrapped),
    };
    // An OAEP unwrap failure means this key was not the intended
    // recipient of the content-encryption key — this is called out
    // as a distinct, non-retryable, user-visible condition rather than a
    // generic crypto failure.
    result.map_err(|_| CryptoError::DecryptionUnintended)
}

/// Encrypts `plaintext` for `receiver_public`, returning base64 ciphertext
/// plus the encryption block to attach to the artifact.
pub fn encrypt(
    plaintext: &str,
    receiver_public: &RsaPublicKey,
    options: EncryptOptions,
) -> Result<EncryptedPayload, CryptoError> {
    let mut rng = rand::thread_rng();
    let mut key = [0u8; AES_KEY_LEN];
    rng.fill_bytes(&mut key);

    match options.algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            let mut nonce_bytes = [0u8; GCM_NONCE_LEN];
            rng.fill_bytes(&mut nonce_bytes);
            let cipher = Aes256Gcm::new_from_slice(&key)
                .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))?;
            let nonce = Nonce::from_slice(&nonce_bytes);
            let mut sealed = cipher
                .encrypt(
                    nonce,
                    Payload {
                        msg: plaintext.as_bytes(),
                        aad: &[],
                    },
                )
                .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))?;
            // aes-gcm appends the 16-byte auth tag to the ciphertext; split
            // it back out so the wire format carries it as its own field.
            let tag = sealed.split_off(sealed.len() - 16);

            let encrypted_key = wrap_key(&key, receiver_public, options.oaep_digest)?;
            Ok(EncryptedPayload {
                data: b64(&sealed),
                encryption: EncryptionBlock {
                    algorithm: EncryptionAlgorithm::Aes256Gcm,
                    encrypted_key: b64(&encrypted_key),
                    iv: b64(&nonce_bytes),
                    auth_tag: Some(b64(&tag)),
                    kind: options.kind,
                },
            })
        }
        EncryptionAlgorithm::Aes256Cbc => {
            let mut iv = [0u8; CBC_IV_LEN];
            rng.fill_bytes(&mut iv);
            type Encryptor = cbc::Encryptor<aes::Aes256>;
            let ciphertext = Encryptor::new(key.as_slice().into(), iv.as_slice().into())
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

            let encrypted_key = wrap_key(&key, receiver_public, options.oaep_digest)?;
            Ok(EncryptedPayload {
                data: b64(&ciphertext),
                encryption: EncryptionBlock {
                    algorithm: EncryptionAlgorithm::Aes256Cbc,
                    encrypted_key: b64(&encrypted_key),
                    iv: b64(&iv),
                    auth_tag: None,
                    kind: options.kind,
                },
            })
        }
    }
}

/// Decrypts a ciphertext produced by [`encrypt`]. Rejects any block whose
/// algorithm/auth-tag combination is malformed rather than guessing which
/// mode was intended.
pub fn decrypt(
    data: &str,
    block: &EncryptionBlock,
    receiver_private: &RsaPrivateKey,
    oaep_digest: OaepDigest,
) -> Result<String, CryptoError> {
    if !block.is_well_formed() {
        return Err(CryptoError::MalformedEncryption(
            "auth_tag presence does not match the declared algorithm".into(),
        ));
    }

    let ciphertext = unb64(data)?;
    let wrapped_key = unb64(&block.encrypted_key)?;
    let iv = unb64(&block.iv)?;
    let key = unwrap_key(&wrapped_key, receiver_private, oaep_digest)?;

    match block.algorithm {
        EncryptionAlgorithm::Aes256Gcm => {
            let tag = block
                .auth_tag
                .as_ref()
                .ok_or_else(|| CryptoError::MalformedEncryption("gcm block missing auth_tag".into()))?;
            let tag_bytes = unb64(tag)?;
            let mut combined = ciphertext;
            combined.extend_from_slice(&tag_bytes);

            let cipher = Aes256Gcm::new_from_slice(&key)
                .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))?;
            let nonce = Nonce::from_slice(&iv);
            let plaintext = cipher
                .decrypt(
                    nonce,
                    Payload {
                        msg: &combined,
                        aad: &[],
                    },
                )
                .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))?;
            String::from_utf8(plaintext).map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))
        }
        EncryptionAlgorithm::Aes256Cbc => {
            type Decryptor = cbc::Decryptor<aes::Aes256>;
            let decryptor = Decryptor::new(key.as_slice().into(), iv.as_slice().into());
            let plaintext = decryptor
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
                .map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))?;
            String::from_utf8(plaintext).map_err(|e| CryptoError::UnsupportedEncrypt(e.to_string()))
        }
    }
}

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn unb64(s: &str) -> Result<Vec<u8>, CryptoError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| CryptoError::MalformedEncryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    #[test]
    fn gcm_round_trips() {
        let (private, public) = test_keypair();
        let payload = encrypt("hello world", &public, EncryptOptions::default()).unwrap();
        let plaintext = decrypt(&payload.data, &payload.encryption, &private, OaepDigest::Sha1).unwrap();
        assert_eq!(plaintext, "hello world");
    }

    #[test]
    fn cbc_round_trips() {
        let (private, public) = test_keypair();
        let options = EncryptOptions {
            algorithm: EncryptionAlgorithm::Aes256Cbc,
            ..EncryptOptions::default()
        };
        let payload = encrypt("legacy message", &public, options).unwrap();
        assert!(payload.encryption.auth_tag.is_none());
        let plaintext = decrypt(&payload.data, &payload.encryption, &private, OaepDigest::Sha1).unwrap();
        assert_eq!(plaintext, "legacy message");
    }

    #[test]
    fn decrypting_with_wrong_key_is_unintended_recipient() {
        let (_, public) = test_keypair();
        let (wrong_private, _) = test_keypair();
        let payload = encrypt("hello world", &public, EncryptOptions::default()).unwrap();
        let err = decrypt(&payload.data, &payload.encryption, &wrong_private, OaepDigest::Sha1).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionUnintended));
    }

    #[test]
    fn mismatched_algorithm_and_auth_tag_is_rejected() {
        let (private, _) = test_keypair();
        let mut block = EncryptionBlock {
            algorithm: EncryptionAlgorithm::Aes256Gcm,
            encrypted_key: b64(&[0u8; 256]),
            iv: b64(&[0u8; 12]),
            auth_tag: None,
            kind: EncryptionType::StandardEncrypt,
        };
        let err = decrypt("", &block, &private, OaepDigest::Sha1).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEncryption(_)));

        block.algorithm = EncryptionAlgorithm::Aes256Cbc;
        block.auth_tag = Some(b64(&[0u8; 16]));
        let err = decrypt("", &block, &private, OaepDigest::Sha1).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEncryption(_)));
    }
}
