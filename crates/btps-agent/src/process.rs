// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Inbound response processing: a bare system
//! response passes through untouched; anything carrying a signature is
//! verified against the sender's published key before its document (if
//! encrypted) is decrypted.

use serde_json::Value;

use btps_crypto::encrypt::{self, OaepDigest};
use btps_crypto::keys::public_key_from_pem;
use btps_crypto::sign;
use btps_types::artifact::ServerResponse;

use crate::command::AgentFramer;
use crate::error::AgentError;

/// The outcome of [`process_message`].
#[derive(Debug, Clone)]
pub enum ProcessedMessage {
    /// Neither signed nor encrypted — a bare protocol-level response
    /// (e.g. to `system.ping`).
    System(ServerResponse),
    /// Signature verified against the sender's published key; `document`
    /// has been decrypted in place if it was encrypted.
    Verified(ServerResponse),
}

impl ProcessedMessage {
    pub fn response(&self) -> &ServerResponse {
        match self {
            ProcessedMessage::System(r) | ProcessedMessage::Verified(r) => r,
        }
    }
}

impl AgentFramer {
    pub async fn process_message(&self, response: ServerResponse) -> Result<ProcessedMessage, AgentError> {
        if response.is_system_response() {
            return Ok(ProcessedMessage::System(response));
        }

        let signed_by = response
            .signed_by
            .clone()
            .ok_or(AgentError::MissingSignerContext)?;
        let selector = response
            .selector
            .clone()
            .ok_or(AgentError::MissingSignerContext)?;
        let signature = response
            .signature
            .clone()
            .expect("is_system_response() is false, so signature is present");

        let pem = self.resolver.resolve_public_key(&signed_by, &selector).await?;
        let sender_public = public_key_from_pem(&pem)?;
        sign::verify(&response, &signature, &sender_public)?;

        let mut response = response;
        if let Some(block) = response.encryption.take() {
            let ciphertext = response
                .document
                .take()
                .ok_or(AgentError::MissingDocument("document"))?;
            let ciphertext = ciphertext
                .as_str()
                .ok_or(AgentError::MissingDocument("a base64 ciphertext document"))?
                .to_string();
            let plaintext = encrypt::decrypt(&ciphertext, &block, &self.private_key, OaepDigest::Sha1)?;
            let decrypted: Value =
                serde_json::from_str(&plaintext).unwrap_or_else(|_| Value::String(plaintext));
            response.document = Some(decrypted);
        }

        Ok(ProcessedMessage::Verified(response))
    }
}
