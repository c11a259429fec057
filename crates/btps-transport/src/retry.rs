// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! The opaque-error classifier: errors that arrive as an
//! unstructured string from the socket/TLS layer, not as a typed
//! [`btps_types::BtpsErrorKind`], are matched against this fixed phrase
//! list to decide retry eligibility.

const NON_RETRYABLE_PHRASES: &[&str] = &[
    "invalid identity",
    "invalid btpaddress",
    "invalid hostname",
    "unsupported protocol",
    "signature verification failed",
    "destroyed",
    "dns resolution failed",
    "client disconnected after inactivity",
    "already connecting",
];

/// Case-insensitive substring match against the fixed non-retryable
/// phrase list. Only used for errors this workspace did not itself
/// originate as a [`btps_types::BtpsErrorKind`] (which has its own
/// `is_retryable`).
pub fn is_non_retryable(message: &str) -> bool {
    let lower = message.to_lowercase();
    NON_RETRYABLE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
