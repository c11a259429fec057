// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Wire schema, public constants, and the shared error taxonomy for the
//! BTPS protocol engine.

pub mod action;
pub mod artifact;
pub mod constants;
pub mod error;
pub mod identity;
pub mod trust;

pub use action::AgentAction;
pub use artifact::{
    AgentArtifact, AttestationBlock, Delegation, EncryptionBlock, EncryptionType,
    IdentityLookupRequest, ResponseStatus, ServerResponse, Signature, TransporterArtifact,
    TransporterKind,
};
pub use constants::*;
pub use error::{BtpsError, BtpsErrorKind};
pub use identity::Identity;
pub use trust::{compute_trust_id, PrivacyType, TrustRecord, TrustStatus};
