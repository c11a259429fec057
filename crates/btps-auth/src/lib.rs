// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! Authentication sub-core: auth-token issuance, refresh-token
//! reissue, and agent device-key trust. Holds no sockets — invoked
//! directly by `btps-agent`'s dispatch, never by a transport listener.

pub mod error;
pub mod service;
pub mod store;

pub use error::AuthError;
pub use service::{AgentCredentials, AuthOptions, AuthService, CreateAgentRequest, ReissueRequest};
pub use store::{AuthTokenRecord, IdentityStore, RefreshTokenRecord, RefreshTokenStore, TokenStore, TrustStore};
