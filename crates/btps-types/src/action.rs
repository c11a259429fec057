// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::artifact::TransporterKind;

/// The full set of actions an [`crate::AgentArtifact`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    #[serde(rename = "trust.request")]
    TrustRequest,
    #[serde(rename = "trust.respond")]
    TrustRespond,
    #[serde(rename = "trust.update")]
    TrustUpdate,
    #[serde(rename = "trust.delete")]
    TrustDelete,
    #[serde(rename = "artifact.send")]
    ArtifactSend,
    #[serde(rename = "auth.request")]
    AuthRequest,
    #[serde(rename = "auth.refresh")]
    AuthRefresh,
    #[serde(rename = "system.ping")]
    SystemPing,
}

impl AgentAction {
    /// Actions that must build a [`TransporterArtifact`](crate::TransporterArtifact)
    /// before being wrapped as an agent artifact.
    pub fn builds_transporter_artifact(self) -> bool {
        matches!(
            self,
            AgentAction::TrustRequest
                | AgentAction::TrustRespond
                | AgentAction::TrustUpdate
                | AgentAction::TrustDelete
                | AgentAction::ArtifactSend
        )
    }

    /// The [`TransporterKind`] an action maps to, for actions that build a
    /// transporter artifact.
    pub fn transporter_kind(self) -> Option<TransporterKind> {
        match self {
            AgentAction::TrustRequest => Some(TransporterKind::TrustReq),
            AgentAction::TrustRespond | AgentAction::TrustUpdate | AgentAction::TrustDelete => {
                Some(TransporterKind::TrustRes)
            }
            AgentAction::ArtifactSend => Some(TransporterKind::BtpsDoc),
            _ => None,
        }
    }

    /// Whether `document` is a required field for this action.
    pub fn requires_document(self) -> bool {
        matches!(
            self,
            AgentAction::TrustRequest
                | AgentAction::TrustRespond
                | AgentAction::TrustUpdate
                | AgentAction::TrustDelete
                | AgentAction::ArtifactSend
                | AgentAction::AuthRequest
                | AgentAction::AuthRefresh
        )
    }

    /// `auth.request` travels as a signed, cleartext-document agent
    /// artifact — encryption options are stripped.
    pub fn forbids_encryption(self) -> bool {
        matches!(self, AgentAction::AuthRequest)
    }
}
