// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BtpsError, BtpsErrorKind};

/// A principal address of the shape `account$domain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub account: String,
    pub domain: String,
}

impl Identity {
    pub fn new(account: impl Into<String>, domain: impl Into<String>) -> Result<Self, BtpsError> {
        let identity = Self {
            account: account.into(),
            domain: domain.into(),
        };
        identity.validate()?;
        Ok(identity)
    }

    fn validate(&self) -> Result<(), BtpsError> {
        if self.account.is_empty() || self.domain.is_empty() {
            return Err(BtpsError::new(BtpsErrorKind::InvalidIdentity)
                .with_message("account and domain must both be non-empty"));
        }
        if !self.domain.contains('.') {
            return Err(BtpsError::new(BtpsErrorKind::InvalidIdentity)
                .with_message(format!("domain '{}' must contain a dot", self.domain)));
        }
        Ok(())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.account, self.domain)
    }
}

impl FromStr for Identity {
    type Err = BtpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (account, domain) = s.split_once('$').ok_or_else(|| {
            BtpsError::new(BtpsErrorKind::InvalidIdentity)
                .with_message(format!("'{s}' is missing the '$' separator"))
        })?;
        Identity::new(account, domain)
    }
}

impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Identity::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_identity() {
        let id: Identity = "alice$example.com".parse().unwrap();
        assert_eq!(id.account, "alice");
        assert_eq!(id.domain, "example.com");
        assert_eq!(id.to_string(), "alice$example.com");
    }

    #[test]
    fn rejects_missing_separator() {
        let err = "alice-example.com".parse::<Identity>().unwrap_err();
        assert_eq!(err.kind, BtpsErrorKind::InvalidIdentity);
    }

    #[test]
    fn rejects_domain_without_dot() {
        let err = "alice$localhost".parse::<Identity>().unwrap_err();
        assert_eq!(err.kind, BtpsErrorKind::InvalidIdentity);
    }

    #[test]
    fn rejects_empty_account() {
        let err = "$example.com".parse::<Identity>().unwrap_err();
        assert_eq!(err.kind, BtpsErrorKind::InvalidIdentity);
    }
}
