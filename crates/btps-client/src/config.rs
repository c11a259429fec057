// Copyright 2024-, BTPS Contributors.
// SPDX-License-Identifier: Apache-2.0

//! File-backed defaults, layered under CLI flags and environment
//! variables. Grounded on a `Config`-struct-plus-overlay
//! shape (`service/src/config.rs`), but reads YAML instead of TOML
//! since it never grew config sections complex enough to need
//! `figment`'s provider composition.

use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileConfig {
    pub identity: Option<String>,
    pub selector: Option<String>,
    pub private_key: Option<String>,
    pub insecure: Option<bool>,
    pub cert: Option<String>,
    pub tls_key: Option<String>,
    pub ca: Option<String>,
}

impl FileConfig {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Fills in any field the CLI left unset. CLI flags (and the env
    /// vars `clap` reads them from) always win over the file.
    pub fn apply_defaults(self, cli: &mut Cli) {
        if cli.identity.is_none() {
            cli.identity = self.identity;
        }
        if cli.selector.is_none() {
            cli.selector = self.selector;
        }
        if cli.private_key.is_none() {
            cli.private_key = self.private_key.map(Into::into);
        }
        if !cli.insecure {
            cli.insecure = self.insecure.unwrap_or(false);
        }
        if cli.cert.is_none() {
            cli.cert = self.cert.map(Into::into);
        }
        if cli.tls_key.is_none() {
            cli.tls_key = self.tls_key.map(Into::into);
        }
        if cli.ca.is_none() {
            cli.ca = self.ca.map(Into::into);
        }
    }
}
