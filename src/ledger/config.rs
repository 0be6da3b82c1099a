// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-repository configuration
//!
//! Loaded from `teledger.yaml` at the repository root on every session.
//! A missing file is not an error; defaults are filled in field by field
//! so a partial file only overrides what it sets.

use std::io::Read;

use serde::Deserialize;

use crate::error::{Result, TeledgerError};
use crate::repo::Session;

/// Name of the config file at the repository root.
pub const CONFIG_FILE: &str = "teledger.yaml";

/// Journal file used when the config does not name one.
pub const DEFAULT_MAIN_FILE: &str = "main.ledger";

/// A named `ledger` invocation the user can run from the chat surface.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub command: Vec<String>,
}

/// Repository configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Root journal file, relative to the repository root.
    pub main_file: String,
    /// Run the ledger tool with `--pedantic`, rejecting undeclared
    /// accounts and commodities.
    pub strict: bool,
    /// Prompt template for transaction synthesis.
    pub prompt_template: String,
    /// Config schema version.
    pub version: String,
    /// Reports offered to the user.
    pub reports: Vec<Report>,
}

impl Config {
    /// Load the config from the session's working tree, falling back to
    /// defaults when the file does not exist.
    pub fn load(session: &dyn Session) -> Result<Self> {
        let mut config = match session.open(CONFIG_FILE) {
            Ok(mut reader) => {
                let mut raw = String::new();
                reader.read_to_string(&mut raw)?;
                serde_yaml::from_str(&raw).map_err(|e| {
                    TeledgerError::Config(format!("unable to parse {CONFIG_FILE}: {e}"))
                })?
            }
            Err(TeledgerError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Config::default()
            }
            Err(err) => return Err(err),
        };
        config.apply_defaults();
        Ok(config)
    }

    fn apply_defaults(&mut self) {
        if self.main_file.is_empty() {
            self.main_file = DEFAULT_MAIN_FILE.to_string();
        }
        if self.prompt_template.is_empty() {
            self.prompt_template = crate::llm::DEFAULT_PROMPT_TEMPLATE.to_string();
        }
        if self.version.is_empty() {
            self.version = "0".to_string();
        }
    }

    /// Look up a configured report by title.
    pub fn report(&self, title: &str) -> Option<&Report> {
        self.reports.iter().find(|r| r.title == title)
    }
}
