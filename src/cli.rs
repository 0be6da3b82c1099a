// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Connection settings mirror the environment variables the service is
//! deployed with; subcommands map one-to-one onto engine operations.

use clap::{Parser, Subcommand};

/// Teledger - conversational front-end for a ledger journal in git
#[derive(Parser, Debug)]
#[command(name = "teledger")]
#[command(version, about = "Conversational front-end for a ledger journal in git")]
pub struct Cli {
    /// Remote repository holding the journal
    #[arg(long, env = "GITHUB_URL")]
    pub github_url: String,

    /// Fine-grained access token with read/write contents scope
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: String,

    /// Branch to work on (remote default when omitted)
    #[arg(long, env = "GITHUB_BRANCH")]
    pub github_branch: Option<String>,

    /// OpenAI API token; without it free-form proposals are disabled
    #[arg(long, env = "OPENAI_TOKEN")]
    pub openai_token: Option<String>,

    /// Chat model used for transaction synthesis
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    pub openai_model: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the balance report
    Balance,

    /// List the reports configured in teledger.yaml
    Reports,

    /// Run a configured report by title
    Report {
        /// Title as configured in teledger.yaml
        title: String,
    },

    /// Append a timestamped comment to the journal
    Comment {
        /// Comment text; may span multiple lines
        text: String,
    },

    /// Validate and commit a transaction given in journal syntax
    Add {
        /// The transaction text
        text: String,
    },

    /// Add a transaction, falling back to LLM synthesis for free-form
    /// descriptions; synthesized transactions ask for confirmation
    Propose {
        /// Transaction or free-form description
        text: String,
    },

    /// Delete a transaction by its id marker
    Delete {
        /// The pending key the transaction was confirmed with
        key: String,
    },
}
