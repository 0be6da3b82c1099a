// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Transaction generator trait and prompt context

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::ledger::Transaction;

/// Journal context handed to a generator alongside the user input.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptCtx {
    /// Known accounts, directive-scan order first.
    pub accounts: Vec<String>,
    /// Known commodities, directive-scan order first.
    pub commodities: Vec<String>,
    /// The user's free-form description.
    pub user_input: String,
    /// Wall time of the request; becomes the transaction timestamp.
    pub now: DateTime<Utc>,
}

/// Synthesizes a transaction from free-form user input.
///
/// Implementations are pure context-to-transaction functions: no
/// repository or subprocess access. Callers handle failure by retrying.
#[async_trait]
pub trait TransactionGenerator: Send + Sync {
    /// Generate a transaction for the given context. `template` is the
    /// prompt template from the repository config.
    async fn generate(&self, template: &str, ctx: &PromptCtx) -> Result<Transaction>;
}

/// Substitute the `{{accounts}}`, `{{commodities}}` and `{{date}}`
/// placeholders of a prompt template.
pub fn render_prompt(template: &str, ctx: &PromptCtx) -> String {
    template
        .replace("{{accounts}}", &ctx.accounts.join("\n"))
        .replace("{{commodities}}", &ctx.commodities.join(", "))
        .replace("{{date}}", &ctx.now.format("%Y-%m-%d").to_string())
}
