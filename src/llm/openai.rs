// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI chat-completion transaction generator
//!
//! Renders the prompt template against the journal context, sends a
//! system+user message pair, and parses the reply as a JSON transaction.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TeledgerError};
use crate::ledger::{Posting, Transaction};
use crate::llm::generator::{render_prompt, PromptCtx, TransactionGenerator};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generator backed by the OpenAI chat completions endpoint.
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    /// Create a generator with the default endpoint and model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (for compatible endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Deserialize)]
struct TransactionPayload {
    #[serde(default)]
    date: String,
    description: String,
    postings: Vec<Posting>,
}

/// Parse a model reply into a transaction, tolerating a markdown fence
/// around the JSON.
fn parse_reply(content: &str, ctx: &PromptCtx) -> Result<Transaction> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let payload: TransactionPayload = serde_json::from_str(json).map_err(|e| {
        TeledgerError::Generator(format!("unable to parse reply as a transaction: {e}"))
    })?;

    if payload.postings.is_empty() {
        return Err(TeledgerError::Generator(
            "generated transaction has no postings".to_string(),
        ));
    }

    Ok(Transaction {
        date: payload.date,
        description: payload.description,
        postings: payload.postings,
        comment: ctx.user_input.clone(),
        real_date_time: ctx.now,
    })
}

#[async_trait]
impl TransactionGenerator for OpenAiGenerator {
    async fn generate(&self, template: &str, ctx: &PromptCtx) -> Result<Transaction> {
        let prompt = render_prompt(template, ctx);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &ctx.user_input,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TeledgerError::Generator(format!(
                "chat completion failed with status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| {
                TeledgerError::Generator("chat completion returned no choices".to_string())
            })?;

        parse_reply(content, ctx)
    }
}
