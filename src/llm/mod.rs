// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM-backed transaction synthesis
//!
//! Generators turn a free-form expense description plus journal context
//! into a structured transaction. They never touch the repository or the
//! ledger subprocess; validation of the result is the engine's job.

pub mod generator;
pub mod mock;
pub mod openai;

pub use generator::{render_prompt, PromptCtx, TransactionGenerator};
pub use mock::MockGenerator;
pub use openai::OpenAiGenerator;

/// Prompt template used when the repository config does not provide one.
pub const DEFAULT_PROMPT_TEMPLATE: &str = include_str!("default_prompt.txt");
