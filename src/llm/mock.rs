// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock transaction generator for testing
//!
//! Queues transactions (or errors) to hand out in order, recording every
//! prompt context, so tests can drive the propose/retry flow without an
//! LLM endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, TeledgerError};
use crate::ledger::Transaction;
use crate::llm::generator::{PromptCtx, TransactionGenerator};

type MockResult = std::result::Result<Transaction, String>;

/// A configurable mock implementation of [`TransactionGenerator`].
#[derive(Clone, Default)]
pub struct MockGenerator {
    responses: Arc<Mutex<Vec<MockResult>>>,
    call_count: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<PromptCtx>>>,
}

impl MockGenerator {
    /// Create a mock with no queued responses; calls fail until a
    /// response is queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transaction to return. Responses are handed out in queue
    /// order; the last one repeats.
    pub fn with_transaction(self, transaction: Transaction) -> Self {
        self.responses.lock().unwrap().push(Ok(transaction));
        self
    }

    /// Queue a generator failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(Err(message.into()));
        self
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every prompt context seen, in call order.
    pub fn recorded_contexts(&self) -> Vec<PromptCtx> {
        self.recorded.lock().unwrap().clone()
    }

    fn next_response(&self) -> Option<MockResult> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            None
        } else {
            Some(responses[count.min(responses.len() - 1)].clone())
        }
    }
}

#[async_trait]
impl TransactionGenerator for MockGenerator {
    async fn generate(&self, _template: &str, ctx: &PromptCtx) -> Result<Transaction> {
        self.recorded.lock().unwrap().push(ctx.clone());
        match self.next_response() {
            Some(Ok(transaction)) => Ok(transaction),
            Some(Err(message)) => Err(TeledgerError::Generator(message)),
            None => Err(TeledgerError::Generator(
                "mock generator has no queued responses".to_string(),
            )),
        }
    }
}
