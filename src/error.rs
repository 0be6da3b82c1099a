// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Teledger
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for Teledger operations
#[derive(Error, Debug)]
pub enum TeledgerError {
    /// Repository errors: clone, fetch, commit, push
    #[error("repository error: {0}")]
    Repository(String),

    /// Config file read or parse failure other than not-found
    #[error("configuration error: {0}")]
    Config(String),

    /// Unrecoverable error while resolving journal includes
    #[error("include error: {0}")]
    Include(String),

    /// The `ledger` binary could not be launched
    #[error("unable to run ledger: {0}")]
    SubprocessSpawn(String),

    /// The `ledger` binary exited with a non-zero status
    #[error("ledger error: exited with status {status} ({stderr})")]
    SubprocessExit { status: i32, stderr: String },

    /// The `ledger` binary succeeded but produced no output
    #[error("ledger command returned empty result")]
    EmptyResult,

    /// Candidate transaction rejected during validation.
    ///
    /// The `invalid transaction:` prefix is what the add-or-propose flow
    /// matches to decide between surfacing the error and falling back to
    /// LLM synthesis, so it must not change.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// User supplied an empty or whitespace-only comment
    #[error("empty comment provided")]
    EmptyComment,

    /// No transaction with the given id marker exists in the journal
    #[error("no transaction with id '{0}' was found")]
    TransactionNotFound(String),

    /// Confirmation or lookup of an unknown pending key
    #[error("missing pending transaction: `{0}`")]
    PendingMissing(String),

    /// A confirmation for the same pending transaction is running
    #[error("transaction confirmation already in progress: `{0}`")]
    PendingBusy(String),

    /// LLM call or response parse failure
    #[error("transaction generator error: {0}")]
    Generator(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Teledger operations
pub type Result<T> = std::result::Result<T, TeledgerError>;

impl TeledgerError {
    /// Whether add-or-propose should fall back to LLM synthesis.
    pub fn is_invalid_transaction(&self) -> bool {
        matches!(self, TeledgerError::InvalidTransaction(_))
    }
}

impl From<git2::Error> for TeledgerError {
    fn from(err: git2::Error) -> Self {
        TeledgerError::Repository(err.message().to_string())
    }
}

impl From<serde_yaml::Error> for TeledgerError {
    fn from(err: serde_yaml::Error) -> Self {
        TeledgerError::Config(err.to_string())
    }
}
