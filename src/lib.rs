// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Teledger - conversational front-end for a plain-text ledger journal
//!
//! The journal lives in a remote git repository. Every operation clones it
//! into an ephemeral working tree, drives the external `ledger` tool to
//! validate the result, and commits back on success.

pub mod cli;
pub mod error;
pub mod ledger;
pub mod llm;
pub mod repo;
pub mod teledger;

pub use error::{Result, TeledgerError};
