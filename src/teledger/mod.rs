// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Teledger coordinator
//!
//! Front door for the chat surface: timestamped comments, balance and
//! report queries, and the two-step propose/confirm flow for synthesized
//! transactions. Proposed transactions wait in an in-memory registry
//! keyed by their pending key until the user confirms them.
//!
//! The registry grows without bound across pending proposals; there is no
//! TTL and no cap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, TeledgerError};
use crate::ledger::{Ledger, ProposeResponse, Report};

/// Pending keys are sub-second timestamps: `2014-11-30 11:45:26.371 Sun`.
pub const PENDING_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f %a";

/// How often a proposal is retried before giving up.
const PROPOSE_ATTEMPTS: u32 = 2;

/// A proposed transaction waiting for user confirmation.
pub struct PendingTransaction {
    /// The proposal outcome this entry was created from.
    pub response: ProposeResponse,
    /// Registry key; empty when nothing is pending (direct commit or
    /// failed proposal).
    pub pending_key: String,
    committed: AtomicBool,
    lock: Mutex<()>,
}

impl PendingTransaction {
    /// Whether the transaction reached the repository, either directly or
    /// through a confirmation.
    pub fn is_committed(&self) -> bool {
        self.response.committed || self.committed.load(Ordering::SeqCst)
    }
}

/// Coordinates journal operations and confirmation state.
pub struct Teledger {
    ledger: Ledger,
    pending: RwLock<HashMap<String, Arc<PendingTransaction>>>,
}

impl Teledger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Warm-up check: the journal must produce a balance report.
    pub async fn init(&self) -> Result<()> {
        self.ledger.execute(&["bal"]).await.map(drop)
    }

    /// The current balance report.
    pub async fn balance(&self) -> Result<String> {
        self.ledger.execute(&["bal"]).await
    }

    /// Reports configured in the repository.
    pub async fn reports(&self) -> Result<Vec<Report>> {
        self.ledger.reports().await
    }

    /// Run a configured report by title.
    pub async fn report(&self, title: &str) -> Result<String> {
        self.ledger.report(title).await
    }

    /// Append an arbitrary note to the journal, prefixed with the current
    /// wall time and followed by an empty transaction template line.
    pub async fn add_comment(&self, comment: &str) -> Result<String> {
        if comment.trim().is_empty() {
            return Err(TeledgerError::EmptyComment);
        }

        let now = Utc::now();
        let entry = format!(
            "{}\n{}\n{} *",
            now.format("%Y-%m-%d %H:%M:%S %A"),
            comment,
            now.format("%Y-%m-%d"),
        );
        self.ledger.add_comment(&entry).await
    }

    /// Validate and commit a transaction given in journal syntax.
    pub async fn add_transaction(&self, transaction: &str) -> Result<()> {
        self.ledger.add_transaction(transaction).await
    }

    /// Add the description verbatim if it is a valid transaction, or
    /// propose a synthesized one and park it for confirmation.
    pub async fn propose_transaction(&self, description: &str) -> Arc<PendingTransaction> {
        let response = self.ledger.add_or_propose(description, PROPOSE_ATTEMPTS).await;

        let pending_key = match (&response.error, &response.generated_transaction) {
            (None, Some(transaction)) => transaction
                .real_date_time
                .format(PENDING_KEY_FORMAT)
                .to_string(),
            _ => String::new(),
        };

        let entry = Arc::new(PendingTransaction {
            response,
            pending_key: pending_key.clone(),
            committed: AtomicBool::new(false),
            lock: Mutex::new(()),
        });

        if !pending_key.is_empty() {
            self.pending
                .write()
                .await
                .insert(pending_key, Arc::clone(&entry));
        }
        entry
    }

    /// Commit a previously proposed transaction.
    ///
    /// The entry's own lock makes concurrent confirmations of the same
    /// key fail fast instead of committing twice; it is released on every
    /// path. On success the entry leaves the registry.
    pub async fn confirm_transaction(&self, pending_key: &str) -> Result<Arc<PendingTransaction>> {
        let entry = self
            .pending
            .read()
            .await
            .get(pending_key)
            .cloned()
            .ok_or_else(|| TeledgerError::PendingMissing(pending_key.to_string()))?;

        let _guard = entry
            .lock
            .try_lock()
            .map_err(|_| TeledgerError::PendingBusy(pending_key.to_string()))?;

        let transaction = entry
            .response
            .generated_transaction
            .as_ref()
            .ok_or_else(|| TeledgerError::PendingMissing(pending_key.to_string()))?;

        self.ledger
            .add_transaction_with_id(&transaction.render(true), pending_key)
            .await?;

        entry.committed.store(true, Ordering::SeqCst);
        self.pending.write().await.remove(pending_key);
        Ok(Arc::clone(&entry))
    }

    /// Delete a transaction by pending key, whether or not it is still in
    /// the registry; the transaction may have been confirmed in a past
    /// session.
    pub async fn delete_transaction(&self, pending_key: &str) -> Result<()> {
        self.ledger.delete_transaction_with_id(pending_key).await
    }
}
