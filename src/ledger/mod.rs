// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Journal engine
//!
//! Semantic operations over the ledger journal: queries, comments,
//! transactions, LLM-backed proposal. Every public operation runs the
//! session envelope: acquire an exclusive repository session, load the
//! config, operate, commit on success, and let the session drop on every
//! exit path. Nothing touches the remote until `commit_push`.

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use chrono::Utc;

use crate::error::{Result, TeledgerError};
use crate::llm::{PromptCtx, TransactionGenerator};
use crate::repo::{Repository, Session};

pub mod command;
pub mod config;
pub mod includes;
pub mod transaction;

pub use command::run_ledger;
pub use config::{Config, Report};
pub use includes::IncludeWalker;
pub use transaction::{format_amount, wrap_into_comment, Posting, Transaction};

/// Marker line written before a confirmed transaction; the delete scanner
/// recognizes exactly this prefix.
pub const TRANSACTION_ID_PREFIX: &str = ";; tid:";

// Legacy commit identity, shared by every commit the engine makes.
const COMMIT_MESSAGE: &str = "New comment";
const COMMIT_AUTHOR: &str = "teledger";
const COMMIT_EMAIL: &str = "teledger@example.com";

/// Journal directives the engine scans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Account,
    Commodity,
}

impl Directive {
    fn keyword(self) -> &'static str {
        match self {
            Directive::Account => "account",
            Directive::Commodity => "commodity",
        }
    }

    /// Ledger subcommand listing the directive's values in use.
    fn command(self) -> &'static str {
        match self {
            Directive::Account => "accounts",
            Directive::Commodity => "commodities",
        }
    }
}

/// Outcome of [`Ledger::add_or_propose`].
#[derive(Debug, Default)]
pub struct ProposeResponse {
    /// Set when the user input itself was a valid transaction.
    pub user_provided_transaction: Option<String>,
    /// Last transaction the generator came up with.
    pub generated_transaction: Option<Transaction>,
    /// Error of the last attempt, if it failed.
    pub error: Option<TeledgerError>,
    /// Attempt the generated transaction came from, 1-based.
    pub attempt_number: u32,
    /// Whether anything was committed to the repository.
    pub committed: bool,
}

/// The journal engine.
pub struct Ledger {
    repo: Arc<dyn Repository>,
    generator: Option<Arc<dyn TransactionGenerator>>,
}

impl Ledger {
    pub fn new(
        repo: Arc<dyn Repository>,
        generator: Option<Arc<dyn TransactionGenerator>>,
    ) -> Self {
        Self { repo, generator }
    }

    /// Run a read-only ledger query over the journal. No commit.
    pub async fn execute<S: AsRef<str> + Sync>(&self, args: &[S]) -> Result<String> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        run_ledger(session.as_ref(), &config.main_file, config.strict, None, &args).await
    }

    /// The report list from the repository config.
    pub async fn reports(&self) -> Result<Vec<Report>> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        Ok(config.reports)
    }

    /// Run a configured report by title.
    pub async fn report(&self, title: &str) -> Result<String> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        let report = config
            .report(title)
            .ok_or_else(|| TeledgerError::Config(format!("no report titled '{title}'")))?;
        let args: Vec<&str> = report.command.iter().map(String::as_str).collect();
        run_ledger(session.as_ref(), &config.main_file, config.strict, None, &args).await
    }

    /// Append a free-form note as `;; ` comment lines, validate, commit.
    /// Returns the wrapped text.
    pub async fn add_comment(&self, comment: &str) -> Result<String> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;

        let wrapped = wrap_into_comment(comment);
        if wrapped.is_empty() {
            return Err(TeledgerError::EmptyComment);
        }

        let mut handle = session.open_for_append(&config.main_file)?;
        handle.write_all(format!("\n{wrapped}\n").as_bytes())?;
        handle.close()?;

        // The journal must still balance with the comment in place.
        run_ledger(session.as_ref(), &config.main_file, config.strict, None, &["balance"]).await?;

        session.commit_push(COMMIT_MESSAGE, COMMIT_AUTHOR, COMMIT_EMAIL)?;
        Ok(wrapped)
    }

    /// Validate and commit a transaction given in journal syntax.
    pub async fn add_transaction(&self, transaction: &str) -> Result<()> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        self.add_transaction_in(session.as_ref(), &config, transaction)
            .await?;
        session.commit_push(COMMIT_MESSAGE, COMMIT_AUTHOR, COMMIT_EMAIL)
    }

    /// Like [`Self::add_transaction`], with a `;; tid:` marker prepended
    /// so the transaction can be deleted later by id.
    pub async fn add_transaction_with_id(&self, transaction: &str, id: &str) -> Result<()> {
        self.add_transaction(&format!("{TRANSACTION_ID_PREFIX}{id}\n{transaction}"))
            .await
    }

    /// Remove the transaction block marked with `;; tid:<id>` and commit.
    pub async fn delete_transaction_with_id(&self, id: &str) -> Result<()> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;

        let mut file = session.open_file(&config.main_file)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let filtered = filter_out_transaction(&content, id)?;

        file.truncate()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(filtered.as_bytes())?;
        file.close()?;

        session.commit_push(COMMIT_MESSAGE, COMMIT_AUTHOR, COMMIT_EMAIL)
    }

    /// Add the user input verbatim if it already is a valid transaction;
    /// otherwise ask the generator for one, up to `attempts` times.
    ///
    /// A verbatim success commits immediately. A generated transaction is
    /// only validated, never committed here; it waits for an explicit
    /// confirmation. `attempts` of zero is a caller bug.
    pub async fn add_or_propose(&self, user_input: &str, attempts: u32) -> ProposeResponse {
        assert!(attempts > 0, "attempts must be greater than zero");

        let mut resp = ProposeResponse::default();
        let session = match self.repo.session().await {
            Ok(session) => session,
            Err(err) => {
                resp.error = Some(err);
                return resp;
            }
        };
        let config = match Config::load(session.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                resp.error = Some(err);
                return resp;
            }
        };

        match self
            .add_transaction_in(session.as_ref(), &config, user_input)
            .await
        {
            Ok(()) => {
                resp.user_provided_transaction = Some(user_input.to_string());
                if let Err(err) = session.commit_push(COMMIT_MESSAGE, COMMIT_AUTHOR, COMMIT_EMAIL) {
                    resp.error = Some(err);
                    return resp;
                }
                resp.committed = true;
                return resp;
            }
            // Anything other than a rejected transaction is an
            // infrastructure error and is returned as is.
            Err(err) if !err.is_invalid_transaction() => {
                resp.error = Some(err);
                return resp;
            }
            Err(_) => {}
        }

        for attempt in 1..=attempts {
            resp.attempt_number = attempt;
            if attempt > 1 {
                tracing::warn!(attempt, "retrying transaction generation");
            }

            let candidate = match self
                .generate_candidate(session.as_ref(), &config, user_input)
                .await
            {
                Ok(candidate) => candidate,
                Err(err) => {
                    resp.error = Some(err);
                    continue;
                }
            };
            let rendered = candidate.render(false);
            resp.generated_transaction = Some(candidate);

            // Validation appends to the session's in-memory journal; the
            // session drops without commit on this path, so the write is
            // discarded.
            match self
                .add_transaction_in(session.as_ref(), &config, &rendered)
                .await
            {
                Ok(()) => {
                    resp.error = None;
                    return resp;
                }
                Err(err) => resp.error = Some(err),
            }
        }
        resp
    }

    /// Known accounts: journal `account` directives first, then accounts
    /// in use per the ledger tool, deduplicated preserving order.
    pub async fn extract_accounts(&self) -> Result<Vec<String>> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        self.extract_directives(session.as_ref(), &config, Directive::Account)
            .await
    }

    /// Known commodities, same union as [`Self::extract_accounts`].
    pub async fn extract_commodities(&self) -> Result<Vec<String>> {
        let session = self.repo.session().await?;
        let config = Config::load(session.as_ref())?;
        self.extract_directives(session.as_ref(), &config, Directive::Commodity)
            .await
    }

    /// Validate a transaction against the journal and append it to the
    /// session's main file. Both balance runs and the balance-difference
    /// check happen before anything is written.
    async fn add_transaction_in(
        &self,
        session: &dyn Session,
        config: &Config,
        transaction: &str,
    ) -> Result<()> {
        let before = run_ledger(session, &config.main_file, config.strict, None, &["balance"])
            .await
            .map_err(|e| TeledgerError::InvalidTransaction(e.to_string()))?;

        let after = run_ledger(
            session,
            &config.main_file,
            config.strict,
            Some(transaction),
            &["balance"],
        )
        .await
        .map_err(|e| TeledgerError::InvalidTransaction(e.to_string()))?;

        // Catches pure comments and inputs the tool silently ignores.
        if before == after {
            return Err(TeledgerError::InvalidTransaction(
                "transaction doesn't change balance".to_string(),
            ));
        }

        let mut handle = session.open_for_append(&config.main_file)?;
        handle.write_all(format!("\n{transaction}").as_bytes())?;
        handle.close()?;
        Ok(())
    }

    async fn generate_candidate(
        &self,
        session: &dyn Session,
        config: &Config,
        user_input: &str,
    ) -> Result<Transaction> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            TeledgerError::Generator("no transaction generator configured".to_string())
        })?;

        let accounts = self
            .extract_directives(session, config, Directive::Account)
            .await?;
        let commodities = self
            .extract_directives(session, config, Directive::Commodity)
            .await?;

        let ctx = PromptCtx {
            accounts,
            commodities,
            user_input: user_input.to_string(),
            now: Utc::now(),
        };
        generator.generate(&config.prompt_template, &ctx).await
    }

    async fn extract_directives(
        &self,
        session: &dyn Session,
        config: &Config,
        directive: Directive,
    ) -> Result<Vec<String>> {
        let mut values = Vec::new();

        let walker = IncludeWalker::new(session, &config.main_file)?;
        for line in walker {
            let line = line?;
            if let Some(rest) = line.strip_prefix(directive.keyword()) {
                if rest.starts_with(char::is_whitespace) {
                    values.push(rest.trim().to_string());
                }
            }
        }

        let output = run_ledger(
            session,
            &config.main_file,
            config.strict,
            None,
            &[directive.command()],
        )
        .await?;
        values.extend(output.trim().lines().map(str::to_string));

        let mut seen = std::collections::HashSet::new();
        values.retain(|value| seen.insert(value.clone()));
        Ok(values)
    }
}

/// Remove the block starting at the `;; tid:<id>` marker line up to (and
/// including) the following empty line.
///
/// Journals separate transactions with one blank line; the newline
/// juggling removes exactly one separator along with the block: the blank
/// line before the marker is collapsed, and the terminating empty line
/// re-emits a single newline.
fn filter_out_transaction(content: &str, id: &str) -> Result<String> {
    let marker = format!("{TRANSACTION_ID_PREFIX}{id}");

    #[derive(PartialEq)]
    enum State {
        Searching,
        Skipping,
        Copying,
    }

    let mut state = State::Searching;
    let mut out = String::new();

    for line in content.lines() {
        match state {
            State::Searching if line == marker => {
                state = State::Skipping;
                if out.ends_with('\n') {
                    out.pop();
                }
            }
            State::Skipping if line.is_empty() => {
                state = State::Copying;
                out.push('\n');
            }
            State::Skipping => {}
            _ => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    if state == State::Searching {
        return Err(TeledgerError::TransactionNotFound(id.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORNER_CASES: &str = "
commodity EUR

;; tid:2014-11-30 11:45:26.111 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR

;; tid:2014-11-30 11:45:26.371 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR

;; tid:2014-11-30 11:45:26.371 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR
";

    #[test]
    fn test_filter_out_transaction_in_the_middle() {
        let filtered = filter_out_transaction(CORNER_CASES, "2014-11-30 11:45:26.111 Sun").unwrap();
        assert_eq!(
            filtered,
            "
commodity EUR

;; tid:2014-11-30 11:45:26.371 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR

;; tid:2014-11-30 11:45:26.371 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR
"
        );
    }

    #[test]
    fn test_filter_out_transaction_removes_first_of_repeating() {
        let filtered = filter_out_transaction(CORNER_CASES, "2014-11-30 11:45:26.371 Sun").unwrap();
        let remaining = filter_out_transaction(&filtered, "2014-11-30 11:45:26.371 Sun").unwrap();
        assert_eq!(
            remaining,
            "
commodity EUR

;; tid:2014-11-30 11:45:26.111 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR
"
        );
    }

    #[test]
    fn test_filter_out_transaction_at_end_of_file() {
        let content = "\
account Equity

;; tid:key
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR
";
        let filtered = filter_out_transaction(content, "key").unwrap();
        assert_eq!(filtered, "account Equity\n");
    }

    #[test]
    fn test_filter_out_transaction_unknown_id() {
        let err = filter_out_transaction(CORNER_CASES, "unknowntrr").err().unwrap();
        assert!(matches!(err, TeledgerError::TransactionNotFound(_)));
        assert!(err.to_string().contains("unknowntrr"));
    }

    #[test]
    fn test_add_with_id_then_delete_restores_content() {
        let initial = "
account Food
account Assets:Cash

2024-02-13 * Test
  Assets:Cash  100.00 EUR
  Equity
";
        let block = ";; tid:key\n;; valid\n2014-11-30 * My tr\n    Assets:Cash  -10,00 EUR\n    Food  10,00 EUR\n";
        let appended = format!("{initial}\n{block}");
        let restored = filter_out_transaction(&appended, "key").unwrap();
        assert_eq!(restored, initial);
    }

    #[test]
    fn test_directive_names() {
        assert_eq!(Directive::Account.keyword(), "account");
        assert_eq!(Directive::Account.command(), "accounts");
        assert_eq!(Directive::Commodity.keyword(), "commodity");
        assert_eq!(Directive::Commodity.command(), "commodities");
    }

    #[test]
    #[should_panic(expected = "greater than zero")]
    fn test_add_or_propose_zero_attempts_panics() {
        let repo = Arc::new(crate::repo::MockRepository::with_files([("main.ledger", "")]));
        let ledger = Ledger::new(repo, None);
        // Constructing the future is not enough; poll it to hit the assert.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(ledger.add_or_propose("input", 0));
    }
}
