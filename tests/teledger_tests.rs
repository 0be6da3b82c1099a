// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Propose/confirm flow tests.
//!
//! Tests that need the external `ledger` tool skip with a message when it
//! is not on PATH.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use teledger::ledger::{Ledger, Posting, Transaction};
use teledger::llm::{MockGenerator, TransactionGenerator};
use teledger::repo::{MockRepository, Repository};
use teledger::teledger::Teledger;
use teledger::TeledgerError;

fn ledger_available() -> bool {
    std::process::Command::new("ledger")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

fn service(repo: &MockRepository, generator: Option<Arc<dyn TransactionGenerator>>) -> Teledger {
    Teledger::new(Ledger::new(
        Arc::new(repo.clone()) as Arc<dyn Repository>,
        generator,
    ))
}

fn proposal_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2014-11-30T11:45:26.371443Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn transaction(comment: &str, postings: &[(&str, f64)]) -> Transaction {
    Transaction {
        date: "2014-11-30".to_string(),
        description: "My tr".to_string(),
        postings: postings
            .iter()
            .map(|(account, amount)| Posting {
                account: account.to_string(),
                amount: *amount,
                currency: "EUR".to_string(),
            })
            .collect(),
        comment: comment.to_string(),
        real_date_time: proposal_time(),
    }
}

const STRICT_JOURNAL: &str = "
account Food
account Assets:Cash
account Equity
commodity EUR

2024-02-13 * Test
  Assets:Cash  100.00 EUR
  Equity
";

const STRICT_CONFIG: &str = "strict: true\n";

#[tokio::test]
async fn test_propose_confirm_delete_round_trip() {
    if !ledger_available() {
        eprintln!("skipping: ledger binary not on PATH");
        return;
    }

    let repo = MockRepository::with_files([
        ("main.ledger", STRICT_JOURNAL),
        ("teledger.yaml", STRICT_CONFIG),
    ]);
    let generator: Arc<dyn TransactionGenerator> = Arc::new(MockGenerator::new()
        .with_transaction(transaction("valid", &[("Assets:Cash", -10.0), ("Food", 10.0)])));
    let teledger = service(&repo, Some(generator));

    let pending = teledger.propose_transaction("valid").await;
    assert!(pending.response.error.is_none());
    assert!(!pending.response.committed);
    assert_eq!(pending.pending_key, "2014-11-30 11:45:26.371 Sun");

    // The proposal only validated; nothing reached the repository yet.
    assert_eq!(repo.file("main.ledger").unwrap(), STRICT_JOURNAL);
    assert!(repo.commits().is_empty());

    let confirmed = teledger
        .confirm_transaction(&pending.pending_key)
        .await
        .unwrap();
    assert!(confirmed.is_committed());

    let expected = format!(
        "{STRICT_JOURNAL}\n;; tid:2014-11-30 11:45:26.371 Sun\n;; valid\n2014-11-30 * My tr\n    Assets:Cash  -10,00 EUR\n    Food  10,00 EUR\n"
    );
    assert_eq!(repo.file("main.ledger").unwrap(), expected);

    // A second confirmation finds nothing pending.
    let err = teledger
        .confirm_transaction(&pending.pending_key)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("missing pending transaction"));

    // Deleting by the same key restores the journal byte for byte.
    teledger
        .delete_transaction(&pending.pending_key)
        .await
        .unwrap();
    assert_eq!(repo.file("main.ledger").unwrap(), STRICT_JOURNAL);

    let err = teledger.delete_transaction("unknowntrr").await.err().unwrap();
    assert!(err.to_string().contains("no transaction with id"));
    assert_eq!(repo.file("main.ledger").unwrap(), STRICT_JOURNAL);
}

#[tokio::test]
async fn test_generator_retry_until_known_accounts() {
    if !ledger_available() {
        eprintln!("skipping: ledger binary not on PATH");
        return;
    }

    let repo = MockRepository::with_files([
        (
            "main.ledger",
            "
account Food
account Assets:Cash
account Equity
commodity EUR
commodity USD

2024-02-13 * Test
  Assets:Cash  100.00 EUR
  Equity
",
        ),
        ("teledger.yaml", STRICT_CONFIG),
    ]);

    // Attempt one uses an undeclared account; strict mode rejects it.
    let generator = MockGenerator::new()
        .with_transaction(transaction("20 Taco Bell", &[("cash", -20.0), ("taxi", 20.0)]))
        .with_transaction(transaction(
            "20 Taco Bell",
            &[("Assets:Cash", -20.0), ("Food", 20.0)],
        ));
    let shared: Arc<dyn TransactionGenerator> = Arc::new(generator.clone());
    let teledger = service(&repo, Some(shared));

    let pending = teledger.propose_transaction("20 Taco Bell").await;
    assert!(pending.response.error.is_none(), "{:?}", pending.response.error);
    assert_eq!(pending.response.attempt_number, 2);
    assert!(pending.response.generated_transaction.is_some());
    assert!(!pending.response.committed);
    assert!(!pending.pending_key.is_empty());

    assert_eq!(generator.call_count(), 2);
    let recorded = generator.recorded_contexts();
    assert_eq!(recorded[0].user_input, "20 Taco Bell");
    assert_eq!(recorded[0].accounts, vec!["Food", "Assets:Cash", "Equity"]);
    assert_eq!(recorded[0].commodities, vec!["EUR", "USD"]);
}

#[tokio::test]
async fn test_valid_input_commits_without_generator_call() {
    if !ledger_available() {
        eprintln!("skipping: ledger binary not on PATH");
        return;
    }

    let repo = MockRepository::with_files([
        ("main.ledger", STRICT_JOURNAL),
        ("teledger.yaml", STRICT_CONFIG),
    ]);
    let generator = MockGenerator::new();
    let shared: Arc<dyn TransactionGenerator> = Arc::new(generator.clone());
    let teledger = service(&repo, Some(shared));

    let pending = teledger
        .propose_transaction(
            "2014-11-30 * My tr\n    Assets:Cash  -10,00 EUR\n    Food  10,00 EUR\n",
        )
        .await;

    assert!(pending.response.error.is_none(), "{:?}", pending.response.error);
    assert!(pending.response.committed);
    assert!(pending.pending_key.is_empty());
    assert_eq!(pending.response.attempt_number, 0);
    assert_eq!(generator.call_count(), 0);
    assert_eq!(repo.commits().len(), 1);
}

#[tokio::test]
async fn test_add_comment_appends_wrapped_block() {
    if !ledger_available() {
        eprintln!("skipping: ledger binary not on PATH");
        return;
    }

    let repo = MockRepository::with_files([("main.ledger", STRICT_JOURNAL)]);
    let teledger = service(&repo, None);

    let wrapped = teledger
        .add_comment("This is a comment\n multiline")
        .await
        .unwrap();

    let content = repo.file("main.ledger").unwrap();
    let appended = content.strip_prefix(STRICT_JOURNAL).unwrap();

    // A blank separator, then the wall-clock header, the wrapped comment
    // lines, and an empty transaction template line.
    let lines: Vec<&str> = appended.split('\n').collect();
    assert_eq!(lines[0], "");
    assert!(lines[1].starts_with(";; 2"), "header line: {:?}", lines[1]);
    assert_eq!(lines[2], ";; This is a comment");
    assert_eq!(lines[3], ";;  multiline");
    assert!(lines[4].starts_with(";; ") && lines[4].ends_with(" *"));
    assert_eq!(lines[5], "");

    assert_eq!(wrapped.lines().count(), 4);

    let commits = repo.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "New comment");
    assert_eq!(commits[0].staged, vec!["main.ledger".to_string()]);
}

#[tokio::test]
async fn test_add_comment_rejects_empty_input() {
    let repo = MockRepository::with_files([("main.ledger", STRICT_JOURNAL)]);
    let teledger = service(&repo, None);

    let err = teledger.add_comment("").await.err().unwrap();
    assert!(matches!(err, TeledgerError::EmptyComment));
    assert!(repo.commits().is_empty());
    assert_eq!(repo.file("main.ledger").unwrap(), STRICT_JOURNAL);
}

#[tokio::test]
async fn test_delete_corner_cases() {
    // Deletion never runs the subprocess, so these are exact regardless
    // of the binary being installed.
    let corners = "
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

    let repo = MockRepository::with_files([("main.ledger", corners)]);
    let teledger = service(&repo, None);

    // Transaction in the middle.
    teledger
        .delete_transaction("2014-11-30 11:45:26.111 Sun")
        .await
        .unwrap();
    assert_eq!(
        repo.file("main.ledger").unwrap(),
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

    // Only the first of two identical markers goes.
    teledger
        .delete_transaction("2014-11-30 11:45:26.371 Sun")
        .await
        .unwrap();
    assert_eq!(
        repo.file("main.ledger").unwrap(),
        "
commodity EUR

;; tid:2014-11-30 11:45:26.371 Sun
;; valid
2014-11-30 * My tr
    Assets:Cash  -10,00 EUR
    Food  10,00 EUR
"
    );
}
