// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Transaction model and journal formatting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One leg of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Account the amount is posted to.
    pub account: String,
    /// Posted amount; legs of a transaction sum to zero.
    pub amount: f64,
    /// Currency of the amount.
    pub currency: String,
}

/// A single double-entry transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Calendar date as produced by the generator, for display only.
    pub date: String,
    /// Short description, becomes the payee line.
    pub description: String,
    /// At least two postings.
    pub postings: Vec<Posting>,
    /// Free-form user input that led to this transaction.
    pub comment: String,
    /// Timestamp the transaction was proposed at; doubles as its
    /// pending-id and `tid` marker.
    pub real_date_time: DateTime<Utc>,
}

impl Transaction {
    /// Render the transaction in journal syntax. With `with_comment` the
    /// user input is prepended as `;; ` comment lines.
    pub fn render(&self, with_comment: bool) -> String {
        let mut out = String::new();
        if with_comment {
            out.push_str(&wrap_into_comment(&self.comment));
            out.push('\n');
        }
        out.push_str(&format!(
            "{} * {}\n",
            self.real_date_time.format("%Y-%m-%d"),
            self.description
        ));
        for posting in &self.postings {
            out.push_str(&format!(
                "    {}  {} {}\n",
                posting.account,
                format_amount(posting.amount),
                posting.currency
            ));
        }
        out
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Format an amount with dot-grouped thousands, a comma decimal separator
/// and two fraction digits: `-10` becomes `-10,00`, `1234.5` becomes
/// `1.234,50`.
pub fn format_amount(amount: f64) -> String {
    let negative = amount.is_sign_negative() && amount != 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{frac:02}")
}

/// Turn free-form text into journal comment lines: empty lines are
/// dropped, every other line is prefixed with `;; `.
pub fn wrap_into_comment(text: &str) -> String {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| format!(";; {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
