// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Include resolution for journal files
//!
//! Journals reference sub-files with `include <path>` directives. The
//! walker streams the root file line by line, splicing the expanded
//! content of each include in place, so the full expansion is never
//! buffered. The same walker feeds both the `ledger` subprocess and the
//! account/commodity directive scan.

use std::io::Read;

use crate::error::{Result, TeledgerError};
use crate::repo::Session;

/// Maximum include nesting. The include graph is assumed acyclic; a cycle
/// shows up as depth overflow and kills the stream.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Streaming iterator over the logical journal of a session.
///
/// Yields one line at a time, with include directives replaced by the
/// lines of the referenced file. An include that cannot be opened is
/// emitted verbatim so the downstream tool reports the problem.
pub struct IncludeWalker<'a> {
    session: &'a dyn Session,
    stack: Vec<std::vec::IntoIter<String>>,
    failed: bool,
}

impl<'a> IncludeWalker<'a> {
    /// Start walking from the given root file.
    pub fn new(session: &'a dyn Session, root: &str) -> Result<Self> {
        let lines = read_lines(session, root)?;
        Ok(Self {
            session,
            stack: vec![lines],
            failed: false,
        })
    }
}

fn read_lines(session: &dyn Session, path: &str) -> Result<std::vec::IntoIter<String>> {
    let mut reader = session.open(path)?;
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    Ok(lines.into_iter())
}

/// The path of an `include <path>` directive, if the line is one.
fn include_path(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("include")?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

impl Iterator for IncludeWalker<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = loop {
                let top = self.stack.last_mut()?;
                match top.next() {
                    Some(line) => break line,
                    None => {
                        self.stack.pop();
                    }
                }
            };

            if let Some(path) = include_path(&line) {
                if self.stack.len() >= MAX_INCLUDE_DEPTH {
                    self.failed = true;
                    return Some(Err(TeledgerError::Include(format!(
                        "include depth limit of {MAX_INCLUDE_DEPTH} exceeded at '{path}'"
                    ))));
                }
                match read_lines(self.session, path) {
                    Ok(lines) => {
                        self.stack.push(lines);
                        continue;
                    }
                    Err(err) => {
                        // Emit the line as is so ledger reports the error
                        // if it really was an include.
                        tracing::warn!(file = path, error = %err, "unable to open include file");
                        return Some(Ok(line));
                    }
                }
            }

            return Some(Ok(line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{MockRepository, Repository};

    async fn expand(repo: &MockRepository, root: &str) -> Result<String> {
        let session = repo.session().await.unwrap();
        let walker = IncludeWalker::new(session.as_ref(), root)?;
        let mut out = String::new();
        for line in walker {
            out.push_str(&line?);
            out.push('\n');
        }
        Ok(out)
    }

    #[test]
    fn test_include_path_detection() {
        assert_eq!(include_path("include accounts.ledger"), Some("accounts.ledger"));
        assert_eq!(include_path("  include accounts.ledger  "), Some("accounts.ledger"));
        assert_eq!(include_path("include"), None);
        assert_eq!(include_path("includes.ledger"), None);
        assert_eq!(include_path("2024-02-13 * Test"), None);
    }

    #[tokio::test]
    async fn test_nested_includes() {
        let repo = MockRepository::with_files([
            ("main.ledger", "include accounts.ledger\ntrx\n"),
            ("accounts.ledger", "account Assets:Cash\ninclude commodities.ledger\n"),
            ("commodities.ledger", "commodity EUR\n"),
        ]);

        let out = expand(&repo, "main.ledger").await.unwrap();
        assert_eq!(out, "account Assets:Cash\ncommodity EUR\ntrx\n");
    }

    #[tokio::test]
    async fn test_duplicate_include_expands_twice() {
        let repo = MockRepository::with_files([
            ("main.ledger", "include accounts.ledger\ninclude accounts.ledger\n"),
            ("accounts.ledger", "account Equity\n"),
        ]);

        let out = expand(&repo, "main.ledger").await.unwrap();
        assert_eq!(out, "account Equity\naccount Equity\n");
    }

    #[tokio::test]
    async fn test_missing_include_is_emitted_verbatim() {
        let repo = MockRepository::with_files([(
            "main.ledger",
            "include missing.ledger\naccount Equity\n",
        )]);

        let out = expand(&repo, "main.ledger").await.unwrap();
        assert_eq!(out, "include missing.ledger\naccount Equity\n");
    }

    #[tokio::test]
    async fn test_cycle_hits_depth_cap() {
        let repo = MockRepository::with_files([("main.ledger", "include main.ledger\n")]);

        let err = expand(&repo, "main.ledger").await.err().unwrap();
        assert!(matches!(err, TeledgerError::Include(_)));
        assert!(err.to_string().contains("depth limit"));
    }

    #[tokio::test]
    async fn test_missing_root_fails() {
        let repo = MockRepository::with_files([("other.ledger", "")]);
        let session = repo.session().await.unwrap();
        assert!(IncludeWalker::new(session.as_ref(), "main.ledger").is_err());
    }
}
