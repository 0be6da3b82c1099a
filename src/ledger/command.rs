// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Subprocess contract for the external `ledger` tool
//!
//! Every invocation reads the journal from stdin (`-f -`), runs with an
//! empty environment inside a throwaway working directory, and captures
//! stdout and stderr separately. The include walker feeds stdin while the
//! child runs, so producer and consumer progress concurrently.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Result, TeledgerError};
use crate::ledger::includes::IncludeWalker;
use crate::repo::Session;

/// Name of the external binary, resolved through `PATH`.
pub const LEDGER_BINARY: &str = "ledger";

/// Run the `ledger` tool over the resolved journal of `main_file`.
///
/// `additional` is spliced after the journal on stdin; it lets a caller
/// validate a candidate transaction without writing it to the tree.
/// Strict mode adds `--pedantic`, which rejects undeclared accounts and
/// commodities.
pub async fn run_ledger(
    session: &dyn Session,
    main_file: &str,
    strict: bool,
    additional: Option<&str>,
    args: &[&str],
) -> Result<String> {
    let mut walker = IncludeWalker::new(session, main_file)?;

    // The directory exists only so the child never sees a real one; it is
    // removed again on every return path.
    let scratch = tempfile::tempdir()?;

    let mut cmd = Command::new(LEDGER_BINARY);
    cmd.arg("-f").arg("-");
    if strict {
        cmd.arg("--pedantic");
    }
    cmd.args(args);
    cmd.env_clear();
    cmd.current_dir(scratch.path());
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| TeledgerError::SubprocessSpawn(e.to_string()))?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| TeledgerError::SubprocessSpawn("stdin was not captured".to_string()))?;

    let feed = async {
        let mut res: Result<()> = Ok(());
        for line in &mut walker {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    res = Err(err);
                    break;
                }
            };
            let mut buf = line.into_bytes();
            buf.push(b'\n');
            if let Err(err) = stdin.write_all(&buf).await {
                // A consumer that exits early closes the pipe; the exit
                // status carries the story.
                if err.kind() != std::io::ErrorKind::BrokenPipe {
                    res = Err(err.into());
                }
                break;
            }
        }
        if res.is_ok() {
            if let Some(extra) = additional {
                if let Err(err) = stdin.write_all(extra.as_bytes()).await {
                    if err.kind() != std::io::ErrorKind::BrokenPipe {
                        res = Err(err.into());
                    }
                }
            }
        }
        drop(stdin);
        res
    };

    let (feed_res, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;

    if !output.status.success() {
        return Err(TeledgerError::SubprocessExit {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    feed_res?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.is_empty() {
        return Err(TeledgerError::EmptyResult);
    }
    Ok(stdout)
}
