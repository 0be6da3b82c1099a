// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Repository sessions over the remote journal
//!
//! A [`Repository`] hands out exclusive [`Session`]s. A session owns the
//! process-wide session lock, a freshly materialized working tree of the
//! remote, and the set of dirty paths; dropping the session releases all
//! of it. File handles cannot outlive their session, so "not initialized"
//! states are unrepresentable.

use std::io::{Read, Seek, Write};

use async_trait::async_trait;

use crate::error::Result;

pub mod git;
pub mod mock;

pub use git::GitRepository;
pub use mock::{CommitRecord, MockRepository};

/// Source of repository sessions.
///
/// Sessions are serialized: acquiring a second session while another is
/// alive waits until the first one is dropped. The remote history is a
/// single serial object and the working tree is not safe for concurrent
/// writers.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Materialize a fresh working tree of the remote and lock it for
    /// exclusive use until the returned session is dropped.
    async fn session(&self) -> Result<Box<dyn Session>>;
}

/// A live, exclusive working tree of the remote repository.
pub trait Session: Send + Sync {
    /// Open a file read-only. Never marks the path dirty. A missing file
    /// surfaces as an IO error with `ErrorKind::NotFound`.
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>>;

    /// Open a file for appending. Closing the handle marks the path dirty.
    fn open_for_append(&self, path: &str) -> Result<Box<dyn JournalFile>>;

    /// Open a file for reading and writing. Closing the handle marks the
    /// path dirty.
    fn open_file(&self, path: &str) -> Result<Box<dyn JournalFile>>;

    /// Stage every dirty path, commit with the given signature at the
    /// current wall time, and push. On failure the dirty set is left
    /// intact so a retry stages the same paths.
    fn commit_push(&self, message: &str, author_name: &str, author_email: &str) -> Result<()>;
}

/// Writable handle into the session's working tree.
pub trait JournalFile: Read + Write + Seek + Send {
    /// Truncate the file to zero length.
    fn truncate(&mut self) -> Result<()>;

    /// Flush and close the handle, marking its path dirty for the next
    /// commit. Dropping the handle without calling this has the same
    /// effect, minus the flush error reporting.
    fn close(self: Box<Self>) -> Result<()>;
}
