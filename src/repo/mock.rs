// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock repository for testing
//!
//! Provides an in-memory implementation of the Repository trait that can
//! be used in tests without a remote. Like the git implementation, every
//! session works on its own copy of the tree: writes are visible within
//! the session and thrown away with it, and only `commit_push` publishes
//! the dirty paths back to the shared store. Commits are recorded with
//! the exact set of staged paths.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, TeledgerError};
use crate::repo::{JournalFile, Repository, Session};

/// One recorded `commit_push` call.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    /// Commit message.
    pub message: String,
    /// Author name and email.
    pub author: (String, String),
    /// Paths staged by this commit, sorted.
    pub staged: Vec<String>,
}

/// In-memory repository for tests.
#[derive(Clone, Default)]
pub struct MockRepository {
    files: Arc<StdMutex<HashMap<String, String>>>,
    commits: Arc<StdMutex<Vec<CommitRecord>>>,
    session_lock: Arc<Mutex<()>>,
}

impl MockRepository {
    /// Create a mock repository seeded with the given files.
    pub fn with_files<I, K, V>(files: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            files: Arc::new(StdMutex::new(files)),
            commits: Arc::new(StdMutex::new(Vec::new())),
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current committed content of a file, if present.
    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Every commit recorded so far, in order.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits.lock().unwrap().clone()
    }

    /// Whether the session lock is currently free.
    pub fn session_is_free(&self) -> bool {
        self.session_lock.try_lock().is_ok()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn session(&self) -> Result<Box<dyn Session>> {
        let guard = self.session_lock.clone().lock_owned().await;
        let working = self.files.lock().unwrap().clone();
        Ok(Box::new(MockSession {
            remote: Arc::clone(&self.files),
            working: Arc::new(StdMutex::new(working)),
            commits: Arc::clone(&self.commits),
            dirty: Arc::new(StdMutex::new(HashSet::new())),
            _guard: guard,
        }))
    }
}

struct MockSession {
    remote: Arc<StdMutex<HashMap<String, String>>>,
    working: Arc<StdMutex<HashMap<String, String>>>,
    commits: Arc<StdMutex<Vec<CommitRecord>>>,
    dirty: Arc<StdMutex<HashSet<String>>>,
    _guard: OwnedMutexGuard<()>,
}

impl MockSession {
    fn content(&self, path: &str) -> Result<String> {
        self.working
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| {
                TeledgerError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{path}: file not found"),
                ))
            })
    }

    fn handle(&self, path: &str, append: bool) -> Result<Box<dyn JournalFile>> {
        let content = self.content(path)?;
        let mut buf = Cursor::new(content.into_bytes());
        if append {
            buf.seek(SeekFrom::End(0))?;
        }
        Ok(Box::new(MockFileHandle {
            buf,
            path: path.to_string(),
            working: Arc::clone(&self.working),
            dirty: Arc::clone(&self.dirty),
        }))
    }
}

impl Session for MockSession {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let content = self.content(path)?;
        Ok(Box::new(Cursor::new(content.into_bytes())))
    }

    fn open_for_append(&self, path: &str) -> Result<Box<dyn JournalFile>> {
        self.handle(path, true)
    }

    fn open_file(&self, path: &str) -> Result<Box<dyn JournalFile>> {
        self.handle(path, false)
    }

    fn commit_push(&self, message: &str, author_name: &str, author_email: &str) -> Result<()> {
        let mut staged: Vec<String> = self.dirty.lock().unwrap().drain().collect();
        staged.sort();

        {
            let working = self.working.lock().unwrap();
            let mut remote = self.remote.lock().unwrap();
            for path in &staged {
                if let Some(content) = working.get(path) {
                    remote.insert(path.clone(), content.clone());
                }
            }
        }

        self.commits.lock().unwrap().push(CommitRecord {
            message: message.to_string(),
            author: (author_name.to_string(), author_email.to_string()),
            staged,
        });
        Ok(())
    }
}

struct MockFileHandle {
    buf: Cursor<Vec<u8>>,
    path: String,
    working: Arc<StdMutex<HashMap<String, String>>>,
    dirty: Arc<StdMutex<HashSet<String>>>,
}

impl Read for MockFileHandle {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        self.buf.read(out)
    }
}

impl Write for MockFileHandle {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MockFileHandle {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl JournalFile for MockFileHandle {
    fn truncate(&mut self) -> Result<()> {
        self.buf.get_mut().clear();
        self.buf.set_position(0);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Write-back into the working copy and dirty marking happen in
        // Drop.
        Ok(())
    }
}

impl Drop for MockFileHandle {
    fn drop(&mut self) {
        let content = String::from_utf8_lossy(self.buf.get_ref()).into_owned();
        if let Ok(mut working) = self.working.lock() {
            working.insert(self.path.clone(), content);
        }
        if let Ok(mut dirty) = self.dirty.lock() {
            dirty.insert(self.path.clone());
        }
    }
}
