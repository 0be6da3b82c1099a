// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Git-backed repository sessions
//!
//! Shallow-clones the remote over HTTPS with basic-auth into an ephemeral
//! working tree owned by the session. The tree is discarded when the
//! session drops; only `commit_push` makes changes durable.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks, ResetType, Signature};
use tempfile::TempDir;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Result, TeledgerError};
use crate::repo::{JournalFile, Repository, Session};

/// Username sent alongside the access token for basic-auth.
const BASIC_AUTH_USERNAME: &str = "username";

/// Repository reachable over HTTPS with a fine-grained access token.
pub struct GitRepository {
    url: String,
    token: String,
    branch: Option<String>,
    session_lock: Arc<Mutex<()>>,
}

impl GitRepository {
    /// Create a repository handle. `branch` selects a branch to clone;
    /// `None` follows the remote default.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        branch: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            branch,
            session_lock: Arc::new(Mutex::new(())),
        }
    }

    fn callbacks(token: String) -> RemoteCallbacks<'static> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, _username, _allowed| {
            Cred::userpass_plaintext(BASIC_AUTH_USERNAME, &token)
        });
        callbacks
    }
}

#[async_trait]
impl Repository for GitRepository {
    async fn session(&self) -> Result<Box<dyn Session>> {
        let guard = self.session_lock.clone().lock_owned().await;

        let url = self.url.clone();
        let token = self.token.clone();
        let branch = self.branch.clone();
        let cloned = tokio::task::spawn_blocking(move || clone_shallow(&url, &token, branch))
            .await
            .map_err(|e| TeledgerError::Repository(format!("clone task failed: {e}")))?;

        // The lock guard is moved into the session only once the clone
        // succeeded; every failure path above drops it and releases the
        // lock.
        let (workdir, repo) = cloned?;
        tracing::debug!(url = %self.url, "repository session opened");

        Ok(Box::new(GitSession {
            workdir,
            repo: StdMutex::new(repo),
            dirty: Arc::new(StdMutex::new(HashSet::new())),
            token: self.token.clone(),
            _guard: guard,
        }))
    }
}

fn clone_shallow(
    url: &str,
    token: &str,
    branch: Option<String>,
) -> Result<(TempDir, git2::Repository)> {
    let workdir = tempfile::tempdir()?;

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(GitRepository::callbacks(token.to_string()));
    fetch.depth(1);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);
    if let Some(branch) = branch.as_deref() {
        builder.branch(branch);
    }

    let repo = builder
        .clone(url, workdir.path())
        .map_err(|e| TeledgerError::Repository(format!("unable to clone {url}: {e}")))?;

    Ok((workdir, repo))
}

struct GitSession {
    workdir: TempDir,
    repo: StdMutex<git2::Repository>,
    dirty: Arc<StdMutex<HashSet<String>>>,
    token: String,
    _guard: OwnedMutexGuard<()>,
}

impl GitSession {
    fn tree_path(&self, path: &str) -> PathBuf {
        self.workdir.path().join(path)
    }

    fn open_handle(&self, path: &str, options: &OpenOptions) -> Result<Box<dyn JournalFile>> {
        let file = options.open(self.tree_path(path))?;
        Ok(Box::new(GitFileHandle {
            file,
            path: path.to_string(),
            dirty: Arc::clone(&self.dirty),
        }))
    }

    fn head_refname(repo: &git2::Repository) -> Result<String> {
        let head = repo.head()?;
        head.name()
            .map(str::to_string)
            .ok_or_else(|| TeledgerError::Repository("HEAD is not valid utf-8".to_string()))
    }

    /// Hard-reset the working tree to `oid` and force-push. Used by tests
    /// to undo transient commits; libgit2 has no force-with-lease, plain
    /// force push stands in.
    #[allow(dead_code)]
    fn reset_push(&self, oid: git2::Oid) -> Result<()> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| TeledgerError::Repository("repository lock poisoned".to_string()))?;

        let commit = repo.find_commit(oid)?;
        repo.reset(commit.as_object(), ResetType::Hard, None)?;

        let refname = Self::head_refname(&repo)?;
        let mut remote = repo.find_remote("origin")?;
        let mut options = PushOptions::new();
        options.remote_callbacks(GitRepository::callbacks(self.token.clone()));
        remote.push(&[format!("+{refname}:{refname}")], Some(&mut options))?;
        Ok(())
    }
}

impl Session for GitSession {
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let file = File::open(self.tree_path(path))?;
        Ok(Box::new(file))
    }

    fn open_for_append(&self, path: &str) -> Result<Box<dyn JournalFile>> {
        self.open_handle(path, OpenOptions::new().append(true).read(true))
    }

    fn open_file(&self, path: &str) -> Result<Box<dyn JournalFile>> {
        self.open_handle(path, OpenOptions::new().read(true).write(true))
    }

    fn commit_push(&self, message: &str, author_name: &str, author_email: &str) -> Result<()> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| TeledgerError::Repository("repository lock poisoned".to_string()))?;

        let staged: Vec<String> = {
            let dirty = self
                .dirty
                .lock()
                .map_err(|_| TeledgerError::Repository("dirty set lock poisoned".to_string()))?;
            dirty.iter().cloned().collect()
        };

        let mut index = repo.index()?;
        for path in &staged {
            index.add_path(std::path::Path::new(path))?;
        }
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature = Signature::now(author_name, author_email)?;
        let parent = repo.head()?.peel_to_commit()?;
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        let refname = Self::head_refname(&repo)?;
        let mut remote = repo.find_remote("origin")?;
        let mut options = PushOptions::new();
        options.remote_callbacks(GitRepository::callbacks(self.token.clone()));
        remote.push(&[format!("{refname}:{refname}")], Some(&mut options))?;

        if let Ok(mut dirty) = self.dirty.lock() {
            dirty.clear();
        }
        tracing::debug!(message, staged = staged.len(), "committed and pushed");
        Ok(())
    }
}

struct GitFileHandle {
    file: File,
    path: String,
    dirty: Arc<StdMutex<HashSet<String>>>,
}

impl std::io::Read for GitFileHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl std::io::Write for GitFileHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl std::io::Seek for GitFileHandle {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

impl JournalFile for GitFileHandle {
    fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        use std::io::Write;
        let mut handle = self;
        handle.file.flush()?;
        Ok(())
    }
}

impl Drop for GitFileHandle {
    fn drop(&mut self) {
        if let Ok(mut dirty) = self.dirty.lock() {
            dirty.insert(self.path.clone());
        }
    }
}
