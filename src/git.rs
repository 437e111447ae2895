// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Git operations.
//!
//! Everything that talks to a remote goes through the `git` binary, so the
//! user's own credential helpers, SSH agent, and proxy settings apply. The
//! only thing read through libgit2 is the origin URL of an existing working
//! copy.

use crate::{
    command::{CommandError, CommandRunner},
    version::{parse_symbolic_head, parse_tag_listing, TagOrder, FALLBACK_BRANCH},
};

use git2::Repository;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Git binary wrapper.
#[derive(Debug, Clone)]
pub struct Git {
    runner: CommandRunner,
    order: TagOrder,
}

impl Git {
    /// Construct new git wrapper.
    pub fn new(runner: CommandRunner, order: TagOrder) -> Self {
        Self { runner, order }
    }

    /// Access underlying command runner.
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// List tags of remote repository newest first.
    ///
    /// Returns `None` if the remote has no tags at all.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if the remote cannot be listed.
    #[instrument(skip(self), level = "debug")]
    pub fn list_tags(&self, url: &str) -> Result<Option<Vec<String>>> {
        let output = self
            .runner
            .run("git", ["ls-remote", "--tags", "--refs", url], None)?;
        let mut tags = parse_tag_listing(&output.stdout);
        if tags.is_empty() {
            debug!("no tags at {url}");
            return Ok(None);
        }

        self.order.sort(&mut tags);
        Ok(Some(tags))
    }

    /// Latest tag of remote repository, if any.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if the remote cannot be listed.
    pub fn latest_tag(&self, url: &str) -> Result<Option<String>> {
        Ok(self
            .list_tags(url)?
            .and_then(|tags| tags.into_iter().next()))
    }

    /// Default branch of remote repository.
    ///
    /// Falls back to "main" if the remote's symbolic HEAD cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub fn default_branch(&self, url: &str) -> String {
        match self.runner.run("git", ["ls-remote", "--symref", url, "HEAD"], None) {
            Ok(output) => parse_symbolic_head(&output.stdout).unwrap_or_else(|| {
                warn!("cannot determine default branch of {url}, using {FALLBACK_BRANCH}");
                FALLBACK_BRANCH.into()
            }),
            Err(error) => {
                warn!("cannot determine default branch of {url}: {error}");
                FALLBACK_BRANCH.into()
            }
        }
    }

    /// Clone `url` at `version` into `path`.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if git fails.
    #[instrument(skip(self, path), level = "debug")]
    pub fn clone_repo(&self, url: &str, version: &str, path: &Path) -> Result<()> {
        info!("clone {url} at {version} into {}", path.display());
        let target = path.to_string_lossy().into_owned();
        self.runner.run(
            "git",
            ["clone", "--branch", version, url, target.as_str()],
            None,
        )?;
        Ok(())
    }

    /// Fetch all remotes and tags of working copy.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if git fails.
    pub fn fetch_all(&self, path: &Path) -> Result<()> {
        self.runner
            .run("git", ["fetch", "--all", "--tags"], Some(path))?;
        Ok(())
    }

    /// Check out tag or branch in working copy.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if git fails.
    pub fn checkout(&self, path: &Path, version: &str) -> Result<()> {
        self.runner.run("git", ["checkout", version], Some(path))?;
        Ok(())
    }

    /// Pull `version` from origin into working copy.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Command`] if git fails.
    pub fn pull(&self, path: &Path, version: &str) -> Result<()> {
        self.runner
            .run("git", ["pull", "origin", version], Some(path))?;
        Ok(())
    }

    /// Origin URL of working copy.
    ///
    /// # Errors
    ///
    /// - Return [`GitError::Git2`] if the working copy cannot be opened.
    /// - Return [`GitError::NoOrigin`] if there is no usable origin remote.
    pub fn origin_url(&self, path: &Path) -> Result<String> {
        let repository = Repository::open(path)?;
        let remote = repository.find_remote("origin")?;
        remote
            .url()
            .map(ToString::to_string)
            .ok_or_else(|| GitError::NoOrigin {
                path: path.display().to_string(),
            })
    }
}

/// Git operation failures.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The git binary failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Working copy lacks a usable origin remote.
    #[error("working copy {path} has no origin url")]
    NoOrigin { path: String },
}

/// Friendly result alias :3
pub type Result<T, E = GitError> = std::result::Result<T, E>;
