//! Stateless git queries over the `git` binary
//!
//! Every function here shells out to `git` and parses its output; nothing in
//! this module touches a [`Context`](crate::Context). `add_repo` composes
//! these queries with its dirty/untracked policy checks.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot of a repository's state as returned by [`info`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitInfo {
    /// HEAD commit hash
    pub hash: String,
    /// Whether tracked files carry uncommitted changes
    pub dirty: bool,
    /// Patch of uncommitted changes, when requested and present
    pub diff: Option<String>,
    /// Version string of the git binary used for the query
    pub version: String,
}

/// Working-tree status, split into tracked changes and untracked paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    /// Paths with staged or unstaged modifications to tracked files
    pub changed: Vec<String>,
    /// Paths git knows nothing about
    pub untracked: Vec<String>,
}

impl GitStatus {
    /// Whether the repository counts as dirty under the given policy.
    pub fn is_dirty(&self, allow_untracked: bool) -> bool {
        !self.changed.is_empty() || (!allow_untracked && !self.untracked.is_empty())
    }

    /// Parse `git status --porcelain` output.
    ///
    /// Untracked entries are flagged `??`; everything else is a change to a
    /// tracked file (modified, added, deleted, renamed...).
    fn parse_porcelain(output: &str) -> Self {
        let mut status = GitStatus::default();
        for line in output.lines() {
            if line.len() < 4 {
                continue;
            }
            let (flags, path) = line.split_at(3);
            if flags.starts_with("??") {
                status.untracked.push(path.to_string());
            } else {
                status.changed.push(path.to_string());
            }
        }
        status
    }
}

/// Retrieve revision, dirty state, git version and (optionally) the diff of
/// uncommitted changes for the repository at `path`.
///
/// The recorded `dirty` flag and the diff consider tracked files only;
/// untracked files are a policy concern handled by callers via [`status`].
pub fn info(path: &Path, diff: bool) -> Result<GitInfo> {
    ensure_repo(path)?;

    let hash = run_git(path, &["rev-parse", "HEAD"])?.trim().to_string();
    let status = status(path)?;
    let dirty = !status.changed.is_empty();

    let patch = if diff && dirty {
        Some(run_git(path, &["diff", "HEAD"])?)
    } else {
        None
    };

    Ok(GitInfo {
        hash,
        dirty,
        diff: patch,
        version: version()?,
    })
}

/// Return true if the repository at `path` is dirty.
///
/// With `allow_untracked` set, only uncommitted changes to tracked files
/// count; otherwise any untracked file makes the repository dirty.
pub fn is_dirty(path: &Path, allow_untracked: bool) -> Result<bool> {
    Ok(status(path)?.is_dirty(allow_untracked))
}

/// Working-tree status of the repository at `path`.
pub fn status(path: &Path) -> Result<GitStatus> {
    ensure_repo(path)?;
    let output = run_git(path, &["status", "--porcelain"])?;
    Ok(GitStatus::parse_porcelain(&output))
}

/// Version string of the git binary, e.g. `"git version 2.43.0"`.
pub fn version() -> Result<String> {
    let output = Command::new(git_binary()?).arg("--version").output()?;
    if !output.status.success() {
        return Err(Error::GitCommandFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Validate that `path` exists and lives inside a git repository.
fn ensure_repo(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let output = Command::new(git_binary()?)
        .args(["rev-parse", "--git-dir"])
        .current_dir(path)
        .output()?;
    if !output.status.success() {
        return Err(Error::NotARepository(path.to_path_buf()));
    }
    Ok(())
}

fn git_binary() -> Result<PathBuf> {
    which::which("git")
        .map_err(|e| Error::GitCommandFailed(format!("git binary not found: {}", e)))
}

fn run_git(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new(git_binary()?)
        .args(args)
        .current_dir(path)
        .output()?;

    if !output.status.success() {
        return Err(Error::GitCommandFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
