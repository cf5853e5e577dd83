//! Crate-wide error type

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("repository '{0}' has uncommitted changes")]
    DirtyRepository(PathBuf),
    #[error("repository '{0}' has untracked files")]
    UntrackedFiles(PathBuf),
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("file '{path}' is already tracked under category '{category}'")]
    AlreadyTracked { path: PathBuf, category: String },
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),
    #[error("git command failed: {0}")]
    GitCommandFailed(String),
    #[error("{collector} collector unavailable: {reason}")]
    CollectorUnavailable {
        collector: &'static str,
        reason: String,
    },
    #[error("failed to serialize record to JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to serialize record to YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error is a policy violation that a caller can recover from
    /// by retrying with relaxed flags.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Error::DirtyRepository(_) | Error::UntrackedFiles(_) | Error::AlreadyTracked { .. }
        )
    }
}
