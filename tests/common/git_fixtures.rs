//! Git repository test fixtures
//!
//! Provides utilities for creating temporary git repositories
//! in various states for testing repository tracking.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing
///
/// The repository is automatically cleaned up when the `TestRepo` is
/// dropped. Use the various constructors to create repos in different
/// initial states.
pub struct TestRepo {
    /// TempDir handle (keeps directory alive until dropped)
    _dir: TempDir,
    /// Path to the repository root
    pub path: PathBuf,
}

impl TestRepo {
    /// Create a new test repository with an initial commit
    ///
    /// The repository will have:
    /// - Git initialized
    /// - User configured (test@example.com)
    /// - GPG signing disabled (for CI compatibility)
    /// - A README.md file
    /// - One initial commit
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();

        std::fs::write(path.join("README.md"), "# Test Repository\n").unwrap();
        init_repo_at(&path);

        Self { _dir: dir, path }
    }

    /// Create a repository with uncommitted changes to a tracked file
    pub fn with_tracked_changes() -> Self {
        let repo = Self::new();
        std::fs::write(repo.path.join("README.md"), "# Modified\n").unwrap();
        repo
    }

    /// Create a repository with an untracked file (otherwise clean)
    pub fn with_untracked_file() -> Self {
        let repo = Self::new();
        std::fs::write(repo.path.join("scratch.txt"), "untracked content\n").unwrap();
        repo
    }

    /// The HEAD commit hash of the repository
    pub fn head(&self) -> String {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.path)
            .output()
            .expect("Failed to run git rev-parse");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Commit all pending changes
    pub fn commit_all(&self, message: &str) {
        run_git(&self.path, &["add", "."]);
        run_git(&self.path, &["commit", "-m", message]);
    }
}

/// Turn an existing directory into a git repository with all current
/// contents committed
///
/// Used when the repository's location matters, e.g. a path dependency of a
/// temporary cargo project. `TestRepo` wraps this with its own temp dir.
pub fn init_repo_at(path: &Path) {
    run_git(path, &["init"]);
    run_git(path, &["config", "user.email", "test@example.com"]);
    run_git(path, &["config", "user.name", "Test User"]);
    // Disable GPG signing to ensure tests work on machines with global signing enabled
    run_git(path, &["config", "commit.gpgsign", "false"]);
    run_git(path, &["add", "."]);
    run_git(path, &["commit", "-m", "Initial commit"]);
}

/// Run a git command in `path`, panicking on failure
pub fn run_git(path: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
