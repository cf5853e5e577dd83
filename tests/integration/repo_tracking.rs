//! Integration tests for repository tracking
//!
//! Exercises `add_repo` policies against real temporary git repositories,
//! plus the stateless `git::info` / `git::is_dirty` accessors.

use super::common::git_fixtures::TestRepo;
use provenance::{git, Context, ContextOptions, Error, RepoOptions};

fn quiet_context() -> Context {
    Context::with_options(ContextOptions {
        collect_cpuinfo: false,
        collect_packages: false,
        manifest_dir: None,
    })
}

#[test]
fn test_add_repo_clean() {
    let repo = TestRepo::new();
    let mut ctx = quiet_context();

    let hash = ctx.add_repo(&repo.path, RepoOptions::default()).unwrap();
    assert_eq!(hash, repo.head());

    let key = repo.path.to_string_lossy().into_owned();
    let entry = &ctx.record().repositories[&key];
    assert_eq!(entry.hash, hash);
    assert!(!entry.dirty);
    assert!(entry.diff.is_none());
    assert!(entry.version.starts_with("git version"));
}

#[test]
fn test_add_repo_dirty_policy() {
    let repo = TestRepo::with_tracked_changes();
    let mut ctx = quiet_context();

    let err = ctx.add_repo(&repo.path, RepoOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DirtyRepository(_)));
    assert!(ctx.record().repositories.is_empty());

    // Relaxing the flag records the repository with dirty: true.
    let opts = RepoOptions {
        allow_dirty: true,
        ..Default::default()
    };
    ctx.add_repo(&repo.path, opts).unwrap();
    let key = repo.path.to_string_lossy().into_owned();
    assert!(ctx.record().repositories[&key].dirty);
}

#[test]
fn test_add_repo_untracked_policy() {
    let repo = TestRepo::with_untracked_file();
    let mut ctx = quiet_context();

    let err = ctx.add_repo(&repo.path, RepoOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UntrackedFiles(_)));

    let opts = RepoOptions {
        allow_untracked: true,
        ..Default::default()
    };
    ctx.add_repo(&repo.path, opts).unwrap();

    // Untracked files alone do not mark the recorded state dirty.
    let key = repo.path.to_string_lossy().into_owned();
    assert!(!ctx.record().repositories[&key].dirty);
}

#[test]
fn test_add_repo_records_diff() {
    let repo = TestRepo::with_tracked_changes();
    let mut ctx = quiet_context();

    let opts = RepoOptions {
        allow_dirty: true,
        diff: true,
        ..Default::default()
    };
    ctx.add_repo(&repo.path, opts).unwrap();

    let key = repo.path.to_string_lossy().into_owned();
    let diff = ctx.record().repositories[&key].diff.as_ref().unwrap();
    assert!(diff.contains("README.md"));
    assert!(diff.contains("# Modified"));
}

#[test]
fn test_add_repo_overwrites_on_readd() {
    let repo = TestRepo::new();
    let mut ctx = quiet_context();

    let first = ctx.add_repo(&repo.path, RepoOptions::default()).unwrap();

    std::fs::write(repo.path.join("next.txt"), "more\n").unwrap();
    repo.commit_all("Second commit");

    let second = ctx.add_repo(&repo.path, RepoOptions::default()).unwrap();
    assert_ne!(first, second);

    assert_eq!(ctx.record().repositories.len(), 1);
    let key = repo.path.to_string_lossy().into_owned();
    assert_eq!(ctx.record().repositories[&key].hash, second);
}

#[test]
fn test_stateless_git_info() {
    let repo = TestRepo::new();

    let info = git::info(&repo.path, false).unwrap();
    assert_eq!(info.hash, repo.head());
    assert!(!info.dirty);
    assert!(info.diff.is_none());

    assert!(!git::is_dirty(&repo.path, false).unwrap());
}

#[test]
fn test_stateless_git_dirty_untracked_policy() {
    let repo = TestRepo::with_untracked_file();

    assert!(git::is_dirty(&repo.path, false).unwrap());
    assert!(!git::is_dirty(&repo.path, true).unwrap());
}

#[test]
fn test_git_info_not_a_repository() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = git::info(dir.path(), false).unwrap_err();
    assert!(matches!(err, Error::NotARepository(_)));
}
