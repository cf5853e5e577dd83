//! The provenance-gathering context

mod record;

pub use record::{FileEntry, FileSet, Record, RepoRecord};

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::{collect, export, git, packages, util};

/// Category used when `add_file` is called without one
pub const DEFAULT_CATEGORY: &str = "";

/// Construction-time configuration for a [`Context`]
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Query CPU attributes at construction
    pub collect_cpuinfo: bool,
    /// Enumerate installed packages at construction
    pub collect_packages: bool,
    /// Directory whose cargo project is enumerated for packages and editable
    /// repositories; the current directory when `None`
    pub manifest_dir: Option<PathBuf>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            collect_cpuinfo: true,
            collect_packages: true,
            manifest_dir: None,
        }
    }
}

/// Policy flags for `add_repo`
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoOptions {
    /// Accept uncommitted changes to tracked files
    pub allow_dirty: bool,
    /// Accept untracked files in the working tree
    pub allow_untracked: bool,
    /// Record the patch of uncommitted changes alongside the revision
    pub diff: bool,
}

/// Outcome of `add_editable_repos`: successes and failures are both kept so
/// one broken repository does not hide the others.
#[derive(Debug, Default)]
pub struct EditableReposReport {
    /// Repositories added, with the revision recorded for each
    pub added: Vec<(PathBuf, String)>,
    /// Repositories that could not be added, with the error for each
    pub failed: Vec<(PathBuf, Error)>,
}

impl EditableReposReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Gathers provenance facts — environment, repositories, file hashes, user
/// data — into a [`Record`] and exports it deterministically.
///
/// A `Context` is created once, mutated as the surrounding program runs, and
/// exported zero or more times. It owns its record exclusively; callers that
/// share one across threads must serialize access themselves.
#[derive(Debug)]
pub struct Context {
    options: ContextOptions,
    record: Record,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with default options (all collectors enabled).
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create a context with explicit options.
    ///
    /// `platform`, `toolchain`, `argv` and the first `timestamp` are always
    /// collected; `cpuinfo` and `packages` follow the flags. A collector that
    /// cannot run leaves its section absent rather than failing construction.
    pub fn with_options(options: ContextOptions) -> Self {
        let record = Self::collect_baseline(&options);
        Self { options, record }
    }

    fn collect_baseline(options: &ContextOptions) -> Record {
        let mut record = Record {
            argv: collect::argv(),
            platform: collect::platform_description(),
            timestamp: vec![collect::timestamp()],
            ..Default::default()
        };

        match collect::toolchain_info() {
            Ok(info) => record.toolchain = Some(info),
            Err(e) => tracing::warn!(error = %e, "Toolchain collector unavailable"),
        }

        if options.collect_cpuinfo {
            match collect::cpu_info() {
                Ok(info) => record.cpuinfo = Some(info),
                Err(e) => tracing::warn!(error = %e, "CPU info collector unavailable"),
            }
        }

        if options.collect_packages {
            let dir = Self::manifest_dir_of(options);
            match packages::installed_packages(&dir) {
                Ok(pkgs) => record.packages = Some(packages::requirement_lines(&pkgs)),
                Err(e) => tracing::warn!(error = %e, "Package collector unavailable"),
            }
        }

        record
    }

    fn manifest_dir_of(options: &ContextOptions) -> PathBuf {
        options
            .manifest_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn manifest_dir(&self) -> PathBuf {
        Self::manifest_dir_of(&self.options)
    }

    /// Discard all gathered data and re-collect the construction baseline
    /// under the same options.
    pub fn reset(&mut self) {
        self.record = Self::collect_baseline(&self.options);
    }

    /// Read access to the record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Full mutable access to the record, e.g. to drop the `cpuinfo` section
    /// after the fact.
    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    /// Append a fresh timestamp to the record and return it.
    pub fn touch(&mut self) -> String {
        let ts = collect::timestamp();
        self.record.timestamp.push(ts.clone());
        ts
    }

    // -- User data --------------------------------------------------------

    /// Insert or overwrite `data[key]`, returning the value unchanged so the
    /// call can be inlined: `let n = ctx.add_data("n", compute())?;`.
    pub fn add_data<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<T> {
        let serialized = serde_json::to_value(&value)?;
        self.record.data.insert(key.into(), serialized);
        Ok(value)
    }

    /// Record a serializable snapshot of a random-number generator's state
    /// under `data[name]`, together with the capture time.
    ///
    /// Pass the generator's state or seed, not a live handle; anything stored
    /// here must be enough to replay the run bit-for-bit.
    pub fn add_random_state<S: Serialize>(
        &mut self,
        name: impl Into<String>,
        state: &S,
    ) -> Result<()> {
        let snapshot = json!({
            "state": serde_json::to_value(state)?,
            "timestamp": collect::timestamp(),
        });
        self.record.data.insert(name.into(), snapshot);
        Ok(())
    }

    // -- Files ------------------------------------------------------------

    /// Hash the file at `path` and record it under `category`.
    ///
    /// A path lives in at most one category: re-adding under a different
    /// category moves the entry. With `overwrite` set, re-adding under the
    /// same category refreshes the hash and mtime unconditionally; without
    /// it, an existing same-category entry fails with `AlreadyTracked`.
    /// Returns the SHA-256 hex digest.
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        category: Option<&str>,
        overwrite: bool,
    ) -> Result<String> {
        let path = path.as_ref();
        let category = category.unwrap_or(DEFAULT_CATEGORY);
        let key = path.to_string_lossy().into_owned();

        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        if !overwrite {
            if let Some(existing) = self.record.files.get(&key) {
                if existing.category == category {
                    return Err(Error::AlreadyTracked {
                        path: path.to_path_buf(),
                        category: category.to_string(),
                    });
                }
            }
        }

        let sha256 = util::sha256_file(path)?;
        let mtime = file_mtime(path)?;

        self.record.files.insert(
            key,
            FileEntry {
                category: category.to_string(),
                mtime,
                sha256: sha256.clone(),
            },
        );

        Ok(sha256)
    }

    /// Remove `path` from whichever category currently holds it. Idempotent:
    /// untracked paths are a no-op.
    pub fn untrack_file(&mut self, path: impl AsRef<Path>) {
        let key = path.as_ref().to_string_lossy().into_owned();
        self.record.files.remove(&key);
    }

    // -- Repositories -----------------------------------------------------

    /// Query git for the repository at `path` and record its state, keyed by
    /// the path as given. Re-adding the same path overwrites its entry.
    /// Returns the recorded revision hash.
    pub fn add_repo(&mut self, path: impl AsRef<Path>, opts: RepoOptions) -> Result<String> {
        let path = path.as_ref();
        let status = git::status(path)?;

        if !opts.allow_dirty && !status.changed.is_empty() {
            return Err(Error::DirtyRepository(path.to_path_buf()));
        }
        if !opts.allow_untracked && !status.untracked.is_empty() {
            return Err(Error::UntrackedFiles(path.to_path_buf()));
        }

        let info = git::info(path, opts.diff)?;
        let hash = info.hash.clone();
        self.record
            .repositories
            .insert(path.to_string_lossy().into_owned(), RepoRecord::from(info));
        Ok(hash)
    }

    // -- Packages ---------------------------------------------------------

    /// Re-enumerate the dependency graph and replace the `packages` section.
    /// Returns the requirement lines.
    pub fn add_packages(&mut self) -> Result<Vec<String>> {
        let pkgs = packages::installed_packages(&self.manifest_dir())?;
        let lines = packages::requirement_lines(&pkgs);
        self.record.packages = Some(lines.clone());
        Ok(lines)
    }

    /// Root directories of path dependencies of the configured project.
    /// Inspects only; the record is not touched.
    pub fn find_editable_repos(&self) -> Result<Vec<PathBuf>> {
        packages::find_editable_repos(&self.manifest_dir())
    }

    /// Track every path dependency as a repository via `add_repo`.
    ///
    /// Individual failures (not a repository, dirty under the given policy)
    /// do not abort the scan; they are reported collectively in the returned
    /// [`EditableReposReport`].
    pub fn add_editable_repos(&mut self, opts: RepoOptions) -> Result<EditableReposReport> {
        let mut report = EditableReposReport::default();
        for repo_path in self.find_editable_repos()? {
            match self.add_repo(&repo_path, opts) {
                Ok(hash) => report.added.push((repo_path, hash)),
                Err(e) => {
                    tracing::debug!(path = %repo_path.display(), error = %e,
                        "Skipping editable repository");
                    report.failed.push((repo_path, e));
                }
            }
        }
        Ok(report)
    }

    // -- Export -----------------------------------------------------------

    /// Render the record as pretty-printed JSON.
    pub fn json(&self) -> Result<String> {
        export::to_json(&self.record)
    }

    /// Render the record as YAML.
    pub fn yaml(&self) -> Result<String> {
        export::to_yaml(&self.record)
    }

    /// Render the `packages` section, one `name==version` per line. Empty
    /// output when packages were never collected.
    pub fn requirements(&self) -> String {
        export::to_requirements(&self.record)
    }

    /// Write the record as JSON to `path`; returns the SHA-256 of the bytes
    /// written so the export file can itself be tracked.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<String> {
        export::write_json(&self.record, path.as_ref())
    }

    /// Write the record as YAML to `path`; returns the SHA-256 of the bytes
    /// written.
    pub fn export_yaml(&self, path: impl AsRef<Path>) -> Result<String> {
        export::write_yaml(&self.record, path.as_ref())
    }

    /// Write the `packages` section to `path` as a requirements list; returns
    /// the SHA-256 of the bytes written.
    pub fn export_requirements(&self, path: impl AsRef<Path>) -> Result<String> {
        export::write_requirements(&self.record, path.as_ref())
    }
}

fn file_mtime(path: &Path) -> Result<f64> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}
