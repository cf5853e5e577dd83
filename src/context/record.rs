//! The record of collected provenance facts
//!
//! A `Record` is a plain nested structure of serializable values. Key order
//! is fixed: struct fields are declared alphabetically and every map is a
//! `BTreeMap`, so repeated exports of the same record are byte-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::collect::ToolchainInfo;
use crate::git::GitInfo;

/// Full provenance record held by one [`Context`](crate::Context)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Record {
    /// Process invocation arguments, snapshotted at construction
    #[serde(default)]
    pub argv: Vec<String>,
    /// CPU attribute map; absent when collection is disabled or unavailable
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cpuinfo: Option<BTreeMap<String, Value>>,
    /// User-provided key/value data
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub data: BTreeMap<String, Value>,
    /// Tracked files, exported grouped by category
    #[serde(skip_serializing_if = "FileSet::is_empty", default)]
    pub files: FileSet,
    /// Installed packages as `name==version` lines; absent when never collected
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub packages: Option<Vec<String>>,
    /// OS/architecture descriptor
    #[serde(default)]
    pub platform: String,
    /// Tracked repositories, keyed by the path they were added under
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub repositories: BTreeMap<String, RepoRecord>,
    /// ISO-8601 UTC instants: construction first, explicit re-touches after
    #[serde(default)]
    pub timestamp: Vec<String>,
    /// Compiler toolchain description; absent when rustc cannot be queried
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub toolchain: Option<ToolchainInfo>,
}

/// State of one tracked repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoRecord {
    pub hash: String,
    pub dirty: bool,
    /// Patch of uncommitted changes; `null` when not requested or clean
    pub diff: Option<String>,
    pub version: String,
}

impl From<GitInfo> for RepoRecord {
    fn from(info: GitInfo) -> Self {
        Self {
            hash: info.hash,
            dirty: info.dirty,
            diff: info.diff,
            version: info.version,
        }
    }
}

/// Facts recorded for one tracked file
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    /// User-chosen grouping label ("input", "output", ...)
    pub category: String,
    /// Last modification time, seconds since the Unix epoch
    pub mtime: f64,
    /// SHA-256 hex digest of the file contents
    pub sha256: String,
}

/// Tracked files, keyed internally by path
///
/// One flat path-keyed map is the source of truth, so a path can only ever
/// live in one category; the category-grouped shape is derived when
/// serializing. This avoids keeping two bookkeeping structures in sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    entries: BTreeMap<String, FileEntry>,
}

impl FileSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Insert or replace the entry for `path`. Replacement drops any prior
    /// entry regardless of its category.
    pub fn insert(&mut self, path: String, entry: FileEntry) {
        self.entries.insert(path, entry);
    }

    /// Remove the entry for `path` from whichever category holds it.
    pub fn remove(&mut self, path: &str) -> Option<FileEntry> {
        self.entries.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileEntry)> {
        self.entries.iter()
    }
}

#[derive(Serialize)]
struct FileFactsRef<'a> {
    mtime: f64,
    sha256: &'a str,
}

#[derive(Deserialize)]
struct FileFacts {
    mtime: f64,
    sha256: String,
}

impl Serialize for FileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut grouped: BTreeMap<&str, BTreeMap<&str, FileFactsRef>> = BTreeMap::new();
        for (path, entry) in &self.entries {
            grouped.entry(entry.category.as_str()).or_default().insert(
                path.as_str(),
                FileFactsRef {
                    mtime: entry.mtime,
                    sha256: &entry.sha256,
                },
            );
        }
        grouped.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let grouped: BTreeMap<String, BTreeMap<String, FileFacts>> =
            Deserialize::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (category, files) in grouped {
            for (path, facts) in files {
                entries.insert(
                    path,
                    FileEntry {
                        category: category.clone(),
                        mtime: facts.mtime,
                        sha256: facts.sha256,
                    },
                );
            }
        }
        Ok(FileSet { entries })
    }
}
