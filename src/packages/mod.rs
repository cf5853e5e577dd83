//! Installed-dependency enumeration via `cargo metadata`
//!
//! The cargo rendition of a package freeze: every crate in the dependency
//! graph is reported as a `name==version` line, and path dependencies (crates
//! installed from local source) double as repositories worth tracking.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};

/// One package from the resolved dependency graph
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
    /// Registry or git source; `None` for local path dependencies
    pub source: Option<String>,
    pub manifest_path: PathBuf,
}

impl Package {
    /// Whether this package is built from local source (a path dependency).
    pub fn is_editable(&self) -> bool {
        self.source.is_none()
    }

    /// Directory containing the package's manifest.
    pub fn root_dir(&self) -> PathBuf {
        self.manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.manifest_path.clone())
    }
}

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<Package>,
}

/// Enumerate the full dependency graph of the project at `dir`.
///
/// Runs `cargo metadata --format-version 1`; fails with
/// `CollectorUnavailable` when cargo is missing or `dir` is not a cargo
/// project, so construction can degrade by omitting the section.
pub fn installed_packages(dir: &Path) -> Result<Vec<Package>> {
    let cargo = which::which("cargo").map_err(|e| Error::CollectorUnavailable {
        collector: "packages",
        reason: e.to_string(),
    })?;

    let output = Command::new(cargo)
        .args(["metadata", "--format-version", "1"])
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(Error::CollectorUnavailable {
            collector: "packages",
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_metadata(&String::from_utf8_lossy(&output.stdout))
}

fn parse_metadata(json: &str) -> Result<Vec<Package>> {
    let metadata: Metadata =
        serde_json::from_str(json).map_err(|e| Error::CollectorUnavailable {
            collector: "packages",
            reason: format!("unparseable cargo metadata output: {}", e),
        })?;
    Ok(metadata.packages)
}

/// Render packages as sorted `name==version` requirement lines.
pub fn requirement_lines(packages: &[Package]) -> Vec<String> {
    let mut lines: Vec<String> = packages
        .iter()
        .map(|p| format!("{}=={}", p.name, p.version))
        .collect();
    lines.sort();
    lines.dedup();
    lines
}

/// Root directories of all path dependencies of the project at `dir`.
///
/// Does not mutate anything; `add_editable_repos` feeds these paths to
/// `add_repo`.
pub fn find_editable_repos(dir: &Path) -> Result<Vec<PathBuf>> {
    let packages = installed_packages(dir)?;
    let mut roots: Vec<PathBuf> = packages
        .iter()
        .filter(|p| p.is_editable())
        .map(Package::root_dir)
        .collect();
    roots.sort();
    roots.dedup();
    Ok(roots)
}
