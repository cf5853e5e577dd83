//! Deterministic rendering and file export of a [`Record`]
//!
//! Rendering happens entirely in memory before any byte reaches the
//! destination path, so a serialization failure can never leave a partially
//! written export behind. The file-writing variants return the SHA-256 of
//! the bytes written, which lets callers track the export file itself
//! without reading it back.

use std::path::Path;

use crate::context::Record;
use crate::error::Result;
use crate::util::sha256_bytes;

/// Render the record as pretty-printed JSON with fixed key order.
pub fn to_json(record: &Record) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Render the record as YAML with fixed key order.
pub fn to_yaml(record: &Record) -> Result<String> {
    Ok(serde_yaml::to_string(record)?)
}

/// Render the `packages` section as a requirements list, one
/// `name==version` per line.
///
/// Empty output when packages were never collected; rendering does not
/// trigger collection.
pub fn to_requirements(record: &Record) -> String {
    match &record.packages {
        Some(lines) if !lines.is_empty() => {
            let mut out = lines.join("\n");
            out.push('\n');
            out
        }
        _ => String::new(),
    }
}

/// Write the record as JSON to `path`, returning the SHA-256 of the bytes
/// written.
pub fn write_json(record: &Record, path: &Path) -> Result<String> {
    let rendered = to_json(record)?;
    write_rendered(path, rendered.as_bytes())
}

/// Write the record as YAML to `path`, returning the SHA-256 of the bytes
/// written.
pub fn write_yaml(record: &Record, path: &Path) -> Result<String> {
    let rendered = to_yaml(record)?;
    write_rendered(path, rendered.as_bytes())
}

/// Write the requirements list to `path`, returning the SHA-256 of the bytes
/// written.
pub fn write_requirements(record: &Record, path: &Path) -> Result<String> {
    let rendered = to_requirements(record);
    write_rendered(path, rendered.as_bytes())
}

fn write_rendered(path: &Path, bytes: &[u8]) -> Result<String> {
    std::fs::write(path, bytes)?;
    Ok(sha256_bytes(bytes))
}
