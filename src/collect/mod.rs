//! Baseline environment collectors
//!
//! Each collector is a one-shot, blocking query of a local resource (OS
//! descriptors, the `rustc` binary, the system clock). None of them cache
//! anything: a `Context` decides when to call them and stores the results.

use std::collections::BTreeMap;
use std::process::Command;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;

use crate::error::{Error, Result};

/// Toolchain description gathered from `rustc -vV`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolchainInfo {
    /// Compiler binary name, normally "rustc"
    pub implementation: String,
    /// Release version as a tuple of components, e.g. `["1", "85", "0"]`
    pub version: Vec<String>,
    /// Commit hash the compiler was built from
    pub commit_hash: String,
    /// Commit date the compiler was built from
    pub commit_date: String,
    /// Host triple the compiler targets by default
    pub host: String,
    /// Backing LLVM version, when reported
    pub llvm_version: Option<String>,
}

/// Current UTC instant as an ISO-8601 string (microsecond precision, `Z` suffix).
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Human-readable OS/architecture descriptor, e.g.
/// `"Ubuntu 24.04 (kernel 6.8.0, x86_64)"`.
///
/// Always produces something: unknown fields fall back to the compile-time
/// `std::env::consts` values.
pub fn platform_description() -> String {
    let name = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
    let os_version = System::os_version().unwrap_or_else(|| "unknown".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "unknown".to_string());
    format!(
        "{} {} (kernel {}, {})",
        name,
        os_version,
        kernel,
        std::env::consts::ARCH
    )
}

/// Flat CPU attribute map from the running machine.
///
/// Optimized numerical code behaves differently across processors, so the
/// brand, core counts and frequency are worth recording next to results.
pub fn cpu_info() -> Result<BTreeMap<String, Value>> {
    let mut sys = System::new();
    sys.refresh_cpu_all();

    let cpus = sys.cpus();
    let Some(first) = cpus.first() else {
        return Err(Error::CollectorUnavailable {
            collector: "cpuinfo",
            reason: "no CPU reported by the system".to_string(),
        });
    };

    let mut info = BTreeMap::new();
    info.insert("arch".to_string(), Value::from(std::env::consts::ARCH));
    info.insert("brand".to_string(), Value::from(first.brand().trim()));
    info.insert("vendor_id".to_string(), Value::from(first.vendor_id()));
    info.insert("frequency_mhz".to_string(), Value::from(first.frequency()));
    info.insert("logical_cores".to_string(), Value::from(cpus.len()));
    if let Some(physical) = sys.physical_core_count() {
        info.insert("physical_cores".to_string(), Value::from(physical));
    }

    Ok(info)
}

/// Query the installed `rustc` for its version metadata.
///
/// Returns `CollectorUnavailable` when no `rustc` is on the PATH or its
/// output cannot be parsed; construction treats that as non-fatal.
pub fn toolchain_info() -> Result<ToolchainInfo> {
    let rustc = which::which("rustc").map_err(|e| Error::CollectorUnavailable {
        collector: "toolchain",
        reason: e.to_string(),
    })?;

    let output = Command::new(rustc).arg("-vV").output()?;
    if !output.status.success() {
        return Err(Error::CollectorUnavailable {
            collector: "toolchain",
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_rustc_verbose(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the output of `rustc -vV`.
///
/// Format: a banner line (`rustc 1.85.0 (hash date)`) followed by
/// `key: value` lines (`release`, `commit-hash`, `host`, ...).
fn parse_rustc_verbose(output: &str) -> Result<ToolchainInfo> {
    let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
    let mut implementation = "rustc".to_string();

    for (i, line) in output.lines().enumerate() {
        if i == 0 {
            if let Some(name) = line.split_whitespace().next() {
                implementation = name.to_string();
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    let release = fields
        .get("release")
        .copied()
        .ok_or_else(|| Error::CollectorUnavailable {
            collector: "toolchain",
            reason: "missing 'release' in rustc -vV output".to_string(),
        })?;

    Ok(ToolchainInfo {
        implementation,
        version: release.split('.').map(str::to_string).collect(),
        commit_hash: fields.get("commit-hash").copied().unwrap_or("unknown").to_string(),
        commit_date: fields.get("commit-date").copied().unwrap_or("unknown").to_string(),
        host: fields.get("host").copied().unwrap_or("unknown").to_string(),
        llvm_version: fields.get("LLVM version").map(|v| v.to_string()),
    })
}

/// Snapshot of the process's invocation arguments.
///
/// Non-Unicode arguments are converted lossily rather than rejected, so
/// context construction works however the process was launched.
pub fn argv() -> Vec<String> {
    args_lossy(std::env::args_os())
}

fn args_lossy<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = std::ffi::OsString>,
{
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}
