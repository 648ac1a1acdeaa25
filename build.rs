// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=CAMERA_RECORDER_VERSION");

    // Packagers can pin the version string explicitly
    let version = std::env::var("CAMERA_RECORDER_VERSION").unwrap_or_else(|_| describe_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version string from `git describe`, falling back to the crate version.
///
/// - exact tag `v0.1.0` becomes `0.1.0-<hash>`
/// - `v0.1.0-5-gabcdef1` becomes `0.1.0-dirty-abcdef1`
fn describe_version() -> String {
    let crate_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());

    let Some(described) = git(&["describe", "--tags", "--always", "--match", "v*"]) else {
        return crate_version;
    };
    let described = described.strip_prefix('v').unwrap_or(&described).to_string();

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() >= 3 {
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        return format!("{}-dirty-{}", parts[2], hash);
    }

    match git(&["rev-parse", "--short", "HEAD"]) {
        // No tags yet: describe falls back to the bare hash
        Some(hash) if hash == described => format!("{}-{}", crate_version, hash),
        Some(hash) => format!("{}-{}", described, hash),
        None => crate_version,
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
