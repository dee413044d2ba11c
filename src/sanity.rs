//! Pre-flight sanity checks for the runtime environment
//!
//! Verifies the host before a real (non-dry-run) installation starts:
//! - required runtime binaries are present
//! - running with root privileges (package installation needs them)
//!
//! Dry runs skip the root requirement since nothing is mutated.

use std::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SetupError};

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Required runtime binaries for installation
const REQUIRED_BINARIES: &[&str] = &[
    "pacman", // Package installation
    "df",     // Disk space capture (coreutils)
];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if running as root (EUID 0), via `id -u`
fn is_running_as_root() -> bool {
    Command::new("id")
        .arg("-u")
        .output()
        .ok()
        .and_then(|output| {
            String::from_utf8_lossy(&output.stdout)
                .trim()
                .parse::<u32>()
                .ok()
        })
        .map(|uid| uid == 0)
        .unwrap_or(false)
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> SanityCheckResult {
    let mut missing = Vec::new();

    for binary in REQUIRED_BINARIES {
        if !binary_exists(binary) {
            missing.push((*binary).to_string());
        }
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Verify the environment before a run; dry runs only need the binaries.
pub fn run_preflight_checks(dry_run: bool) -> Result<()> {
    debug!("Running pre-flight sanity checks (dry_run={})...", dry_run);

    let result = verify_environment();

    if !result.missing_binaries.is_empty() {
        return Err(SetupError::general(format!(
            "missing required binaries: {} (install them and retry)",
            result.missing_binaries.join(", ")
        )));
    }

    if !dry_run && !result.is_root {
        return Err(SetupError::general(
            "root privileges required to install packages (run with sudo, or use --dry-run)",
        ));
    }

    info!("Pre-flight checks passed");
    Ok(())
}
