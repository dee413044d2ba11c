//! Package manager collaborator
//!
//! The orchestration core depends on the `PackageManager` trait only; this
//! module also ships the reference implementations: a pacman shell-out for
//! real installs and a dry-run variant that logs what it would do.
//!
//! Installation calls block the calling thread for the duration of the
//! underlying operation. Package managers are not safe for concurrent
//! invocation against the same system database, so there is no parallel
//! install path.

use std::process::Command;
use tracing::{info, warn};

use crate::error::{Result, SetupError};

/// External package manager contract.
pub trait PackageManager: Send + Sync {
    /// Install one package at the given target version. Blocking.
    fn install_package(&self, name: &str, version: &str) -> Result<()>;

    /// Query whether a package is present in the local package database.
    fn is_package_installed(&self, name: &str) -> Result<bool>;
}

/// Reject names that could smuggle shell metacharacters into an argv.
///
/// pacman package names are restricted to alphanumerics plus `@ . _ + -`.
fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SetupError::package("package name must not be empty"));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '+' | '-'));
    if !valid {
        return Err(SetupError::package(format!(
            "invalid characters in package name: {}",
            name
        )));
    }
    Ok(())
}

/// Shells out to pacman for installs and queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacmanPackageManager;

impl PacmanPackageManager {
    pub fn new() -> Self {
        Self
    }

    /// Check that the pacman binary is available in PATH.
    pub fn is_available() -> bool {
        Command::new("which")
            .arg("pacman")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl PackageManager for PacmanPackageManager {
    fn install_package(&self, name: &str, version: &str) -> Result<()> {
        validate_package_name(name)?;

        info!("Installing package {} (target version {})", name, version);

        // pacman installs whatever the sync databases carry; the requested
        // version is verified afterwards by the caller if it matters.
        let output = Command::new("pacman")
            .args(["-S", "--noconfirm", "--needed", name])
            .output()
            .map_err(|e| SetupError::package(format!("Failed to run pacman: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SetupError::package(format!(
                "pacman -S {} failed: {}",
                name,
                stderr.trim()
            )));
        }

        info!("Installed package {}", name);
        Ok(())
    }

    fn is_package_installed(&self, name: &str) -> Result<bool> {
        validate_package_name(name)?;

        let output = Command::new("pacman")
            .args(["-Q", name])
            .output()
            .map_err(|e| SetupError::package(format!("Failed to run pacman: {}", e)))?;

        // pacman -Q exits non-zero when the package is not installed
        Ok(output.status.success())
    }
}

/// Dry-run package manager: logs every operation, installs nothing, and
/// reports queried packages as installed so verification passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPackageManager;

impl DryRunPackageManager {
    pub fn new() -> Self {
        Self
    }
}

impl PackageManager for DryRunPackageManager {
    fn install_package(&self, name: &str, version: &str) -> Result<()> {
        validate_package_name(name)?;
        warn!("[dry-run] would install {} (target version {})", name, version);
        Ok(())
    }

    fn is_package_installed(&self, name: &str) -> Result<bool> {
        validate_package_name(name)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_package_name_accepts_pacman_names() {
        assert!(validate_package_name("hyprland").is_ok());
        assert!(validate_package_name("rofi-wayland").is_ok());
        assert!(validate_package_name("lib32-mesa").is_ok());
        assert!(validate_package_name("gtk4+extras_1.0").is_ok());
    }

    #[test]
    fn test_validate_package_name_rejects_metacharacters() {
        assert!(validate_package_name("").is_err());
        assert!(validate_package_name("pkg; rm -rf /").is_err());
        assert!(validate_package_name("pkg|tee").is_err());
        assert!(validate_package_name("pkg$(id)").is_err());
        assert!(validate_package_name("pkg name").is_err());
    }

    #[test]
    fn test_dry_run_never_fails_valid_names() {
        let pm = DryRunPackageManager::new();
        assert!(pm.install_package("hyprland", "0.45.0").is_ok());
        assert!(pm.is_package_installed("hyprland").unwrap());
    }

    #[test]
    fn test_dry_run_still_validates_names() {
        let pm = DryRunPackageManager::new();
        assert!(pm.install_package("bad;name", "1.0").is_err());
    }
}
