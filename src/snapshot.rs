//! System snapshot capture
//!
//! A `SystemSnapshot` records the state of the host before any mutation:
//! disk space on the target filesystem and the configuration files that
//! already exist for the selected components. It is captured once, at
//! Preparation entry, and immutable afterward; later phases read it to
//! decide what to back up or merge.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{DiskSpace, InstallationConfiguration};
use crate::error::{Result, SetupError};
use crate::resolver;

/// Point-in-time record of disk space and pre-existing configuration paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    backup_dir: PathBuf,
    disk: DiskSpace,
    existing_configs: Vec<PathBuf>,
    captured_at: u64,
}

impl SystemSnapshot {
    /// Assemble a snapshot from already-captured values.
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        disk: DiskSpace,
        existing_configs: Vec<PathBuf>,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            disk,
            existing_configs,
            captured_at: crate::session::unix_now(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn disk(&self) -> &DiskSpace {
        &self.disk
    }

    /// Pre-existing configuration paths found at capture time.
    /// Returns a copy; the internal list is never handed out.
    pub fn existing_configs(&self) -> Vec<PathBuf> {
        self.existing_configs.clone()
    }

    #[inline]
    pub fn captured_at(&self) -> u64 {
        self.captured_at
    }
}

/// Seam for snapshot capture so the orchestrator can be tested without
/// touching the host filesystem.
pub trait SnapshotProvider: Send + Sync {
    /// Capture a snapshot for the given configuration.
    fn capture(&self, config: &InstallationConfiguration) -> Result<SystemSnapshot>;
}

/// Captures real snapshots: scans `~/.config` for the selected components'
/// directories and reads disk usage from `df`.
pub struct FilesystemSnapshotProvider {
    config_root: PathBuf,
    backup_root: PathBuf,
}

impl FilesystemSnapshotProvider {
    /// `config_root` is normally `~/.config`; `backup_root` is where the
    /// configuring phase will place backups (a timestamped subdirectory is
    /// created per session).
    pub fn new(config_root: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
            backup_root: backup_root.into(),
        }
    }

    /// Standard provider rooted at the invoking user's home directory.
    pub fn for_current_user() -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| SetupError::config("HOME is not set; cannot locate ~/.config"))?;
        let home = PathBuf::from(home);
        Ok(Self::new(
            home.join(".config"),
            home.join(".local/state/hyprsetup/backups"),
        ))
    }

    /// Scan for config paths that already exist for the selected components.
    fn scan_existing_configs(&self, config: &InstallationConfiguration) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = config
            .components()
            .iter()
            .map(|selection| self.config_root.join(resolver::config_dir(selection.component())))
            .filter(|path| path.exists())
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

impl SnapshotProvider for FilesystemSnapshotProvider {
    fn capture(&self, config: &InstallationConfiguration) -> Result<SystemSnapshot> {
        let disk = probe_disk_space(config.disk().path())?;
        let existing = self.scan_existing_configs(config);

        tracing::info!(
            "Snapshot captured: {} pre-existing config path(s), {}",
            existing.len(),
            disk
        );

        Ok(SystemSnapshot::new(
            self.backup_root.join(format!("session-{}", crate::session::unix_now())),
            disk,
            existing,
        ))
    }
}

/// Query available/total bytes for the filesystem holding `path` via `df`.
pub fn probe_disk_space(path: &str) -> Result<DiskSpace> {
    let output = Command::new("df")
        .args(["--output=avail,size", "-B1", path])
        .output()
        .map_err(|e| SetupError::general(format!("Failed to run df: {}", e)))?;

    if !output.status.success() {
        return Err(SetupError::general(format!(
            "df failed for {}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_df_output(&stdout, path)
}

/// Parse `df --output=avail,size -B1` output: a header line then one data
/// line with two whitespace-separated byte counts.
fn parse_df_output(stdout: &str, path: &str) -> Result<DiskSpace> {
    let line = stdout
        .lines()
        .nth(1)
        .ok_or_else(|| SetupError::general(format!("df produced no data for {}", path)))?;

    let mut fields = line.split_whitespace();
    let avail: u64 = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| SetupError::general(format!("unparseable df avail field: {}", line)))?;
    let total: u64 = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| SetupError::general(format!("unparseable df size field: {}", line)))?;

    DiskSpace::new(avail, total, path)
}
