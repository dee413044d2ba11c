//! Configuration merger collaborator
//!
//! The Configuring phase consults this collaborator for every pre-existing
//! configuration path the system snapshot found: whether it deserves a
//! backup before being touched, and how existing content combines with
//! newly generated content.

use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// External merger contract.
pub trait ConfigurationMerger: Send + Sync {
    /// Combine existing user configuration with newly generated content.
    fn merge_configurations(&self, existing: &str, incoming: &str) -> Result<String>;

    /// Whether the file at `path` should be backed up before mutation.
    fn should_backup_existing(&self, path: &Path) -> bool;
}

/// Reference merger: backs up any non-empty existing file and merges by
/// keeping the user's content first, then appending the generated content
/// under a marker so re-runs stay idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBackupMerger;

/// Marker line separating user content from generated content.
const MERGE_MARKER: &str = "# --- managed by hyprsetup ---";

impl FileBackupMerger {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigurationMerger for FileBackupMerger {
    fn merge_configurations(&self, existing: &str, incoming: &str) -> Result<String> {
        // Strip a previous managed block so re-merging does not stack them
        let user_part = match existing.find(MERGE_MARKER) {
            Some(idx) => existing[..idx].trim_end(),
            None => existing.trim_end(),
        };

        if user_part.is_empty() {
            return Ok(format!("{}\n{}\n", MERGE_MARKER, incoming.trim_end()));
        }

        Ok(format!(
            "{}\n\n{}\n{}\n",
            user_part,
            MERGE_MARKER,
            incoming.trim_end()
        ))
    }

    fn should_backup_existing(&self, path: &Path) -> bool {
        let backup = match std::fs::metadata(path) {
            Ok(meta) => (meta.is_file() && meta.len() > 0) || meta.is_dir(),
            Err(_) => false,
        };
        debug!("should_backup_existing({:?}) = {}", path, backup);
        backup
    }
}
