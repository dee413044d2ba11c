//! hyprsetup library
//!
//! Installation orchestration core for the Hyprland desktop stack: the
//! session state machine, conflict detection/resolution, progress
//! estimation, and history recording, plus the reference collaborator
//! implementations the CLI wires together.

pub mod cli;
pub mod config;
pub mod config_file;
pub mod conflict;
pub mod error;
pub mod history;
pub mod installer;
pub mod merger;
pub mod package_manager;
pub mod progress;
pub mod repository;
pub mod resolver;
pub mod sanity;
pub mod session;
pub mod snapshot;
pub mod types;

// Re-export main types for convenience
pub use config::{ComponentSelection, DiskSpace, InstallationConfiguration, PackageInfo};
pub use config_file::SetupConfig;
pub use conflict::{ConflictResolution, ConflictResolver, PackageConflict};
pub use error::{Result, SetupError};
pub use history::{
    HistoryRecordingService, InMemoryHistoryService, InstallationRecord, JsonHistoryRecorder,
    RecordId,
};
pub use installer::{Installer, InstallationStatus};
pub use merger::{ConfigurationMerger, FileBackupMerger};
pub use package_manager::{DryRunPackageManager, PackageManager, PacmanPackageManager};
pub use progress::{estimate_remaining, overall_progress, phase_progress, ProgressUpdate};
pub use repository::{InMemorySessionRepository, JsonFileSessionRepository, SessionRepository};
pub use session::{
    InstallationSession, InstalledComponent, SessionId, SessionStatus, TransitionError,
};
pub use snapshot::{FilesystemSnapshotProvider, SnapshotProvider, SystemSnapshot};
pub use types::{
    Component, ComponentCategory, ConflictKind, GpuVendor, InstallOutcome, ResolutionStrategy,
};
