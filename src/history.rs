//! Installation history recording
//!
//! Once a session reaches a terminal status it is handed to a
//! `HistoryRecordingService`, which derives an immutable audit record from
//! it. Recording is best-effort relative to the session's own correctness:
//! the orchestrator logs a failed write as a warning and moves on.
//!
//! Derivation contract:
//! - the session must be terminal (`Completed` or `Failed`)
//! - outcome `failed` requires failure details
//! - outcome `success` requires at least one installed package

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::session::{InstallationSession, SessionId, SessionStatus};
use crate::types::InstallOutcome;

/// Errors raised while deriving or persisting a history record.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The session has not reached a terminal status
    #[error("Session {id} is not complete (status: {status}); only terminated sessions are recorded")]
    SessionNotComplete { id: SessionId, status: SessionStatus },

    /// A failed outcome carried no failure details
    #[error("Failed session {id} has no failure details")]
    MissingFailureDetails { id: SessionId },

    /// A successful outcome recorded no installed packages
    #[error("Completed session {id} installed no packages")]
    EmptyPackageList { id: SessionId },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<HistoryError> for crate::error::SetupError {
    fn from(err: HistoryError) -> Self {
        crate::error::SetupError::History(err.to_string())
    }
}

/// Unique identifier of a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable audit fact derived from a terminated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    record_id: RecordId,
    session_id: SessionId,
    outcome: InstallOutcome,
    packages: Vec<String>,
    failure_details: String,
    started_at: u64,
    completed_at: u64,
    recorded_at: u64,
}

impl InstallationRecord {
    /// Derive a record from a terminated session, enforcing the recording
    /// contract.
    pub fn from_session(session: &InstallationSession) -> Result<Self, HistoryError> {
        let outcome = match session.status() {
            SessionStatus::Completed => InstallOutcome::Success,
            SessionStatus::Failed => InstallOutcome::Failed,
            status => {
                return Err(HistoryError::SessionNotComplete {
                    id: session.id(),
                    status,
                })
            }
        };

        let packages: Vec<String> = session
            .installed_components()
            .iter()
            .map(|installed| {
                format!(
                    "{} {}",
                    installed
                        .package
                        .as_ref()
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| crate::resolver::package_name(installed.component)
                            .to_string()),
                    installed.version
                )
            })
            .collect();

        match outcome {
            InstallOutcome::Failed if session.failure_reason().trim().is_empty() => {
                return Err(HistoryError::MissingFailureDetails { id: session.id() });
            }
            InstallOutcome::Success if packages.is_empty() => {
                return Err(HistoryError::EmptyPackageList { id: session.id() });
            }
            _ => {}
        }

        Ok(Self {
            record_id: RecordId::new(),
            session_id: session.id(),
            outcome,
            packages,
            failure_details: session.failure_reason().to_string(),
            started_at: session.started_at(),
            completed_at: session.completed_at().unwrap_or_else(crate::session::unix_now),
            recorded_at: crate::session::unix_now(),
        })
    }

    #[inline]
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    #[inline]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[inline]
    pub fn outcome(&self) -> InstallOutcome {
        self.outcome
    }

    /// Installed packages in installation order ("name version" each).
    /// Returns a copy; the internal list is never handed out.
    pub fn packages(&self) -> Vec<String> {
        self.packages.clone()
    }

    pub fn failure_details(&self) -> &str {
        &self.failure_details
    }

    pub fn has_failure_details(&self) -> bool {
        !self.failure_details.trim().is_empty()
    }

    /// True when the failure details follow the cancellation text
    /// convention. The substring check lives here so no other consumer
    /// string-matches.
    pub fn is_cancellation(&self) -> bool {
        self.outcome == InstallOutcome::Failed && self.failure_details.contains("cancelled")
    }

    #[inline]
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    #[inline]
    pub fn completed_at(&self) -> u64 {
        self.completed_at
    }

    #[inline]
    pub fn recorded_at(&self) -> u64 {
        self.recorded_at
    }
}

/// Write-once sink for installation records.
pub trait HistoryRecordingService: Send + Sync {
    /// Derive and persist a record for a terminated session.
    fn record_installation(
        &self,
        session: &InstallationSession,
    ) -> Result<RecordId, HistoryError>;

    /// All recorded installations, oldest first.
    fn records(&self) -> Result<Vec<InstallationRecord>, HistoryError>;
}

/// In-memory history sink.
#[derive(Debug, Default)]
pub struct InMemoryHistoryService {
    records: Mutex<Vec<InstallationRecord>>,
}

impl InMemoryHistoryService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryRecordingService for InMemoryHistoryService {
    fn record_installation(
        &self,
        session: &InstallationSession,
    ) -> Result<RecordId, HistoryError> {
        let record = InstallationRecord::from_session(session)?;
        let id = record.record_id();
        self.records
            .lock()
            .expect("history mutex poisoned")
            .push(record);
        Ok(id)
    }

    fn records(&self) -> Result<Vec<InstallationRecord>, HistoryError> {
        Ok(self.records.lock().expect("history mutex poisoned").clone())
    }
}

/// File-backed history sink: a single JSON array, re-read and re-written
/// under a mutex on every append.
#[derive(Debug)]
pub struct JsonHistoryRecorder {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonHistoryRecorder {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            io_lock: Mutex::new(()),
        })
    }

    fn load(&self) -> Result<Vec<InstallationRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl HistoryRecordingService for JsonHistoryRecorder {
    fn record_installation(
        &self,
        session: &InstallationSession,
    ) -> Result<RecordId, HistoryError> {
        let record = InstallationRecord::from_session(session)?;
        let id = record.record_id();

        let _guard = self.io_lock.lock().expect("history mutex poisoned");
        let mut records = self.load()?;
        records.push(record);

        let json = serde_json::to_string_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(id)
    }

    fn records(&self) -> Result<Vec<InstallationRecord>, HistoryError> {
        let _guard = self.io_lock.lock().expect("history mutex poisoned");
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ComponentSelection, DiskSpace, InstallationConfiguration, PackageInfo};
    use crate::session::InstalledComponent;
    use crate::snapshot::SystemSnapshot;
    use crate::types::Component;

    fn disk() -> DiskSpace {
        DiskSpace::new(20 * 1024 * 1024 * 1024, 40 * 1024 * 1024 * 1024, "/").unwrap()
    }

    fn completed_session() -> InstallationSession {
        let selection = ComponentSelection::new(
            Component::Hyprland,
            "0.45.0",
            Some(PackageInfo::new("hyprland", "0.45.0", 15 * 1024 * 1024, vec![])),
        )
        .unwrap();
        let config = InstallationConfiguration::new(vec![selection], None, disk(), false).unwrap();
        let mut session = InstallationSession::new(config);
        session
            .start_preparation(SystemSnapshot::new("/tmp/backup", disk(), vec![]))
            .unwrap();
        session.start_installing().unwrap();
        session
            .add_installed_component(InstalledComponent::new(
                Component::Hyprland,
                "0.45.0",
                Some(PackageInfo::new("hyprland", "0.45.0", 15 * 1024 * 1024, vec![])),
            ))
            .unwrap();
        session.start_configuring().unwrap();
        session.start_verifying().unwrap();
        session.complete().unwrap();
        session
    }

    fn failed_session(reason: &str) -> InstallationSession {
        let selection = ComponentSelection::new(Component::Hyprland, "0.45.0", None).unwrap();
        let config = InstallationConfiguration::new(vec![selection], None, disk(), false).unwrap();
        let mut session = InstallationSession::new(config);
        session.fail(reason).unwrap();
        session
    }

    #[test]
    fn test_success_record_derivation() {
        let record = InstallationRecord::from_session(&completed_session()).unwrap();
        assert_eq!(record.outcome(), InstallOutcome::Success);
        assert!(!record.has_failure_details());
        assert_eq!(record.packages(), vec!["hyprland 0.45.0".to_string()]);
        assert!(record.completed_at() >= record.started_at());
    }

    #[test]
    fn test_failed_record_derivation() {
        let record =
            InstallationRecord::from_session(&failed_session("Package conflict detected")).unwrap();
        assert_eq!(record.outcome(), InstallOutcome::Failed);
        assert!(record.has_failure_details());
        assert!(record.failure_details().contains("Package conflict"));
        assert!(!record.is_cancellation());
    }

    #[test]
    fn test_cancelled_record_is_failed_outcome() {
        let record =
            InstallationRecord::from_session(&failed_session("installation cancelled: operator"))
                .unwrap();
        assert_eq!(record.outcome(), InstallOutcome::Failed);
        assert!(record.is_cancellation());
    }

    #[test]
    fn test_non_terminal_session_rejected() {
        let selection = ComponentSelection::new(Component::Hyprland, "0.45.0", None).unwrap();
        let config = InstallationConfiguration::new(vec![selection], None, disk(), false).unwrap();
        let session = InstallationSession::new(config);

        let err = InstallationRecord::from_session(&session).unwrap_err();
        assert!(matches!(err, HistoryError::SessionNotComplete { .. }));
        assert!(err.to_string().contains("not complete"));
    }

    #[test]
    fn test_success_requires_installed_packages() {
        // Drive a session to Completed without installing anything
        let selection = ComponentSelection::new(Component::Hyprland, "0.45.0", None).unwrap();
        let config = InstallationConfiguration::new(vec![selection], None, disk(), false).unwrap();
        let mut session = InstallationSession::new(config);
        session
            .start_preparation(SystemSnapshot::new("/tmp/backup", disk(), vec![]))
            .unwrap();
        session.start_installing().unwrap();
        session.start_configuring().unwrap();
        session.start_verifying().unwrap();
        session.complete().unwrap();

        let err = InstallationRecord::from_session(&session).unwrap_err();
        assert!(matches!(err, HistoryError::EmptyPackageList { .. }));
    }

    #[test]
    fn test_in_memory_service_records() {
        let service = InMemoryHistoryService::new();
        service.record_installation(&completed_session()).unwrap();
        service
            .record_installation(&failed_session("pacman exited 1"))
            .unwrap();

        let records = service.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome(), InstallOutcome::Success);
        assert_eq!(records[1].outcome(), InstallOutcome::Failed);
    }

    #[test]
    fn test_json_recorder_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.json");
        let recorder = JsonHistoryRecorder::open(&path).unwrap();

        recorder.record_installation(&completed_session()).unwrap();
        recorder
            .record_installation(&failed_session("disk full"))
            .unwrap();

        // Re-open and confirm both records survived
        let reopened = JsonHistoryRecorder::open(&path).unwrap();
        let records = reopened.records().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_json_recorder_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, "").unwrap();

        let recorder = JsonHistoryRecorder::open(&path).unwrap();
        assert!(recorder.records().unwrap().is_empty());
    }
}
