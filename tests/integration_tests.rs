//! End-to-end installation scenarios
//!
//! Drives full sessions through the orchestrator with an in-memory
//! repository, a scripted package manager, and a static snapshot provider,
//! and checks the terminal session state plus the derived history record.

use std::sync::{Arc, Mutex};

use hyprsetup::config::{ComponentSelection, DiskSpace, InstallationConfiguration, PackageInfo};
use hyprsetup::history::{HistoryRecordingService, InMemoryHistoryService};
use hyprsetup::installer::Installer;
use hyprsetup::merger::FileBackupMerger;
use hyprsetup::package_manager::PackageManager;
use hyprsetup::repository::{InMemorySessionRepository, SessionRepository};
use hyprsetup::session::SessionStatus;
use hyprsetup::snapshot::{SnapshotProvider, SystemSnapshot};
use hyprsetup::types::{Component, InstallOutcome};
use hyprsetup::{Result, SetupError};

// =============================================================================
// Test doubles
// =============================================================================

/// Package manager scripted to fail on a specific package name.
#[derive(Default)]
struct ScriptedPackageManager {
    fail_on: Option<String>,
    installs: Mutex<Vec<String>>,
}

impl ScriptedPackageManager {
    fn succeeding() -> Self {
        Self::default()
    }

    fn failing_on(package: &str) -> Self {
        Self {
            fail_on: Some(package.to_string()),
            installs: Mutex::new(Vec::new()),
        }
    }

    fn installed(&self) -> Vec<String> {
        self.installs.lock().unwrap().clone()
    }
}

impl PackageManager for ScriptedPackageManager {
    fn install_package(&self, name: &str, _version: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(SetupError::package(format!(
                "Package conflict detected for {}",
                name
            )));
        }
        self.installs.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn is_package_installed(&self, name: &str) -> Result<bool> {
        Ok(self.installs.lock().unwrap().iter().any(|p| p == name))
    }
}

/// Snapshot provider that returns a pre-built snapshot.
struct StaticSnapshotProvider {
    snapshot: SystemSnapshot,
}

impl StaticSnapshotProvider {
    fn with_disk(disk: DiskSpace) -> Self {
        Self {
            snapshot: SystemSnapshot::new("/tmp/hyprsetup-test-backups", disk, vec![]),
        }
    }
}

impl SnapshotProvider for StaticSnapshotProvider {
    fn capture(&self, _config: &InstallationConfiguration) -> Result<SystemSnapshot> {
        Ok(self.snapshot.clone())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn twenty_gib_disk() -> DiskSpace {
    DiskSpace::new(20 * 1024 * 1024 * 1024, 40 * 1024 * 1024 * 1024, "/").unwrap()
}

fn hyprland_selection() -> ComponentSelection {
    ComponentSelection::new(
        Component::Hyprland,
        "0.45.0",
        Some(PackageInfo::new(
            "hyprland",
            "0.45.0",
            15 * 1024 * 1024,
            vec![],
        )),
    )
    .unwrap()
}

fn single_component_config() -> InstallationConfiguration {
    InstallationConfiguration::new(vec![hyprland_selection()], None, twenty_gib_disk(), false)
        .unwrap()
}

struct Harness {
    repository: Arc<InMemorySessionRepository>,
    package_manager: Arc<ScriptedPackageManager>,
    history: Arc<InMemoryHistoryService>,
    installer: Installer,
}

fn harness(package_manager: ScriptedPackageManager) -> Harness {
    let repository = Arc::new(InMemorySessionRepository::new());
    let package_manager = Arc::new(package_manager);
    let history = Arc::new(InMemoryHistoryService::new());
    let installer = Installer::new(
        repository.clone(),
        package_manager.clone(),
        history.clone(),
        Arc::new(FileBackupMerger::new()),
        Arc::new(StaticSnapshotProvider::with_disk(twenty_gib_disk())),
    );
    Harness {
        repository,
        package_manager,
        history,
        installer,
    }
}

// =============================================================================
// Scenario A: single-component success
// =============================================================================

#[test]
fn scenario_a_single_component_success() {
    let h = harness(ScriptedPackageManager::succeeding());

    let id = h.installer.start_session(single_component_config()).unwrap();
    let session = h.installer.execute(id).unwrap();

    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.package_count(), 1);
    assert!(session.completed_at().is_some());
    assert_eq!(h.package_manager.installed(), vec!["hyprland".to_string()]);

    let records = h.history.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome(), InstallOutcome::Success);
    assert!(!records[0].has_failure_details());
    assert_eq!(records[0].packages(), vec!["hyprland 0.45.0".to_string()]);
}

// =============================================================================
// Scenario B: failure during installation
// =============================================================================

#[test]
fn scenario_b_install_failure_is_recorded() {
    let h = harness(ScriptedPackageManager::failing_on("hyprland"));

    let id = h.installer.start_session(single_component_config()).unwrap();
    let session = h.installer.execute(id).unwrap();

    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.failure_reason().contains("Package conflict detected"));

    let records = h.history.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome(), InstallOutcome::Failed);
    assert!(records[0].has_failure_details());
    assert!(records[0].failure_details().contains("Package conflict"));
}

// =============================================================================
// Scenario C: cancelling a pending session
// =============================================================================

#[test]
fn scenario_c_cancel_pending_session() {
    let h = harness(ScriptedPackageManager::succeeding());

    let id = h.installer.start_session(single_component_config()).unwrap();
    let session = h.installer.cancel(id, None).unwrap();

    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.failure_reason().contains("cancelled"));

    // History records a cancellation as a failed outcome
    let records = h.history.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome(), InstallOutcome::Failed);
    assert!(records[0].is_cancellation());
}

// =============================================================================
// Scenario D: cancelling a terminal session
// =============================================================================

#[test]
fn scenario_d_cancel_terminal_session_errors() {
    let h = harness(ScriptedPackageManager::failing_on("hyprland"));

    let id = h.installer.start_session(single_component_config()).unwrap();
    let failed = h.installer.execute(id).unwrap();
    assert_eq!(failed.status(), SessionStatus::Failed);

    let err = h.installer.cancel(id, Some("too late")).unwrap_err();
    assert!(matches!(err, SetupError::Transition(_)));

    // Session unchanged by the rejected cancellation
    let stored = h.repository.find_by_id(id).unwrap();
    assert_eq!(stored.status(), SessionStatus::Failed);
    assert!(stored.failure_reason().contains("Package conflict detected"));
    assert!(!stored.failure_reason().contains("cancelled"));
}

// =============================================================================
// Scenario E: multi-component partial failure
// =============================================================================

#[test]
fn scenario_e_partial_failure_keeps_installed_prefix() {
    let h = harness(ScriptedPackageManager::failing_on("waybar"));

    let selections = vec![
        hyprland_selection(),
        ComponentSelection::new(Component::Waybar, "0.11.0", None).unwrap(),
    ];
    let config =
        InstallationConfiguration::new(selections, None, twenty_gib_disk(), false).unwrap();

    let id = h.installer.start_session(config).unwrap();
    let session = h.installer.execute(id).unwrap();

    assert_eq!(session.status(), SessionStatus::Failed);
    // First component was installed and stays visible for diagnostics
    let installed = session.installed_components();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].component, Component::Hyprland);
    // Second component stopped the run
    assert!(session.failure_reason().contains("waybar"));
    // No further components were attempted
    assert_eq!(h.package_manager.installed(), vec!["hyprland".to_string()]);

    let records = h.history.records().unwrap();
    assert_eq!(records[0].outcome(), InstallOutcome::Failed);
    assert_eq!(records[0].packages().len(), 1);
}

// =============================================================================
// Disk budget
// =============================================================================

#[test]
fn insufficient_disk_space_fails_the_session() {
    // Snapshot reports less space than the declared package size
    let tiny_disk = DiskSpace::new(1024, 2048, "/").unwrap();
    let repository = Arc::new(InMemorySessionRepository::new());
    let history = Arc::new(InMemoryHistoryService::new());
    let installer = Installer::new(
        repository.clone(),
        Arc::new(ScriptedPackageManager::succeeding()),
        history.clone(),
        Arc::new(FileBackupMerger::new()),
        Arc::new(StaticSnapshotProvider::with_disk(tiny_disk)),
    );

    let id = installer.start_session(single_component_config()).unwrap();
    let session = installer.execute(id).unwrap();

    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.failure_reason().contains("insufficient disk space"));
    // Nothing was installed
    assert_eq!(session.package_count(), 0);
}

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn dry_run_completes_without_touching_the_package_manager() {
    let h = harness(ScriptedPackageManager::failing_on("hyprland"));

    let config = InstallationConfiguration::new(
        vec![hyprland_selection()],
        None,
        twenty_gib_disk(),
        true,
    )
    .unwrap();

    let id = h.installer.start_session(config).unwrap();
    let session = h.installer.execute(id).unwrap();

    // The scripted failure never fires because dry-run bypasses the real
    // package manager entirely
    assert_eq!(session.status(), SessionStatus::Completed);
    assert!(h.package_manager.installed().is_empty());
}
