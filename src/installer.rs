//! Installation use cases
//!
//! Drives an `InstallationSession` through its phases, delegating to the
//! collaborator traits: conflict resolution before any side effect, package
//! installation per component, configuration backup/merge, verification,
//! and finally history recording.
//!
//! # Orchestration Contract
//!
//! - The session is persisted after every phase transition so a separate
//!   status reader observes intermediate progress.
//! - Package installation is fail-fast with a partial record: the first
//!   failure stops the loop, the session fails with the underlying message,
//!   and the components installed up to that point stay visible.
//! - History recording is best-effort relative to the session's own
//!   correctness: a failed write is logged as a warning, nothing more.
//! - Cancellation is cooperative; it only takes effect at the phase
//!   boundaries this orchestrator controls.

use std::collections::HashSet;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::InstallationConfiguration;
use crate::conflict::{ConflictResolution, ConflictResolver, PackageConflict};
use crate::error::{Result, SetupError};
use crate::history::HistoryRecordingService;
use crate::merger::ConfigurationMerger;
use crate::package_manager::{DryRunPackageManager, PackageManager};
use crate::progress::{overall_progress, ProgressUpdate};
use crate::repository::SessionRepository;
use crate::resolver;
use crate::session::{InstallationSession, InstalledComponent, SessionId, SessionStatus};
use crate::snapshot::SnapshotProvider;
use crate::types::{Component, ConflictKind, ResolutionStrategy};

/// Read-only status view derived from a session snapshot plus the progress
/// estimator. Carries no independent state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstallationStatus {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_phase: String,
    pub percent_complete: u8,
    pub components_installed: usize,
    pub components_total: usize,
    pub started_at: u64,
    pub completed_at: Option<u64>,
}

/// Use-case orchestrator for installation sessions.
///
/// Exactly one `Installer` is expected to mutate a given session at a time;
/// the repository is the synchronization point.
pub struct Installer {
    repository: Arc<dyn SessionRepository>,
    package_manager: Arc<dyn PackageManager>,
    history: Arc<dyn HistoryRecordingService>,
    merger: Arc<dyn ConfigurationMerger>,
    snapshots: Arc<dyn SnapshotProvider>,
    resolver: ConflictResolver,
    progress: Option<Sender<ProgressUpdate>>,
}

impl Installer {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        package_manager: Arc<dyn PackageManager>,
        history: Arc<dyn HistoryRecordingService>,
        merger: Arc<dyn ConfigurationMerger>,
        snapshots: Arc<dyn SnapshotProvider>,
    ) -> Self {
        Self {
            repository,
            package_manager,
            history,
            merger,
            snapshots,
            resolver: ConflictResolver::new(),
            progress: None,
        }
    }

    /// Attach an optional progress side channel. Updates are advisory and a
    /// disconnected receiver never affects the run.
    pub fn with_progress_channel(mut self, sender: Sender<ProgressUpdate>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Create a new Pending session from a validated configuration and
    /// persist it.
    pub fn start_session(&self, configuration: InstallationConfiguration) -> Result<SessionId> {
        let session = InstallationSession::new(configuration);
        let id = session.id();
        self.repository.save(&session)?;
        info!("Created installation session {}", id);
        Ok(id)
    }

    /// Execute an installation session to a terminal status.
    ///
    /// Pre-installation problems (unresolvable conflicts, snapshot capture
    /// failures, invalid session state) return an error and leave the
    /// session untouched, so it can be retried after reconfiguration.
    /// Failures after installation has begun terminate the session via
    /// `fail` and are reported through the returned session's status, not
    /// through an `Err`.
    pub fn execute(&self, id: SessionId) -> Result<InstallationSession> {
        let mut session = self.repository.find_by_id(id)?;
        let config = session.configuration().clone();
        let selections = config.components();

        // 1. Conflicts are detected and resolved before any side effect, so
        //    a bad configuration is rejected while the session is untouched.
        let conflicts = self.resolver.detect_conflicts(&selections);
        let (skipped, merge_roles) = self.resolve_all(&conflicts)?;

        // 2. Snapshot + Preparation
        let snapshot = self.snapshots.capture(&config)?;
        session.start_preparation(snapshot)?;
        self.repository.save(&session)?;
        self.report(&session, "captured system snapshot");

        if let Some(reason) = self.check_disk_budget(&session) {
            return self.fail_session(session, reason);
        }

        // 3. Installing: one blocking package install per selection, in
        //    order, skipping components dropped by conflict resolution.
        session.start_installing()?;
        self.repository.save(&session)?;

        // Duplicate selections keep their first listing only; components
        // dropped by conflict resolution are skipped entirely.
        let mut seen = HashSet::new();
        let planned: Vec<_> = selections
            .iter()
            .filter(|s| !skipped.contains(&s.component()))
            .filter(|s| seen.insert(s.component()))
            .collect();
        let total = planned.len();

        for skipped_component in &skipped {
            info!(
                "Skipping {} (dropped by conflict resolution)",
                skipped_component
            );
        }

        let dry_run_pm = DryRunPackageManager::new();
        let pm: &dyn PackageManager = if config.is_dry_run() {
            &dry_run_pm
        } else {
            self.package_manager.as_ref()
        };

        for selection in planned {
            let package = selection.package_name();
            self.report(
                &session,
                format!("installing {} {}", package, selection.version()),
            );

            if let Err(e) = pm.install_package(&package, selection.version()) {
                // Fail fast: remaining components are not attempted, but
                // everything installed so far stays on the record.
                let reason = format!("Failed to install {}: {}", package, e);
                return self.fail_session(session, reason);
            }

            session.add_installed_component(InstalledComponent::new(
                selection.component(),
                selection.version(),
                selection.package().cloned(),
            ))?;
            self.repository.save(&session)?;
            self.report(
                &session,
                format!(
                    "installed {} ({}/{})",
                    package,
                    session.package_count(),
                    total
                ),
            );
        }

        // 4. Configuring: back up and merge pre-existing configuration
        session.start_configuring()?;
        self.repository.save(&session)?;
        self.report(&session, "configuring components");

        if let Err(e) = self.configure(&session, &merge_roles) {
            return self.fail_session(session, format!("Configuration failed: {}", e));
        }

        // 5. Verifying: every installed component must be present in the
        //    package database.
        session.start_verifying()?;
        self.repository.save(&session)?;
        self.report(&session, "verifying installed packages");

        for installed in session.installed_components() {
            let package = installed
                .package
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| resolver::package_name(installed.component).to_string());
            match pm.is_package_installed(&package) {
                Ok(true) => debug!("Verified {}", package),
                Ok(false) => {
                    let reason =
                        format!("Verification failed: {} missing from package database", package);
                    return self.fail_session(session, reason);
                }
                Err(e) => {
                    return self.fail_session(session, format!("Verification failed: {}", e));
                }
            }
        }

        // 6. Done
        session.complete()?;
        self.repository.save(&session)?;
        self.report(&session, "installation complete");
        self.record_history(&session);

        info!(
            "Session {} completed: {} package(s) installed",
            session.id(),
            session.package_count()
        );
        Ok(session)
    }

    /// Cancel a session that has not yet terminated.
    ///
    /// Cancellation reuses the terminal-failure invariant: the session
    /// fails with a reason containing "cancelled", and history records it
    /// as a failed outcome with cancellation details.
    pub fn cancel(&self, id: SessionId, detail: Option<&str>) -> Result<InstallationSession> {
        let mut session = self.repository.find_by_id(id)?;

        if session.is_terminal() {
            return Err(SetupError::Transition(format!(
                "cannot cancel session {}: already {}",
                id,
                session.status()
            )));
        }

        let reason = match detail {
            Some(detail) => format!("installation cancelled: {}", detail),
            None => "installation cancelled".to_string(),
        };
        session.fail(reason)?;
        self.repository.save(&session)?;
        self.record_history(&session);

        info!("Session {} cancelled", id);
        Ok(session)
    }

    /// Read-only status derived from the stored session.
    pub fn status(&self, id: SessionId) -> Result<InstallationStatus> {
        let session = self.repository.find_by_id(id)?;
        let total = session.configuration().component_count();
        let installed = session.package_count();

        Ok(InstallationStatus {
            session_id: session.id(),
            status: session.status(),
            current_phase: session.status().description().to_string(),
            percent_complete: overall_progress(session.status(), total, installed),
            components_installed: installed,
            components_total: total,
            started_at: session.started_at(),
            completed_at: session.completed_at(),
        })
    }

    /// Resolve every detected conflict with the default strategy for its
    /// kind. Any unresolvable conflict aborts the whole run.
    fn resolve_all(
        &self,
        conflicts: &[PackageConflict],
    ) -> Result<(HashSet<Component>, HashSet<Component>)> {
        let mut skipped = HashSet::new();
        let mut merge_roles = HashSet::new();

        for conflict in conflicts {
            let strategy = default_strategy(conflict.kind());
            debug!("Resolving {} with {}", conflict, strategy);
            match self.resolver.resolve(conflict, strategy)? {
                ConflictResolution::DropComponents(components) => {
                    if conflict.kind() == ConflictKind::DuplicateComponent {
                        // Dropping by component would also remove the kept
                        // first listing; the install loop dedups occurrences
                        debug!("Duplicate listing of {:?} will be collapsed", components);
                        continue;
                    }
                    for component in components {
                        info!("Conflict resolution drops {}", component);
                        skipped.insert(component);
                    }
                }
                ConflictResolution::MergeConfigs => {
                    info!("Conflict resolution merges configs for {}", conflict);
                    merge_roles.extend(conflict.components());
                }
            }
        }

        Ok((skipped, merge_roles))
    }

    /// Compare the snapshot's available space against the configuration's
    /// declared package sizes. Returns a failure reason when the budget
    /// does not fit; sizes default to zero when metadata is absent.
    fn check_disk_budget(&self, session: &InstallationSession) -> Option<String> {
        let required: u64 = session
            .configuration()
            .components()
            .iter()
            .filter_map(|s| s.package().map(|p| p.size_bytes))
            .sum();
        if required == 0 {
            return None;
        }

        let available = session
            .snapshot()
            .map(|snapshot| snapshot.disk().available_bytes())
            .unwrap_or(0);

        if available < required {
            return Some(format!(
                "insufficient disk space: need {}, {} available",
                crate::config::humanize_size(required),
                crate::config::humanize_size(available)
            ));
        }
        None
    }

    /// Configuring phase: back up every pre-existing config path the
    /// snapshot found, then fold a managed note into the primary config
    /// files of installed components whose configs pre-existed.
    fn configure(
        &self,
        session: &InstallationSession,
        merge_roles: &HashSet<Component>,
    ) -> Result<()> {
        let snapshot = match session.snapshot() {
            Some(snapshot) => snapshot,
            // start_preparation requires a snapshot, so this cannot happen
            // on the orchestrated path
            None => return Ok(()),
        };
        let dry_run = session.configuration().is_dry_run();

        for path in snapshot.existing_configs() {
            if !self.merger.should_backup_existing(&path) {
                debug!("No backup needed for {:?}", path);
                continue;
            }
            if dry_run {
                warn!("[dry-run] would back up {:?}", path);
                continue;
            }
            backup_path(&path, snapshot.backup_dir())?;
            info!("Backed up {:?} to {:?}", path, snapshot.backup_dir());
        }

        for installed in session.installed_components() {
            let component = installed.component;
            let note = format!(
                "# {} {} installed by hyprsetup (session {})",
                component,
                installed.version,
                session.id()
            );
            for path in snapshot.existing_configs() {
                // Only the directory this component actually owns
                if path.file_name().and_then(|n| n.to_str())
                    != Some(resolver::config_dir(component))
                {
                    continue;
                }
                let config_file = path.join(resolver::config_file_name(component));
                if !config_file.is_file() {
                    continue;
                }
                if dry_run {
                    warn!("[dry-run] would merge managed note into {:?}", config_file);
                    continue;
                }
                let existing = std::fs::read_to_string(&config_file)?;
                let merged = self.merger.merge_configurations(&existing, &note)?;
                std::fs::write(&config_file, merged)?;
                if merge_roles.contains(&component) {
                    debug!("Merged colliding config for {} at {:?}", component, config_file);
                }
            }
        }

        Ok(())
    }

    /// Terminate the session as failed, persist, and hand it to history.
    fn fail_session(
        &self,
        mut session: InstallationSession,
        reason: String,
    ) -> Result<InstallationSession> {
        warn!("Session {} failed: {}", session.id(), reason);
        session.fail(reason)?;
        self.repository.save(&session)?;
        self.record_history(&session);
        Ok(session)
    }

    /// Best-effort history write: the session's terminal outcome is
    /// authoritative whether or not the audit trail succeeded.
    fn record_history(&self, session: &InstallationSession) {
        match self.history.record_installation(session) {
            Ok(record_id) => {
                info!("Recorded installation history: {}", record_id);
            }
            Err(e) => {
                warn!(
                    "Failed to record history for session {} (outcome unchanged): {}",
                    session.id(),
                    e
                );
            }
        }
    }

    /// Send a progress update over the optional side channel.
    fn report(&self, session: &InstallationSession, message: impl Into<String>) {
        if let Some(sender) = &self.progress {
            let update = ProgressUpdate::new(
                session.status(),
                session.package_count(),
                session.configuration().component_count(),
                message,
            );
            // A dropped receiver is not an error for the run
            let _ = sender.send(update);
        }
    }
}

/// Default resolution strategy per conflict kind.
pub fn default_strategy(kind: ConflictKind) -> ResolutionStrategy {
    match kind {
        ConflictKind::DuplicateComponent => ResolutionStrategy::SkipComponent,
        ConflictKind::ServiceCollision => ResolutionStrategy::PreferNewer,
        ConflictKind::FileCollision => ResolutionStrategy::MergeConfigs,
    }
}

/// Copy a file or directory tree into the backup directory.
fn backup_path(source: &Path, backup_dir: &Path) -> Result<()> {
    let name = source
        .file_name()
        .ok_or_else(|| SetupError::general(format!("cannot back up pathless {:?}", source)))?;
    let target = backup_dir.join(name);
    std::fs::create_dir_all(backup_dir)?;

    if source.is_dir() {
        copy_dir_recursive(source, &target)?;
    } else {
        std::fs::copy(source, &target)?;
    }
    Ok(())
}

fn copy_dir_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
