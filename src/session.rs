//! Installation Session State Machine
//!
//! The authoritative source of truth for one installation attempt. The
//! session enforces valid phase transitions and makes it impossible to
//! record progress out of order.
//!
//! # Design Principles
//!
//! - **Single Source of Truth**: the `InstallationSession` owns its status
//! - **Validated Transitions**: each phase method checks the current status
//! - **No Global State**: sessions live in a repository, never in statics
//! - **Fail Fast**: invalid transitions return errors immediately
//!
//! # Phase Flow
//!
//! ```text
//! Pending
//!     ↓
//! Preparation
//!     ↓
//! Installing
//!     ↓
//! Configuring
//!     ↓
//! Verifying
//!     ↓
//! Completed
//!
//! (Any non-terminal phase can transition to Failed)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{InstallationConfiguration, PackageInfo};
use crate::snapshot::SystemSnapshot;
use crate::types::Component;

/// Seconds since UNIX_EPOCH, 0 if the clock is before the epoch.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Session lifecycle statuses in sequential order.
///
/// Statuses are ordered and only progress forward, except for the failure
/// transition which is reachable from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionStatus {
    /// Session created, nothing executed yet
    Pending = 0,

    /// Capturing the system snapshot and checking disk budget
    Preparation = 1,

    /// Installing packages, one component at a time
    Installing = 2,

    /// Backing up and merging pre-existing configuration files
    Configuring = 3,

    /// Verifying installed packages against the package database
    Verifying = 4,

    /// Installation completed successfully (terminal)
    Completed = 5,

    /// Installation failed or was cancelled (terminal)
    Failed = 255,
}

impl SessionStatus {
    /// Returns the numeric order of this status (0-5, 255 for Failed)
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal status (Completed or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns the next status in the sequence, or None at a terminal status
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Preparation),
            Self::Preparation => Some(Self::Installing),
            Self::Installing => Some(Self::Configuring),
            Self::Configuring => Some(Self::Verifying),
            Self::Verifying => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Returns a human-readable description of this status
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Preparation => "Preparing system",
            Self::Installing => "Installing packages",
            Self::Configuring => "Configuring components",
            Self::Verifying => "Verifying installation",
            Self::Completed => "Installation complete",
            Self::Failed => "Installation failed",
        }
    }

    /// Returns all statuses in lifecycle order (excluding Failed)
    pub const fn all_statuses() -> &'static [Self] {
        &[
            Self::Pending,
            Self::Preparation,
            Self::Installing,
            Self::Configuring,
            Self::Verifying,
            Self::Completed,
        ]
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during session phase transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Attempted a phase advance from the wrong status
    #[error("Cannot transition from {from} to {to} (phases advance in order)")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// Attempted any mutation on a terminated session
    #[error("Session is already {} and can no longer change", if *from == SessionStatus::Completed { "complete" } else { "failed" })]
    Terminal { from: SessionStatus },

    /// Attempted to record an installed component outside the Installing phase
    #[error("Cannot record installed component while {current} (only during Installing)")]
    NotInstalling { current: SessionStatus },

    /// fail() requires a non-empty reason
    #[error("Failure reason must not be empty")]
    EmptyFailureReason,
}

impl From<TransitionError> for crate::error::SetupError {
    fn from(err: TransitionError) -> Self {
        crate::error::SetupError::Transition(err.to_string())
    }
}

/// Unique identifier of an installation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session id from its string form.
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| crate::error::SetupError::validation(format!("invalid session id: {}", s)))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A component that was actually installed during the Installing phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledComponent {
    pub component: Component,
    pub version: String,
    pub package: Option<PackageInfo>,
}

impl InstalledComponent {
    pub fn new(
        component: Component,
        version: impl Into<String>,
        package: Option<PackageInfo>,
    ) -> Self {
        Self {
            component,
            version: version.into(),
            package,
        }
    }
}

/// Aggregate root tracking a single installation attempt's lifecycle.
///
/// The session owns its current status and provides validated transition
/// methods. Once a terminal status is reached every mutator returns an
/// error and the session is effectively frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationSession {
    id: SessionId,
    configuration: InstallationConfiguration,
    status: SessionStatus,
    snapshot: Option<SystemSnapshot>,
    installed: Vec<InstalledComponent>,
    failure_reason: String,
    started_at: u64,
    completed_at: Option<u64>,
}

impl InstallationSession {
    /// Create a new session in the Pending status from a validated
    /// configuration.
    pub fn new(configuration: InstallationConfiguration) -> Self {
        Self {
            id: SessionId::new(),
            configuration,
            status: SessionStatus::Pending,
            snapshot: None,
            installed: Vec::new(),
            failure_reason: String::new(),
            started_at: unix_now(),
            completed_at: None,
        }
    }

    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn configuration(&self) -> &InstallationConfiguration {
        &self.configuration
    }

    pub fn snapshot(&self) -> Option<&SystemSnapshot> {
        self.snapshot.as_ref()
    }

    /// The components installed so far, in installation order.
    /// Returns a copy; the internal sequence is never handed out.
    pub fn installed_components(&self) -> Vec<InstalledComponent> {
        self.installed.clone()
    }

    /// Number of packages recorded as installed.
    #[inline]
    pub fn package_count(&self) -> usize {
        self.installed.len()
    }

    /// Empty unless the session has failed.
    pub fn failure_reason(&self) -> &str {
        &self.failure_reason
    }

    #[inline]
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    #[inline]
    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at
    }

    /// Returns true if the session has reached Completed or Failed
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move from Pending to Preparation, storing the captured snapshot.
    ///
    /// # Errors
    ///
    /// - `Terminal` if the session has already terminated
    /// - `InvalidTransition` from any status other than Pending
    pub fn start_preparation(&mut self, snapshot: SystemSnapshot) -> Result<(), TransitionError> {
        self.check_advance(SessionStatus::Pending, SessionStatus::Preparation)?;
        self.snapshot = Some(snapshot);
        self.status = SessionStatus::Preparation;
        Ok(())
    }

    /// Move from Preparation to Installing.
    pub fn start_installing(&mut self) -> Result<(), TransitionError> {
        self.check_advance(SessionStatus::Preparation, SessionStatus::Installing)?;
        self.status = SessionStatus::Installing;
        Ok(())
    }

    /// Record a component as installed. Valid only while Installing.
    ///
    /// Append order is preserved and matches installation order; this
    /// sequence becomes the canonical package list for history.
    pub fn add_installed_component(
        &mut self,
        component: InstalledComponent,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal { from: self.status });
        }
        if self.status != SessionStatus::Installing {
            return Err(TransitionError::NotInstalling {
                current: self.status,
            });
        }
        self.installed.push(component);
        Ok(())
    }

    /// Move from Installing to Configuring.
    pub fn start_configuring(&mut self) -> Result<(), TransitionError> {
        self.check_advance(SessionStatus::Installing, SessionStatus::Configuring)?;
        self.status = SessionStatus::Configuring;
        Ok(())
    }

    /// Move from Configuring to Verifying.
    pub fn start_verifying(&mut self) -> Result<(), TransitionError> {
        self.check_advance(SessionStatus::Configuring, SessionStatus::Verifying)?;
        self.status = SessionStatus::Verifying;
        Ok(())
    }

    /// Move from Verifying to Completed and stamp the completion time.
    ///
    /// A second call is rejected with `Terminal`, not silently ignored.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.check_advance(SessionStatus::Verifying, SessionStatus::Completed)?;
        self.status = SessionStatus::Completed;
        self.completed_at = Some(unix_now());
        Ok(())
    }

    /// Mark the session as failed. Valid from any non-terminal status.
    ///
    /// Used both for genuine failures and for explicit cancellation; a
    /// cancellation reason conventionally contains the word "cancelled" so
    /// downstream consumers can tell the causes apart.
    ///
    /// # Errors
    ///
    /// - `Terminal` if the session has already terminated
    /// - `EmptyFailureReason` if the reason is blank
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal { from: self.status });
        }
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(TransitionError::EmptyFailureReason);
        }
        self.failure_reason = reason;
        self.status = SessionStatus::Failed;
        self.completed_at = Some(unix_now());
        Ok(())
    }

    /// Shared guard for forward phase advances.
    fn check_advance(
        &self,
        expected_from: SessionStatus,
        to: SessionStatus,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal { from: self.status });
        }
        if self.status != expected_from {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }
}
