//! Session repositories
//!
//! The repository is the sole synchronization point for session state: the
//! session itself performs no locking, so every backend here serializes
//! reads and writes and provides read-your-writes consistency per session
//! id. Orchestrators persist the session after every phase transition so a
//! separate status reader observes intermediate progress.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, SetupError};
use crate::session::{InstallationSession, SessionId};

/// Storage contract for installation sessions.
pub trait SessionRepository: Send + Sync {
    /// Insert or replace the stored state for this session's id.
    fn save(&self, session: &InstallationSession) -> Result<()>;

    /// Load a session by id.
    fn find_by_id(&self, id: SessionId) -> Result<InstallationSession>;

    /// All stored sessions, in unspecified order.
    fn list(&self) -> Result<Vec<InstallationSession>>;
}

/// In-memory repository backed by a mutex-guarded map.
///
/// The map itself is never exposed; callers only ever receive cloned
/// sessions.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<SessionId, InstallationSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn save(&self, session: &InstallationSession) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;
        sessions.insert(session.id(), session.clone());
        Ok(())
    }

    fn find_by_id(&self, id: SessionId) -> Result<InstallationSession> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;
        sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| SetupError::SessionNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<InstallationSession>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;
        Ok(sessions.values().cloned().collect())
    }
}

/// File-backed repository: one JSON document per session under a state
/// directory. A mutex serializes filesystem access so concurrent status
/// queries never observe a torn write.
#[derive(Debug)]
pub struct JsonFileSessionRepository {
    dir: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonFileSessionRepository {
    /// Open (creating if needed) a repository rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            io_lock: Mutex::new(()),
        })
    }

    fn session_path(&self, id: SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_session(path: &Path) -> Result<InstallationSession> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl SessionRepository for JsonFileSessionRepository {
    fn save(&self, session: &InstallationSession) -> Result<()> {
        let _guard = self
            .io_lock
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;

        let json = serde_json::to_string_pretty(session)?;
        let path = self.session_path(session.id());

        // Write to a sibling temp file then rename so a concurrent reader
        // never sees a half-written document.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn find_by_id(&self, id: SessionId) -> Result<InstallationSession> {
        let _guard = self
            .io_lock
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;

        let path = self.session_path(id);
        if !path.exists() {
            return Err(SetupError::SessionNotFound(id.to_string()));
        }
        Self::read_session(&path)
    }

    fn list(&self) -> Result<Vec<InstallationSession>> {
        let _guard = self
            .io_lock
            .lock()
            .map_err(|_| SetupError::general("session store mutex poisoned"))?;

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_session(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!("Skipping unreadable session file {:?}: {}", path, e);
                }
            }
        }
        Ok(sessions)
    }
}
