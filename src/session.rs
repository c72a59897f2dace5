//! Persisted login session
//!
//! A single JSON file holding the verified identity, so the user does not
//! re-enter an OTP every run. Loading is tolerant: a missing or unreadable
//! file just means "not logged in".

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    pub user_id: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write session file: {0}")]
    Write(#[source] io::Error),
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$EPILOT_SESSION_PATH` if set, otherwise `~/.epilot/session.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("EPILOT_SESSION_PATH") {
            return PathBuf::from(path);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        Path::new(&home).join(".epilot").join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session, if any. Corrupt or unreadable files are
    /// treated as absent.
    pub fn load(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring corrupt session file");
                None
            }
        }
    }

    pub fn store(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(SessionError::Write)?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw).map_err(SessionError::Write)
    }

    /// Remove the stored session. Already-absent is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionError::Write(err)),
        }
    }
}
