//! Persisted login state.
//!
//! The token and cached profile live in `auth.json` under the data
//! directory. [`AuthStore`] is created once at start-up and handed to
//! whoever needs it; nothing reads the file behind its back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::UserProfile;
use crate::error::AuthError;
use crate::storage::data_dir;

/// Bearer token plus the profile returned at login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

/// File-backed storage for the current [`AuthSession`].
#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    /// Store at `<data_dir>/auth.json`.
    pub fn open_default() -> Result<Self, AuthError> {
        let dir = data_dir().map_err(|e| AuthError::Storage {
            path: PathBuf::from("auth.json"),
            message: e.to_string(),
        })?;
        Ok(Self::at(dir.join("auth.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session, or `None` when logged out.
    pub fn load(&self) -> Result<Option<AuthSession>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| self.storage_error(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.storage_error(e)),
        }
    }

    /// The stored session, failing with [`AuthError::NotLoggedIn`] if absent.
    pub fn require(&self) -> Result<AuthSession, AuthError> {
        self.load()?.ok_or(AuthError::NotLoggedIn)
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        let content = serde_json::to_string_pretty(session).map_err(|e| self.storage_error(e))?;
        std::fs::write(&self.path, content).map_err(|e| self.storage_error(e))?;
        tracing::debug!(path = %self.path.display(), "auth session saved");
        Ok(())
    }

    /// Replace the cached profile, keeping the token.
    pub fn update_profile(&self, user: UserProfile) -> Result<AuthSession, AuthError> {
        let mut session = self.require()?;
        session.user = user;
        self.save(&session)?;
        Ok(session)
    }

    /// Forget the session. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error(e)),
        }
    }

    fn storage_error(&self, e: impl std::fmt::Display) -> AuthError {
        AuthError::Storage {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}
