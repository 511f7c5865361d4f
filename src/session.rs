//! Session store for the authenticated user.
//!
//! The session is two small files in the config directory: `labhub_username`
//! (the plain username) and `labhub_auth` (the JSON auth payload returned by
//! the server, expected to carry an `access` bearer token). The store is a
//! single injected value — the API client and the UI both hold clones of it
//! instead of reading the files ad hoc — and exposes `observe()` so the UI
//! can react to login/logout without polling.
//!
//! Reads are synchronous and infallible from the caller's point of view:
//! a missing or malformed auth blob is simply "no token", never an error.

use secrecy::SecretString;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// File holding the signed-in username.
const USERNAME_FILE: &str = "labhub_username";
/// File holding the auth payload JSON (contains the `access` token).
const AUTH_FILE: &str = "labhub_auth";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to persist session: {0}")]
    Io(#[from] std::io::Error),
}

/// File-backed session store with change notification.
///
/// Cheap to clone: clones share the same watch channel, so an observer
/// obtained from any clone sees saves and clears made through any other.
#[derive(Clone)]
pub struct SessionStore {
    dir: PathBuf,
    tx: Arc<watch::Sender<Option<String>>>,
}

impl SessionStore {
    /// Open the store rooted at `dir`, seeding the observer channel with
    /// whatever session is currently on disk.
    pub fn open(dir: &Path) -> Self {
        let store = Self {
            dir: dir.to_path_buf(),
            tx: Arc::new(watch::channel(None).0),
        };
        let existing = store.current();
        store.tx.send_replace(existing);
        store
    }

    /// Record `username` (and, if provided, the auth payload) as the current
    /// session. Called exactly once per successful login or registration.
    pub fn save(&self, username: &str, auth: Option<&Value>) -> Result<(), SessionError> {
        std::fs::write(self.dir.join(USERNAME_FILE), username)?;
        if let Some(auth) = auth {
            std::fs::write(self.dir.join(AUTH_FILE), auth.to_string())?;
        }
        self.tx.send_replace(Some(username.to_string()));
        tracing::info!(username = %username, "Session saved");
        Ok(())
    }

    /// The stored username, or `None` when signed out.
    pub fn current(&self) -> Option<String> {
        let raw = std::fs::read_to_string(self.dir.join(USERNAME_FILE)).ok()?;
        let name = raw.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// The bearer token from the stored auth payload, if one exists and the
    /// payload parses. Malformed stored data is treated as signed-out.
    pub fn token(&self) -> Option<SecretString> {
        let raw = std::fs::read_to_string(self.dir.join(AUTH_FILE)).ok()?;
        let value: Value = serde_json::from_str(&raw).ok()?;
        let access = value.get("access")?.as_str()?;
        if access.is_empty() {
            return None;
        }
        Some(SecretString::from(access.to_string()))
    }

    /// Remove all session data.
    pub fn clear(&self) -> Result<(), SessionError> {
        for file in [USERNAME_FILE, AUTH_FILE] {
            match std::fs::remove_file(self.dir.join(file)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SessionError::Io(e)),
            }
        }
        self.tx.send_replace(None);
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Subscribe to session changes. The receiver yields the current
    /// username, or `None` once the session is cleared.
    pub fn observe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
