//! Durable session storage.
//!
//! The store owns the on-disk copy of "who is logged in" - the bearer
//! token and the user profile, written and removed together so a partial
//! session can never survive - plus an in-memory mirror for fast
//! synchronous reads. A shared `TokenCell` lets the HTTP transport read
//! the current token at request time without touching the store itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::User;

/// Storage key for the raw bearer token
const TOKEN_KEY: &str = "token";

/// Storage key for the JSON-serialized user profile
const USER_KEY: &str = "user";

/// Shared, synchronously readable slot for the current bearer token.
///
/// The store writes it on every save/clear; the transport reads it at
/// call time. Cheap to clone.
#[derive(Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn get(&self) -> Option<String> {
        self.0.read().map(|guard| guard.clone()).unwrap_or(None)
    }

    pub(crate) fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.0.write() {
            *guard = token;
        }
    }
}

/// The token/profile pair as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

enum Backend {
    Disk(PathBuf),
    /// Non-persistent execution context: no I/O, loads always report absent.
    Ephemeral,
}

pub struct SessionStore {
    backend: Backend,
    tokens: TokenCell,
    current: Option<StoredSession>,
}

impl SessionStore {
    /// Open a store backed by the given directory.
    pub fn open(dir: PathBuf) -> Self {
        Self {
            backend: Backend::Disk(dir),
            tokens: TokenCell::default(),
            current: None,
        }
    }

    /// Store for contexts without durable storage. All disk operations
    /// are no-ops; the in-memory mirror still tracks the live session.
    pub fn ephemeral() -> Self {
        Self {
            backend: Backend::Ephemeral,
            tokens: TokenCell::default(),
            current: None,
        }
    }

    /// Open the store at the configured location, falling back to an
    /// ephemeral store when no data directory is available.
    pub fn from_config(config: &Config) -> Self {
        match config.storage_dir() {
            Some(dir) => Self::open(dir),
            None => {
                debug!("no data directory available; session will not persist");
                Self::ephemeral()
            }
        }
    }

    /// Handle for the transport to read the current token at call time.
    pub fn token_cell(&self) -> TokenCell {
        self.tokens.clone()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    /// Read the persisted session, if any.
    ///
    /// Missing keys, an empty token, or an unparseable profile all degrade
    /// to "no session": both keys are removed so a half-populated session
    /// can never be observed. Never returns an error.
    pub fn load(&mut self) -> Option<StoredSession> {
        let Backend::Disk(ref dir) = self.backend else {
            return None;
        };

        match Self::read_pair(dir) {
            Ok(Some(session)) => {
                self.tokens.set(Some(session.token.clone()));
                self.current = Some(session.clone());
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                self.remove_keys();
                None
            }
        }
    }

    /// Persist the token/profile pair. On partial failure both keys are
    /// removed so the caller never observes half a session.
    pub fn save(&mut self, token: &str, user: &User) -> Result<()> {
        if let Backend::Disk(ref dir) = self.backend {
            if let Err(e) = Self::write_pair(dir, token, user) {
                self.remove_keys();
                self.tokens.set(None);
                self.current = None;
                return Err(e);
            }
        }

        self.current = Some(StoredSession {
            token: token.to_string(),
            user: user.clone(),
        });
        self.tokens.set(Some(token.to_string()));
        Ok(())
    }

    /// Remove both keys unconditionally. Idempotent; fs errors are logged,
    /// not propagated.
    pub fn clear(&mut self) {
        self.current = None;
        self.tokens.set(None);
        self.remove_keys();
    }

    fn read_pair(dir: &Path) -> Result<Option<StoredSession>> {
        let token_path = dir.join(TOKEN_KEY);
        let user_path = dir.join(USER_KEY);

        if !token_path.exists() && !user_path.exists() {
            return Ok(None);
        }

        // The token is opaque; it is stored and returned byte-for-byte
        let token = fs::read_to_string(&token_path).context("failed to read stored token")?;
        if token.trim().is_empty() {
            anyhow::bail!("stored token is empty");
        }

        let raw = fs::read_to_string(&user_path).context("failed to read stored user")?;
        let user: User = serde_json::from_str(&raw).context("failed to parse stored user")?;

        Ok(Some(StoredSession { token, user }))
    }

    fn write_pair(dir: &Path, token: &str, user: &User) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;

        fs::write(dir.join(TOKEN_KEY), token).context("failed to write token")?;

        let json = serde_json::to_string(user).context("failed to serialize user")?;
        fs::write(dir.join(USER_KEY), json).context("failed to write user")?;

        Ok(())
    }

    fn remove_keys(&self) {
        let Backend::Disk(ref dir) = self.backend else {
            return;
        };
        for key in [TOKEN_KEY, USER_KEY] {
            let path = dir.join(key);
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(key, error = %e, "failed to remove session key");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let user = sample_user();

        let mut store = SessionStore::open(dir.path().to_path_buf());
        store.save("T1", &user).expect("Failed to save session");

        // A fresh store against the same directory must see the session
        let mut reopened = SessionStore::open(dir.path().to_path_buf());
        let loaded = reopened.load().expect("Expected a stored session");
        assert_eq!(loaded.token, "T1");
        assert_eq!(loaded.user, user);
        assert_eq!(reopened.token(), Some("T1"));
        assert_eq!(reopened.token_cell().get().as_deref(), Some("T1"));
    }

    #[test]
    fn test_load_with_nothing_stored_reports_absent() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = SessionStore::open(dir.path().to_path_buf());
        assert!(store.load().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_corrupt_user_discards_both_keys() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join(TOKEN_KEY), "T1").unwrap();
        fs::write(dir.path().join(USER_KEY), "{not json").unwrap();

        let mut store = SessionStore::open(dir.path().to_path_buf());
        assert!(store.load().is_none());
        assert!(!dir.path().join(TOKEN_KEY).exists());
        assert!(!dir.path().join(USER_KEY).exists());
        assert!(store.token_cell().get().is_none());
    }

    #[test]
    fn test_token_without_user_discards_both_keys() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join(TOKEN_KEY), "T1").unwrap();

        let mut store = SessionStore::open(dir.path().to_path_buf());
        assert!(store.load().is_none());
        assert!(!dir.path().join(TOKEN_KEY).exists());
    }

    #[test]
    fn test_empty_token_treated_as_absent() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join(TOKEN_KEY), "  \n").unwrap();
        fs::write(
            dir.path().join(USER_KEY),
            serde_json::to_string(&sample_user()).unwrap(),
        )
        .unwrap();

        let mut store = SessionStore::open(dir.path().to_path_buf());
        assert!(store.load().is_none());
        assert!(!dir.path().join(USER_KEY).exists());
    }

    #[test]
    fn test_token_round_trips_byte_for_byte() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let token = " T1.with spaces \n";

        let mut store = SessionStore::open(dir.path().to_path_buf());
        store.save(token, &sample_user()).expect("Failed to save session");

        let mut reopened = SessionStore::open(dir.path().to_path_buf());
        let loaded = reopened.load().expect("Expected a stored session");
        assert_eq!(loaded.token, token);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = SessionStore::open(dir.path().to_path_buf());
        store.save("T1", &sample_user()).expect("Failed to save session");

        store.clear();
        assert!(store.token().is_none());
        assert!(!dir.path().join(TOKEN_KEY).exists());

        // Second clear must behave identically
        store.clear();
        assert!(store.token().is_none());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_ephemeral_store_skips_disk_but_tracks_session() {
        let mut store = SessionStore::ephemeral();
        assert!(store.load().is_none());

        store.save("T1", &sample_user()).expect("Ephemeral save failed");
        assert_eq!(store.token(), Some("T1"));
        assert_eq!(store.token_cell().get().as_deref(), Some("T1"));

        // The durable side always reports absent
        assert!(store.load().is_none());

        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_save_replaces_previous_session() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut store = SessionStore::open(dir.path().to_path_buf());
        store.save("T1", &sample_user()).unwrap();

        let other = User {
            id: 2,
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
        };
        store.save("T2", &other).unwrap();

        let mut reopened = SessionStore::open(dir.path().to_path_buf());
        let loaded = reopened.load().expect("Expected a stored session");
        assert_eq!(loaded.token, "T2");
        assert_eq!(loaded.user, other);
    }
}
