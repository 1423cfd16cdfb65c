// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session storage.
//!
//! A session lives in three places at once:
//! - in memory, as the [`AuthState`] observed by the rest of the application,
//! - in a persistent [`KeyValueStore`] that survives restarts,
//! - in [`SessionCookies`], for server-rendered contexts and the API itself.
//!
//! [`SessionStore`] is the only code path that writes or clears any of them,
//! so token and user can never be stored or removed separately.

pub mod cookies;
pub mod file;
pub mod memory;

pub use cookies::SessionCookies;
pub use file::FileStore;
pub use memory::MemoryStore;

use std::sync::Arc;
use tokio::sync::watch;

use crate::models::{AuthPhase, AuthState, TokenPair, User};

/// Storage keys, shared by the persistent store and the cookie jar.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const USER: &str = "user";

    pub const ALL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER];
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent string key-value store (the equivalent of browser local storage).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Write several entries. Stores that can do so write them in one step.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several entries. Stores that can do so remove them in one step.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// A complete session as written by login, registration and verification.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Fan-out writer over memory, persistent storage and cookies.
pub struct SessionStore {
    persistent: Arc<dyn KeyValueStore>,
    cookies: Arc<SessionCookies>,
    state: watch::Sender<AuthState>,
    cookie_max_age: time::Duration,
}

impl SessionStore {
    pub fn new(
        persistent: Arc<dyn KeyValueStore>,
        cookies: Arc<SessionCookies>,
        cookie_max_age_secs: i64,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            persistent,
            cookies,
            state,
            cookie_max_age: time::Duration::seconds(cookie_max_age_secs),
        }
    }

    /// In-memory store with a fresh cookie jar and the default cookie lifetime.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SessionCookies::new()),
            crate::config::DEFAULT_COOKIE_MAX_AGE_SECS,
        )
    }

    pub fn cookies(&self) -> &Arc<SessionCookies> {
        &self.cookies
    }

    // ─── Memory ──────────────────────────────────────────────────────────────

    /// Snapshot of the current auth state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every auth state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Mutate transient fields (loading flag, error, phase) of the auth state.
    pub fn update_state(&self, f: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(f);
    }

    // ─── Reads (persistent store) ────────────────────────────────────────────

    pub fn access_token(&self) -> Option<String> {
        self.read(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(keys::REFRESH_TOKEN)
    }

    /// Stored user record. A record that no longer parses counts as absent.
    pub fn stored_user(&self) -> Option<User> {
        let raw = self.read(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparsable stored user record");
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.persistent.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    // ─── Writes ──────────────────────────────────────────────────────────────

    /// Write a complete session to all three sinks.
    ///
    /// A failed persistent write is rolled back by clearing everything, so the
    /// sinks never disagree about who is logged in.
    pub fn persist(&self, session: &StoredSession) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&session.user)?;

        let mut entries = vec![
            (keys::ACCESS_TOKEN, session.access_token.as_str()),
            (keys::USER, user_json.as_str()),
        ];
        if let Some(refresh) = session.refresh_token.as_deref() {
            entries.push((keys::REFRESH_TOKEN, refresh));
        }

        let written = self.persistent.set_many(&entries).and_then(|_| {
            if session.refresh_token.is_none() {
                self.persistent.remove(keys::REFRESH_TOKEN)
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            tracing::error!(error = %e, "Failed to persist session, rolling back");
            self.clear();
            return Err(e);
        }

        for (key, value) in &entries {
            self.cookies.set(key, value, self.cookie_max_age);
        }
        if session.refresh_token.is_none() {
            self.cookies.remove(keys::REFRESH_TOKEN);
        }

        let user = session.user.clone();
        self.state.send_modify(|state| {
            state.phase = AuthPhase::Authenticated;
            state.user = Some(user);
            state.is_loading = false;
            state.error = None;
        });

        tracing::debug!(user_id = %session.user.id, "Session persisted");
        Ok(())
    }

    /// Overwrite the stored tokens, leaving the user record alone.
    pub fn persist_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let mut entries = vec![(keys::ACCESS_TOKEN, tokens.access_token.as_str())];
        if let Some(refresh) = tokens.refresh_token.as_deref() {
            entries.push((keys::REFRESH_TOKEN, refresh));
        }

        self.persistent.set_many(&entries)?;
        for (key, value) in &entries {
            self.cookies.set(key, value, self.cookie_max_age);
        }
        Ok(())
    }

    /// Replace the stored user record of the current session.
    pub fn persist_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.persistent.set(keys::USER, &user_json)?;
        self.cookies.set(keys::USER, &user_json, self.cookie_max_age);

        let user = user.clone();
        self.state.send_modify(|state| state.user = Some(user));
        Ok(())
    }

    /// Remove the session from all three sinks.
    ///
    /// Never fails: a storage error is logged and the remaining sinks are still
    /// cleared. Every cookie in the jar is dropped, not only the session ones.
    pub fn clear(&self) {
        if let Err(e) = self.persistent.remove_many(&keys::ALL) {
            tracing::warn!(error = %e, "Failed to clear persistent session storage");
        }
        self.cookies.clear();
        self.state.send_modify(|state| {
            state.phase = AuthPhase::Anonymous;
            state.user = None;
            state.is_loading = false;
        });
    }
}
