//! Ephemeral session state — the auth token and user profile for the
//! demo session mechanism.
//!
//! Held only in memory for the lifetime of the client; cleared on logout
//! or on any 401 from the collaborator (the HTTP client does the
//! clearing).

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionData {
    token: String,
    user: Option<UserProfile>,
}

/// In-memory session store, shared with the HTTP client.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<Option<SessionData>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh session after login.
    pub fn store(&self, token: impl Into<String>, user: Option<UserProfile>) {
        let mut guard = self.write();
        *guard = Some(SessionData {
            token: token.into(),
            user,
        });
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Drop the session. Called on logout and on any 401 response.
    pub fn clear(&self) {
        let mut guard = self.write();
        if guard.is_some() {
            tracing::info!("Session cleared");
        }
        *guard = None;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SessionData>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SessionData>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
