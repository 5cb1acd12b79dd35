//! Session holder and auth observer hub
//!
//! Owns the current [`AuthSession`], optionally mirrors it to a JSON file,
//! and notifies registered listeners on every change. Persistence failures
//! never fail the session update: the in-memory copy stays authoritative.

use crate::auth::{AuthEvent, AuthEventKind, AuthListener, AuthProvider, AuthSubscription};
use dashmap::DashMap;
use parking_lot::RwLock;
use reframe_model::{AuthSession, AuthUser};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Current session plus its listeners
#[derive(Default)]
pub struct SessionStore {
    session: RwLock<Option<AuthSession>>,
    listeners: Arc<DashMap<u64, AuthListener>>,
    next_listener: AtomicU64,
    persist_path: Option<PathBuf>,
}

impl SessionStore {
    /// Session kept in memory only
    #[inline]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Session mirrored to `path`, restoring whatever is already there
    #[must_use]
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = load_session(&path);
        if restored.is_some() {
            tracing::debug!(path = %path.display(), "restored persisted session");
        }
        Self {
            session: RwLock::new(restored),
            persist_path: Some(path),
            ..Self::default()
        }
    }

    /// Signed-in store, for tests and offline use
    #[must_use]
    pub fn signed_in(session: AuthSession) -> Self {
        let store = Self::in_memory();
        *store.session.write() = Some(session);
        store
    }

    #[must_use]
    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.session
            .read()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    /// Install a session
    ///
    /// Emits `SignedIn` when the identity changes, `TokenRefreshed` otherwise.
    pub fn set_session(&self, session: AuthSession) {
        let user = session.user.clone();
        let previous = self.session.write().replace(session);

        let kind = match previous {
            Some(prev) if prev.user.id == user.id => AuthEventKind::TokenRefreshed,
            _ => AuthEventKind::SignedIn,
        };
        self.persist();
        tracing::info!(user = %user.id, ?kind, "session updated");
        self.notify(&AuthEvent {
            kind,
            user: Some(user),
        });
    }

    /// Replace the user on the current session
    pub fn update_user(&self, user: AuthUser) {
        {
            let mut guard = self.session.write();
            let Some(session) = guard.as_mut() else {
                return;
            };
            session.user = user.clone();
        }
        self.persist();
        self.notify(&AuthEvent {
            kind: AuthEventKind::UserUpdated,
            user: Some(user),
        });
    }

    /// Drop the session; emits `SignedOut` if there was one
    pub fn clear(&self) {
        let previous = self.session.write().take();
        if previous.is_none() {
            return;
        }
        self.persist();
        tracing::info!("signed out");
        self.notify(&AuthEvent {
            kind: AuthEventKind::SignedOut,
            user: None,
        });
    }

    /// Number of live listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, event: &AuthEvent) {
        // Snapshot first so listeners may (un)subscribe re-entrantly
        let listeners: Vec<AuthListener> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let snapshot = self.session.read().clone();
        let result = match snapshot {
            Some(session) => write_session(path, &session),
            None => match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.to_string()),
                _ => Ok(()),
            },
        };
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "session persistence failed, keeping in-memory session");
        }
    }
}

impl AuthProvider for SessionStore {
    fn current_user(&self) -> Option<AuthUser> {
        self.session.read().as_ref().map(|s| s.user.clone())
    }

    fn on_auth_change(&self, listener: AuthListener) -> AuthSubscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, listener);

        let registry: Weak<DashMap<u64, AuthListener>> = Arc::downgrade(&self.listeners);
        AuthSubscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(&id);
            }
        })
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.session.read().is_some())
            .field("listeners", &self.listeners.len())
            .field("persist_path", &self.persist_path)
            .finish()
    }
}

fn load_session(path: &Path) -> Option<AuthSession> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read persisted session");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed persisted session");
            None
        }
    }
}

fn write_session(path: &Path, session: &AuthSession) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let body = serde_json::to_vec_pretty(session).map_err(|e| e.to_string())?;
    std::fs::write(path, body).map_err(|e| e.to_string())
}
