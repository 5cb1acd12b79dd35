//! Auth state observation
//!
//! The identity holder exposes the current user and a subscription for
//! changes. A subscription ends when it is dropped or unsubscribed.

use reframe_model::AuthUser;
use std::fmt;
use std::sync::Arc;

/// What happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl AuthEventKind {
    /// Whether the identity itself changed (as opposed to a token refresh)
    #[inline]
    #[must_use]
    pub fn changes_identity(self) -> bool {
        matches!(self, Self::SignedIn | Self::SignedOut)
    }
}

/// Auth state change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    /// User after the change; `None` once signed out
    pub user: Option<AuthUser>,
}

/// Callback invoked on every auth change
pub type AuthListener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Source of the current identity
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;

    /// Register `listener`; it stays registered while the subscription lives
    fn on_auth_change(&self, listener: AuthListener) -> AuthSubscription;
}

/// Handle to a registered auth listener
#[must_use = "dropping the subscription unregisters the listener"]
pub struct AuthSubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl AuthSubscription {
    /// Subscription that runs `cancel` when it ends
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Subscription for providers that never emit
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// End the subscription now
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
