//! Signed-in identity as returned by the auth service

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// Profile metadata attached by the identity provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AuthUser {
    #[inline]
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            metadata: UserMetadata::default(),
            created_at: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: UserMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Name shown on the user's own posts
    ///
    /// `full_name`, then `name`, then the email local part, then `"You"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let email_local = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next());

        [
            self.metadata.full_name.as_deref(),
            self.metadata.name.as_deref(),
            email_local,
        ]
        .into_iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or("You")
        .to_string()
    }

    /// Avatar shown on the user's own posts
    #[must_use]
    pub fn avatar(&self) -> Option<String> {
        self.metadata
            .avatar_url
            .clone()
            .or_else(|| self.metadata.picture.clone())
    }
}

/// Bearer session issued by the auth service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    /// Unix seconds, when the service reports it
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl AuthSession {
    /// Whether the access token is past its expiry at `now` (unix seconds)
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
