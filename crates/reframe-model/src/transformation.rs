//! The transformation record and queries over it

use crate::ids::{TransformationId, UserId};
use crate::photo::PhotoUrl;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted before/after pair
///
/// Complete iff `after_photo_url` is present, a draft otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: TransformationId,
    pub before_photo_url: PhotoUrl,
    #[serde(default)]
    pub after_photo_url: Option<PhotoUrl>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Transformation {
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.after_photo_url.is_some()
    }

    #[inline]
    #[must_use]
    pub fn completion(&self) -> Completion {
        if self.is_complete() {
            Completion::Complete
        } else {
            Completion::Draft
        }
    }

    /// Whether `user` owns this record
    #[inline]
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id.as_ref() == Some(user)
    }
}

/// Completion state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completion {
    /// Before photo only
    Draft,
    /// Both photos
    Complete,
}

impl Completion {
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Complete => "complete",
        }
    }
}

/// Insert payload for a fresh draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransformation {
    pub before_photo_url: PhotoUrl,
    pub user_id: Option<UserId>,
}

impl NewTransformation {
    #[inline]
    #[must_use]
    pub fn new(before_photo_url: PhotoUrl) -> Self {
        Self {
            before_photo_url,
            user_id: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn owned_by(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }
}

/// Record store query: completion filter plus optional owner filter
///
/// Results are always ordered by `created_at`, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// `None` matches both drafts and complete records
    pub completion: Option<Completion>,
    pub owner: Option<UserId>,
}

impl RecordQuery {
    /// Every record
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Records without an after photo
    #[inline]
    #[must_use]
    pub fn drafts() -> Self {
        Self {
            completion: Some(Completion::Draft),
            owner: None,
        }
    }

    /// Records with both photos
    #[inline]
    #[must_use]
    pub fn completed() -> Self {
        Self {
            completion: Some(Completion::Complete),
            owner: None,
        }
    }

    /// Restrict to one owner
    #[inline]
    #[must_use]
    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Whether a record satisfies both filters
    #[must_use]
    pub fn matches(&self, record: &Transformation) -> bool {
        let completion_ok = self
            .completion
            .map_or(true, |c| record.completion() == c);
        let owner_ok = self
            .owner
            .as_ref()
            .map_or(true, |owner| record.is_owned_by(owner));
        completion_ok && owner_ok
    }
}
