//! Read-only views for the feed and profile screens

use reframe_model::{AuthUser, Author, Transformation};
use serde::Serialize;

/// A completed transformation with its display author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub transformation: Transformation,
    pub author: Author,
}

impl FeedEntry {
    /// Attach authors to `records` as seen by `viewer`
    #[must_use]
    pub fn resolve_all(records: Vec<Transformation>, viewer: Option<&AuthUser>) -> Vec<Self> {
        records
            .into_iter()
            .map(|transformation| {
                let author = Author::resolve(transformation.user_id.as_ref(), viewer);
                Self {
                    transformation,
                    author,
                }
            })
            .collect()
    }
}

/// The signed-in user's own transformations
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user: AuthUser,
    pub author: Author,
    /// Drafts and completed records, newest first
    pub transformations: Vec<Transformation>,
    pub completed: usize,
    pub total: usize,
}

impl Profile {
    #[must_use]
    pub fn new(user: AuthUser, transformations: Vec<Transformation>) -> Self {
        let completed = transformations.iter().filter(|t| t.is_complete()).count();
        let author = Author::resolve(Some(&user.id), Some(&user));
        Self {
            total: transformations.len(),
            completed,
            author,
            user,
            transformations,
        }
    }

    #[inline]
    #[must_use]
    pub fn drafts(&self) -> usize {
        self.total - self.completed
    }
}
