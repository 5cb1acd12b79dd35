//! Presentation-only owner names, resolved at read time

use crate::ids::UserId;
use crate::user::AuthUser;
use serde::{Deserialize, Serialize};

/// Name shown for records with no resolvable owner
pub const ANONYMOUS_NAME: &str = "Anonymous User";

/// Stable pseudonyms for other users' posts
pub const PLACEHOLDER_NAMES: [&str; 10] = [
    "Alex", "Jordan", "Casey", "Riley", "Avery", "Quinn", "Sage", "River", "Phoenix", "Rowan",
];

/// Deterministic placeholder for another user
///
/// Uses the last hex digit of the id's first `-` segment.
#[must_use]
pub fn placeholder_name(user_id: &UserId) -> Option<&'static str> {
    let head = user_id.as_str().split('-').next()?;
    let digit = head.chars().last()?.to_digit(16)?;
    PLACEHOLDER_NAMES
        .get(digit as usize % PLACEHOLDER_NAMES.len())
        .copied()
}

/// Who a record is shown as belonging to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_current_user: bool,
}

impl Author {
    /// Resolve the author of a record owned by `owner`, as seen by `viewer`
    #[must_use]
    pub fn resolve(owner: Option<&UserId>, viewer: Option<&AuthUser>) -> Self {
        match (owner, viewer) {
            (Some(owner), Some(viewer)) if *owner == viewer.id => Self {
                name: viewer.display_name(),
                avatar_url: viewer.avatar(),
                is_current_user: true,
            },
            (Some(owner), _) => Self::named(placeholder_name(owner).unwrap_or(ANONYMOUS_NAME)),
            (None, _) => Self::named(ANONYMOUS_NAME),
        }
    }

    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            avatar_url: None,
            is_current_user: false,
        }
    }
}
