//! Reframe Model - domain types for before/after transformations
//!
//! A transformation pairs a "before" photo with an optional "after" photo:
//! - [`Transformation`]: the persisted record
//! - [`PhotoSlot`], [`LocalPhoto`], [`PhotoUrl`]: photos on either side of an upload
//! - [`AuthUser`], [`AuthSession`]: the signed-in identity
//! - [`Author`]: presentation-only owner name resolution
//!
//! # Example
//!
//! ```rust
//! use reframe_model::{PhotoUrl, RecordQuery, UserId};
//!
//! let url = PhotoUrl::new("https://cdn/before1.jpg").unwrap();
//! assert_eq!(url.as_str(), "https://cdn/before1.jpg");
//!
//! let query = RecordQuery::drafts().owned_by(UserId::new("u-1"));
//! assert!(query.owner.is_some());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod author;
pub mod error;
pub mod ids;
pub mod photo;
pub mod transformation;
pub mod user;

pub use author::{placeholder_name, Author, ANONYMOUS_NAME, PLACEHOLDER_NAMES};
pub use error::ModelError;
pub use ids::{TransformationId, UserId};
pub use photo::{LocalPhoto, PhotoSlot, PhotoUrl};
pub use transformation::{Completion, NewTransformation, RecordQuery, Transformation};
pub use user::{AuthSession, AuthUser, UserMetadata};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
