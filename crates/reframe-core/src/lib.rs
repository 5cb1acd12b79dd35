//! Reframe Core - transformation workflow
//!
//! The controller that takes one before/after transformation from
//! camera to stored record:
//! - Explicit state enum, changed only through the transition table
//! - Best-effort preprocessing, bounded uploads and record calls
//! - Rollback to the captured state on failure, orphan tracking when a
//!   record call fails after an upload
//! - Draft listing, feed and profile queries
//! - Reset on sign-in/sign-out via the auth observer
//!
//! # Example
//!
//! ```rust,ignore
//! use reframe_backend::{Backend, MemoryObjectStorage, MemoryRecordStore, SessionStore};
//! use reframe_core::{TransformationWorkflow, WorkflowConfig};
//! use reframe_model::{LocalPhoto, PhotoSlot};
//! use std::sync::Arc;
//!
//! # async fn example(session: Arc<SessionStore>) -> reframe_core::Result<()> {
//! let backend = Backend::new(
//!     Arc::new(MemoryObjectStorage::default()),
//!     Arc::new(MemoryRecordStore::new()),
//!     session,
//! );
//! let workflow = TransformationWorkflow::new(backend, WorkflowConfig::new());
//!
//! workflow.accept_photo(PhotoSlot::Before, LocalPhoto::new("file://a.jpg"))?;
//! let draft = workflow.submit_captured_photo().await?;
//! println!("saved draft {}", draft.id);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod feed;
pub mod orphans;
pub mod state;
pub mod state_machine;

pub use config::WorkflowConfig;
pub use controller::TransformationWorkflow;
pub use error::{ErrorKind, Result, WorkflowError};
pub use events::{StateChangeEvent, WorkflowEvent};
pub use feed::{FeedEntry, Profile};
pub use orphans::{OrphanReason, OrphanedPhoto, SweepReport};
pub use state::{StateKind, WorkflowState};
pub use state_machine::{allowed_transitions, validate_transition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the workflow
    pub use crate::{
        StateKind, TransformationWorkflow, WorkflowConfig, WorkflowError, WorkflowEvent,
        WorkflowState,
    };
    pub use reframe_model::{LocalPhoto, PhotoSlot, Transformation, TransformationId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
