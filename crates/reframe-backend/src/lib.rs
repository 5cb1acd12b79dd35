//! Reframe Backend - collaborator contracts
//!
//! Everything the workflow controller depends on, expressed as traits:
//! - [`PhotoCapture`]: camera access
//! - [`ImagePreprocessor`]: resize/compress before upload
//! - [`ObjectStorage`]: photo uploads and deletes
//! - [`RecordStore`]: transformation rows
//! - [`AuthProvider`]: current identity and change notifications
//!
//! Plus the implementations that need no network: [`SessionStore`],
//! [`JpegPreprocessor`], [`MemoryObjectStorage`], [`MemoryRecordStore`].
//!
//! # Example
//!
//! ```rust
//! use reframe_backend::{Backend, MemoryObjectStorage, MemoryRecordStore, SessionStore};
//! use std::sync::Arc;
//!
//! let backend = Backend::new(
//!     Arc::new(MemoryObjectStorage::default()),
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(SessionStore::in_memory()),
//! );
//! # let _ = backend;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
pub mod capture;
pub mod client;
pub mod error;
pub mod memory;
pub mod preprocess;
pub mod records;
pub mod session;
pub mod storage;

pub use auth::{AuthEvent, AuthEventKind, AuthListener, AuthProvider, AuthSubscription};
pub use capture::{FileCapture, NoCamera, PhotoCapture};
pub use client::Backend;
pub use error::{AuthError, CaptureError, PreprocessError, StoreError, UploadError};
pub use memory::{MemoryObjectStorage, MemoryRecordStore};
pub use preprocess::{ImagePreprocessor, JpegPreprocessor, PassthroughPreprocessor, PreprocessConfig};
pub use records::RecordStore;
pub use session::SessionStore;
pub use storage::ObjectStorage;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
