//! Error types for the workflow controller
//!
//! Every collaborator failure is converted here, at the controller boundary:
//! - Capture failures (retry the capture)
//! - Upload failures (retry the submission with the same photo)
//! - Store failures, and store failures after an upload (orphaned photo)
//! - Missing identity
//! - Requests that do not fit the active state

use crate::state::StateKind;
use reframe_backend::{CaptureError, StoreError, UploadError};
use reframe_model::{PhotoSlot, PhotoUrl, TransformationId};

/// Main workflow error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Camera failed or access was refused
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// Photo upload failed; the captured photo is kept
    #[error("upload failed: {0}")]
    Upload(UploadError),

    /// Record store call failed
    #[error("record store failed: {0}")]
    Store(StoreError),

    /// Photo reached storage but no record references it
    #[error("{slot} photo uploaded to {url} but not recorded: {source}")]
    OrphanedUpload {
        url: PhotoUrl,
        slot: PhotoSlot,
        source: StoreError,
    },

    /// Operation needs a signed-in user
    #[error("sign in required")]
    AuthRequired,

    /// Transition rejected by the state table
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: StateKind, to: StateKind },

    /// An upload is in flight
    #[error("an upload is already in progress")]
    Busy,

    /// No captured photo waiting for upload
    #[error("no captured photo to submit")]
    NothingToSubmit,

    /// After photo requested with no draft loaded
    #[error("no active draft for an after photo")]
    NoActiveDraft,

    /// The active draft's before photo is already saved
    #[error("before photo of {0} is already saved")]
    BeforeAlreadySaved(TransformationId),

    #[error("transformation {0} is already complete")]
    AlreadyComplete(TransformationId),

    #[error("transformation {0} belongs to another user")]
    NotOwner(TransformationId),

    /// Active transformation was discarded while the call was in flight
    #[error("active transformation changed while saving")]
    Superseded {
        /// Record that was still written, if any
        saved: Option<TransformationId>,
    },
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Capture,
    Upload,
    Store,
    OrphanedUpload,
    AuthRequired,
    InvalidState,
    Superseded,
}

impl WorkflowError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Capture(_) => ErrorKind::Capture,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Store(_) => ErrorKind::Store,
            Self::OrphanedUpload { .. } => ErrorKind::OrphanedUpload,
            Self::AuthRequired => ErrorKind::AuthRequired,
            Self::IllegalTransition { .. }
            | Self::Busy
            | Self::NothingToSubmit
            | Self::NoActiveDraft
            | Self::BeforeAlreadySaved(_)
            | Self::AlreadyComplete(_)
            | Self::NotOwner(_) => ErrorKind::InvalidState,
            Self::Superseded { .. } => ErrorKind::Superseded,
        }
    }

    /// Check if repeating the same call can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Capture(CaptureError::PermissionDenied) => false,
            Self::Capture(_) | Self::Busy => true,
            Self::Upload(e) => e.is_retryable(),
            Self::Store(e) | Self::OrphanedUpload { source: e, .. } => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if signing in would resolve the error
    #[inline]
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired
                | Self::OrphanedUpload {
                    source: StoreError::Unauthorized,
                    ..
                }
        )
    }

    /// Check if an uploaded photo was left unreferenced
    #[inline]
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::OrphanedUpload { .. })
    }

    /// Create orphaned upload error
    #[inline]
    pub fn orphaned(url: PhotoUrl, slot: PhotoSlot, source: StoreError) -> Self {
        Self::OrphanedUpload { url, slot, source }
    }
}

impl From<UploadError> for WorkflowError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Unauthorized => Self::AuthRequired,
            other => Self::Upload(other),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized => Self::AuthRequired,
            other => Self::Store(other),
        }
    }
}

/// Result alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
