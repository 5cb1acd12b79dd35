//! Error types for backend collaborators
//!
//! One enum per collaborator:
//! - Capture (camera hardware, permissions)
//! - Preprocess (decode/resize/encode, always recoverable)
//! - Upload (object storage)
//! - Store (record store)
//! - Auth (identity service)
//!
//! Payloads are plain strings so fakes can script and clone them.

use reframe_model::TransformationId;
use std::path::PathBuf;

/// Camera capture failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The user or OS refused camera access
    #[error("camera permission denied")]
    PermissionDenied,

    /// No capture device is available
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    /// The device failed to produce a photo
    #[error("capture failed: {0}")]
    Failed(String),
}

/// Image preprocessing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    /// Source could not be read
    #[error("io error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Source is not a decodable image
    #[error("decode failed: {0}")]
    Decode(String),

    /// Re-encoding failed
    #[error("encode failed: {0}")]
    Encode(String),

    /// Worker task failed
    #[error("preprocessing task failed: {0}")]
    Internal(String),
}

impl PreprocessError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }
}

/// Object storage failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// Local file is missing
    #[error("file does not exist: {0}")]
    MissingFile(PathBuf),

    /// Local file could not be read
    #[error("io error reading {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Storage service refused the request
    #[error("storage rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No authenticated identity
    #[error("storage requires an authenticated user")]
    Unauthorized,

    /// The URL does not point into this storage
    #[error("invalid storage url: {0}")]
    InvalidUrl(String),

    /// Request did not finish in time
    #[error("upload timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl UploadError {
    /// Whether retrying the same request can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Record store failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with this id
    #[error("transformation not found: {0}")]
    NotFound(TransformationId),

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Store refused the request
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No authenticated identity
    #[error("store requires an authenticated user")]
    Unauthorized,

    /// Response did not match the record shape
    #[error("malformed store response: {0}")]
    Decode(String),

    /// Request did not finish in time
    #[error("store request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl StoreError {
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Identity service failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Credentials or tokens were refused
    #[error("authentication rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Browser flow was cancelled or returned no token
    #[error("authentication was cancelled or failed")]
    Cancelled,

    /// Operation needs a session and there is none
    #[error("no active session")]
    NoSession,

    /// Response did not match the session shape
    #[error("malformed auth response: {0}")]
    Decode(String),
}
