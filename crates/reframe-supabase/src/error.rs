//! Error types for the hosted backend client
//!
//! Transport failures are collected in [`HttpError`] and converted into
//! the collaborator error of whichever trait is being served.

use reframe_backend::{AuthError, StoreError, UploadError};

/// Client construction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupabaseError {
    /// Endpoint or key not configured
    #[error("missing configuration: set {0}")]
    MissingConfig(String),

    #[error("invalid project url {0}")]
    InvalidUrl(String),

    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Client(String),
}

/// A failed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("http {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl HttpError {
    /// 401/403 responses
    #[inline]
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

impl From<HttpError> for UploadError {
    fn from(err: HttpError) -> Self {
        match err {
            e if e.is_unauthorized() => Self::Unauthorized,
            HttpError::Transport(message) => Self::Network(message),
            HttpError::Timeout { secs } => Self::Timeout { secs },
            HttpError::Status { status, message } => Self::Rejected { status, message },
            HttpError::Decode(message) => Self::Network(format!("malformed response: {message}")),
        }
    }
}

impl From<HttpError> for StoreError {
    fn from(err: HttpError) -> Self {
        match err {
            e if e.is_unauthorized() => Self::Unauthorized,
            HttpError::Transport(message) => Self::Network(message),
            HttpError::Timeout { secs } => Self::Timeout { secs },
            HttpError::Status { status, message } => Self::Rejected { status, message },
            HttpError::Decode(message) => Self::Decode(message),
        }
    }
}

impl From<HttpError> for AuthError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Transport(message) => Self::Network(message),
            HttpError::Timeout { secs } => Self::Network(format!("timed out after {secs}s")),
            HttpError::Status { status, message } => Self::Rejected { status, message },
            HttpError::Decode(message) => Self::Decode(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_map_to_unauthorized() {
        let forbidden = HttpError::Status {
            status: 403,
            message: "new row violates row-level security policy".to_string(),
        };
        assert_eq!(UploadError::from(forbidden.clone()), UploadError::Unauthorized);
        assert_eq!(StoreError::from(forbidden.clone()), StoreError::Unauthorized);
        assert!(matches!(
            AuthError::from(forbidden),
            AuthError::Rejected { status: 403, .. }
        ));
    }

    #[test]
    fn other_failures_keep_their_detail() {
        let err = StoreError::from(HttpError::Status {
            status: 409,
            message: "duplicate key".to_string(),
        });
        assert_eq!(
            err,
            StoreError::Rejected {
                status: 409,
                message: "duplicate key".to_string()
            }
        );
        assert_eq!(
            UploadError::from(HttpError::Timeout { secs: 30 }),
            UploadError::Timeout { secs: 30 }
        );
    }
}
