//! Validation errors for domain values

/// Errors raised when constructing domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A photo URL was empty or whitespace
    #[error("photo url must not be empty")]
    EmptyPhotoUrl,

    /// An identifier was empty
    #[error("{0} must not be empty")]
    EmptyId(&'static str),

    /// Unknown photo slot name
    #[error("unknown photo slot: '{0}'")]
    UnknownSlot(String),
}
