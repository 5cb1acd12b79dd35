//! Photos on either side of an upload
//!
//! - [`LocalPhoto`]: a file on the device, produced by capture or preprocessing
//! - [`PhotoUrl`]: the public URL returned by object storage

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const FILE_SCHEME: &str = "file://";

/// Which side of the transformation a photo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSlot {
    /// The starting point
    Before,
    /// The result
    After,
}

impl PhotoSlot {
    /// Lowercase name, also used as the storage file prefix
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoSlot::Before => "before",
            PhotoSlot::After => "after",
        }
    }
}

impl fmt::Display for PhotoSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoSlot {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(PhotoSlot::Before),
            "after" => Ok(PhotoSlot::After),
            other => Err(ModelError::UnknownSlot(other.to_string())),
        }
    }
}

/// Handle to a photo file on the local device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPhoto {
    uri: String,
}

impl LocalPhoto {
    /// Wrap a capture URI (`file://...` or a bare path)
    #[inline]
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Build a `file://` handle for a filesystem path
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(format!("{FILE_SCHEME}{}", path.as_ref().display()))
    }

    /// The URI as handed out by the capture collaborator
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Filesystem path behind the URI
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.uri.strip_prefix(FILE_SCHEME).unwrap_or(&self.uri))
    }
}

impl fmt::Display for LocalPhoto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Public URL of an uploaded photo; never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoUrl(String);

impl PhotoUrl {
    /// Validate and wrap a URL
    ///
    /// # Errors
    /// - `ModelError::EmptyPhotoUrl` if the URL is blank
    pub fn new(url: impl Into<String>) -> Result<Self, ModelError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ModelError::EmptyPhotoUrl);
        }
        Ok(Self(url))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PhotoUrl {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhotoUrl> for String {
    fn from(value: PhotoUrl) -> Self {
        value.0
    }
}

impl fmt::Display for PhotoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
