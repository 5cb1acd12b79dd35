//! Object storage collaborator

use crate::error::UploadError;
use async_trait::async_trait;
use reframe_model::{LocalPhoto, PhotoSlot, PhotoUrl};

/// Blob hosting for photo binaries
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload a local photo; `slot` is a naming hint for the destination
    async fn upload(&self, photo: &LocalPhoto, slot: PhotoSlot) -> Result<PhotoUrl, UploadError>;

    /// Remove a previously uploaded photo; `false` if nothing was there
    async fn delete(&self, url: &PhotoUrl) -> Result<bool, UploadError>;
}
