//! Photo capture collaborator

use crate::error::CaptureError;
use async_trait::async_trait;
use parking_lot::Mutex;
use reframe_model::{LocalPhoto, PhotoSlot};
use std::collections::HashMap;
use std::path::PathBuf;

/// Camera access
///
/// `Ok(None)` means the user cancelled the shot.
#[async_trait]
pub trait PhotoCapture: Send + Sync {
    async fn capture(&self, slot: PhotoSlot) -> Result<Option<LocalPhoto>, CaptureError>;
}

/// Capture that hands out files already on disk, one per slot
///
/// Used by the command line, where "taking a photo" means naming a file.
#[derive(Debug, Default)]
pub struct FileCapture {
    files: Mutex<HashMap<PhotoSlot, PathBuf>>,
}

impl FileCapture {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the file returned for the next capture of `slot`
    #[must_use]
    pub fn with_file(self, slot: PhotoSlot, path: impl Into<PathBuf>) -> Self {
        self.files.lock().insert(slot, path.into());
        self
    }
}

#[async_trait]
impl PhotoCapture for FileCapture {
    async fn capture(&self, slot: PhotoSlot) -> Result<Option<LocalPhoto>, CaptureError> {
        let Some(path) = self.files.lock().remove(&slot) else {
            return Ok(None);
        };

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(Some(LocalPhoto::from_path(path))),
            Ok(false) => Err(CaptureError::Failed(format!(
                "no such file: {}",
                path.display()
            ))),
            Err(e) => Err(CaptureError::Failed(e.to_string())),
        }
    }
}

/// Capture for hosts without a camera
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl PhotoCapture for NoCamera {
    async fn capture(&self, _slot: PhotoSlot) -> Result<Option<LocalPhoto>, CaptureError> {
        Err(CaptureError::Unavailable("no camera attached".to_string()))
    }
}
