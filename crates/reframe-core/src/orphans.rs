//! Ledger of uploaded photos no record references
//!
//! Nothing is reclaimed automatically. Hosts decide when to sweep.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reframe_backend::UploadError;
use reframe_model::{PhotoSlot, PhotoUrl};
use serde::Serialize;

/// Why a photo ended up unreferenced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum OrphanReason {
    /// Record create/update failed after the upload
    StoreFailed(String),
    /// The transformation was discarded before the record was written
    Superseded,
}

/// One unreferenced photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedPhoto {
    pub url: PhotoUrl,
    pub slot: PhotoSlot,
    pub reason: OrphanReason,
    pub detected_at: DateTime<Utc>,
}

impl OrphanedPhoto {
    #[must_use]
    pub fn new(url: PhotoUrl, slot: PhotoSlot, reason: OrphanReason) -> Self {
        Self {
            url,
            slot,
            reason,
            detected_at: Utc::now(),
        }
    }
}

/// Outcome of [`crate::TransformationWorkflow::sweep_orphans`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Deleted from storage
    pub reclaimed: Vec<PhotoUrl>,
    /// Storage had nothing at the URL
    pub already_gone: Vec<PhotoUrl>,
    /// Delete failed; still in the ledger
    pub failed: Vec<(PhotoUrl, UploadError)>,
}

impl SweepReport {
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct OrphanLedger {
    entries: Mutex<Vec<OrphanedPhoto>>,
}

impl OrphanLedger {
    pub(crate) fn record(&self, orphan: OrphanedPhoto) {
        tracing::warn!(url = %orphan.url, slot = %orphan.slot, reason = ?orphan.reason, "orphaned upload");
        self.entries.lock().push(orphan);
    }

    pub(crate) fn snapshot(&self) -> Vec<OrphanedPhoto> {
        self.entries.lock().clone()
    }

    pub(crate) fn take_all(&self) -> Vec<OrphanedPhoto> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Put back entries a sweep could not reclaim
    pub(crate) fn restore(&self, orphans: Vec<OrphanedPhoto>) {
        if orphans.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        let recorded_since = std::mem::take(&mut *entries);
        entries.extend(orphans);
        entries.extend(recorded_since);
    }
}
