//! In-memory storage and record store
//!
//! Deterministic stand-ins for the hosted backend: storage URLs are
//! `<base>/<slot><n>.jpg` and record ids are `t<n>`, both counting from 1.

use crate::error::{StoreError, UploadError};
use crate::records::RecordStore;
use crate::storage::ObjectStorage;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use reframe_model::{
    LocalPhoto, NewTransformation, PhotoSlot, PhotoUrl, RecordQuery, Transformation,
    TransformationId,
};
use std::collections::{BTreeMap, HashMap};

/// Object storage keeping uploads in a map
#[derive(Debug)]
pub struct MemoryObjectStorage {
    base_url: String,
    inner: Mutex<StorageState>,
}

#[derive(Debug, Default)]
struct StorageState {
    counters: HashMap<PhotoSlot, u64>,
    objects: BTreeMap<String, LocalPhoto>,
}

impl MemoryObjectStorage {
    /// Storage serving URLs under `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            inner: Mutex::new(StorageState::default()),
        }
    }

    /// Whether an object is stored at `url`
    #[must_use]
    pub fn contains(&self, url: &PhotoUrl) -> bool {
        self.inner.lock().objects.contains_key(url.as_str())
    }

    /// The local photo an object was uploaded from
    #[must_use]
    pub fn source_of(&self, url: &PhotoUrl) -> Option<LocalPhoto> {
        self.inner.lock().objects.get(url.as_str()).cloned()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("https://cdn")
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(&self, photo: &LocalPhoto, slot: PhotoSlot) -> Result<PhotoUrl, UploadError> {
        let mut state = self.inner.lock();
        let counter = state.counters.entry(slot).or_insert(0);
        *counter += 1;
        let url = format!("{}/{}{}.jpg", self.base_url, slot, counter);
        state.objects.insert(url.clone(), photo.clone());
        PhotoUrl::new(url).map_err(|e| UploadError::InvalidUrl(e.to_string()))
    }

    async fn delete(&self, url: &PhotoUrl) -> Result<bool, UploadError> {
        Ok(self.inner.lock().objects.remove(url.as_str()).is_some())
    }
}

/// Record store keeping rows in insertion order
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    inner: Mutex<RecordState>,
}

#[derive(Debug, Default)]
struct RecordState {
    next_id: u64,
    rows: Vec<Transformation>,
}

impl MemoryRecordStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing row, e.g. one created by another device
    pub fn insert(&self, record: Transformation) {
        self.inner.lock().rows.push(record);
    }

    /// Snapshot of a row without going through the trait
    #[must_use]
    pub fn record(&self, id: &TransformationId) -> Option<Transformation> {
        self.inner.lock().rows.iter().find(|r| &r.id == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, new: NewTransformation) -> Result<Transformation, StoreError> {
        let mut state = self.inner.lock();
        state.next_id += 1;
        let now = Utc::now();
        let record = Transformation {
            id: TransformationId::new(format!("t{}", state.next_id)),
            before_photo_url: new.before_photo_url,
            after_photo_url: None,
            created_at: now,
            updated_at: now,
            user_id: new.user_id,
        };
        state.rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &TransformationId,
        after_photo_url: &PhotoUrl,
    ) -> Result<Transformation, StoreError> {
        let mut state = self.inner.lock();
        let row = state
            .rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        row.after_photo_url = Some(after_photo_url.clone());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: &TransformationId) -> Result<bool, StoreError> {
        let mut state = self.inner.lock();
        let before = state.rows.len();
        state.rows.retain(|r| &r.id != id);
        Ok(state.rows.len() != before)
    }

    async fn get(&self, id: &TransformationId) -> Result<Transformation, StoreError> {
        self.record(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<Transformation>, StoreError> {
        let state = self.inner.lock();
        // Newest insert first, then a stable sort keeps that order on timestamp ties
        let mut rows: Vec<Transformation> = state
            .rows
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}
