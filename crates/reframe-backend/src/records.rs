//! Record store collaborator

use crate::error::StoreError;
use async_trait::async_trait;
use reframe_model::{NewTransformation, PhotoUrl, RecordQuery, Transformation, TransformationId};

/// Relational CRUD over the `transformations` table
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a draft; the store assigns `id` and timestamps
    async fn create(&self, new: NewTransformation) -> Result<Transformation, StoreError>;

    /// Set `after_photo_url` (and `updated_at`) on an existing record
    ///
    /// # Errors
    /// - `StoreError::NotFound` if `id` matches nothing
    async fn update(
        &self,
        id: &TransformationId,
        after_photo_url: &PhotoUrl,
    ) -> Result<Transformation, StoreError>;

    /// Delete by id; `false` if no row matched
    async fn delete(&self, id: &TransformationId) -> Result<bool, StoreError>;

    /// Fetch one record
    async fn get(&self, id: &TransformationId) -> Result<Transformation, StoreError>;

    /// Records matching `query`, newest first
    async fn list(&self, query: &RecordQuery) -> Result<Vec<Transformation>, StoreError>;
}
