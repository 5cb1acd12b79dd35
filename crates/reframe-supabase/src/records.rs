//! Transformation rows over PostgREST

use crate::client::SupabaseClient;
use async_trait::async_trait;
use reframe_backend::{RecordStore, StoreError};
use reframe_model::{Completion, NewTransformation, PhotoUrl, RecordQuery, Transformation, TransformationId};
use reqwest::{Method, RequestBuilder};
use serde_json::json;

const RETURN_REPRESENTATION: &str = "return=representation";

/// [`RecordStore`] backed by the `rest/v1` table endpoint
#[derive(Debug, Clone)]
pub struct SupabaseRecords {
    client: SupabaseClient,
}

impl SupabaseRecords {
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn table(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &format!("rest/v1/{}", self.client.config().table))
    }

    async fn single(&self, id: &TransformationId, request: RequestBuilder) -> Result<Transformation, StoreError> {
        let rows: Vec<Transformation> = self.client.send_json(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

#[async_trait]
impl RecordStore for SupabaseRecords {
    async fn create(&self, new: NewTransformation) -> Result<Transformation, StoreError> {
        let request = self
            .table(Method::POST)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&new);
        let rows: Vec<Transformation> = self.client.send_json(request).await?;
        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))?;
        tracing::info!(id = %created.id, "created transformation");
        Ok(created)
    }

    async fn update(&self, id: &TransformationId, after_photo_url: &PhotoUrl) -> Result<Transformation, StoreError> {
        let body = json!({
            "after_photo_url": after_photo_url,
            "updated_at": chrono::Utc::now(),
        });
        let request = self
            .table(Method::PATCH)
            .query(&[id_filter(id)])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&body);
        let updated = self.single(id, request).await?;
        tracing::info!(%id, "completed transformation");
        Ok(updated)
    }

    async fn delete(&self, id: &TransformationId) -> Result<bool, StoreError> {
        let request = self
            .table(Method::DELETE)
            .query(&[id_filter(id)])
            .header("Prefer", RETURN_REPRESENTATION);
        let rows: Vec<serde_json::Value> = self.client.send_json(request).await?;
        tracing::info!(%id, existed = !rows.is_empty(), "deleted transformation");
        Ok(!rows.is_empty())
    }

    async fn get(&self, id: &TransformationId) -> Result<Transformation, StoreError> {
        let request = self
            .table(Method::GET)
            .query(&[("select", "*".to_string()), id_filter(id)]);
        self.single(id, request).await
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<Transformation>, StoreError> {
        let request = self.table(Method::GET).query(&list_params(query));
        let rows: Vec<Transformation> = self.client.send_json(request).await?;
        tracing::debug!(count = rows.len(), ?query, "listed transformations");
        Ok(rows)
    }
}

fn id_filter(id: &TransformationId) -> (&'static str, String) {
    ("id", format!("eq.{id}"))
}

/// Query-string filters for a listing, newest first
fn list_params(query: &RecordQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![("select", "*".to_string())];
    match query.completion {
        Some(Completion::Draft) => params.push(("after_photo_url", "is.null".to_string())),
        Some(Completion::Complete) => params.push(("after_photo_url", "not.is.null".to_string())),
        None => {}
    }
    if let Some(owner) = &query.owner {
        params.push(("user_id", format!("eq.{owner}")));
    }
    params.push(("order", "created_at.desc".to_string()));
    params
}
