//! Photo object storage over the storage REST API
//!
//! Objects live at `{bucket}/{folder}/{slot}_{millis}_{suffix}.jpg` and are
//! served from the bucket's public URL.

use crate::client::SupabaseClient;
use crate::error::HttpError;
use async_trait::async_trait;
use rand::Rng;
use reframe_backend::{ObjectStorage, UploadError};
use reframe_model::{LocalPhoto, PhotoSlot, PhotoUrl};
use reqwest::Method;
use serde_json::json;

const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/jpg", "image/webp"];
const FILE_SIZE_LIMIT: u64 = 5 * 1024 * 1024;
const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// [`ObjectStorage`] backed by a public storage bucket
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    client: SupabaseClient,
}

impl SupabaseStorage {
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    /// Public URL for an object path inside the bucket
    #[must_use]
    pub fn public_url(&self, object_path: &str) -> String {
        self.client.endpoint(&format!(
            "storage/v1/object/public/{}/{object_path}",
            self.client.config().bucket
        ))
    }

    /// Create the photo bucket if it does not exist yet
    ///
    /// Returns `true` when the bucket was created by this call.
    ///
    /// # Errors
    /// Transport or permission failures from the storage service
    pub async fn ensure_bucket(&self) -> Result<bool, UploadError> {
        let bucket = &self.client.config().bucket;
        let lookup = self
            .client
            .send(self.client.request(Method::GET, &format!("storage/v1/bucket/{bucket}")))
            .await;

        match lookup {
            Ok(_) => {
                tracing::debug!(%bucket, "bucket already exists");
                return Ok(false);
            }
            // Missing buckets surface as 400 or 404 depending on server version
            Err(HttpError::Status { status: 400 | 404, .. }) => {}
            Err(e) => return Err(e.into()),
        }

        let body = json!({
            "id": bucket,
            "name": bucket,
            "public": true,
            "allowed_mime_types": ALLOWED_MIME_TYPES,
            "file_size_limit": FILE_SIZE_LIMIT,
        });
        self.client
            .send(self.client.request(Method::POST, "storage/v1/bucket").json(&body))
            .await?;
        tracing::info!(%bucket, "created storage bucket");
        Ok(true)
    }

    fn object_path(&self, slot: PhotoSlot) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        format!(
            "{}/{}",
            self.client.config().folder,
            object_name(slot, millis, &random_suffix())
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(&self, photo: &LocalPhoto, slot: PhotoSlot) -> Result<PhotoUrl, UploadError> {
        let path = photo.path();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UploadError::MissingFile(path.clone())
            } else {
                UploadError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let object_path = self.object_path(slot);
        let size = bytes.len();
        let request = self
            .client
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{object_path}", self.client.config().bucket),
            )
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .header("x-upsert", "true")
            .body(bytes);
        self.client.send(request).await?;

        tracing::info!(%slot, object = %object_path, size, "uploaded photo");
        PhotoUrl::new(self.public_url(&object_path)).map_err(|e| UploadError::InvalidUrl(e.to_string()))
    }

    async fn delete(&self, url: &PhotoUrl) -> Result<bool, UploadError> {
        let object_path =
            object_path_from_url(url.as_str()).ok_or_else(|| UploadError::InvalidUrl(url.to_string()))?;

        let request = self
            .client
            .request(
                Method::DELETE,
                &format!("storage/v1/object/{}", self.client.config().bucket),
            )
            .json(&json!({ "prefixes": [object_path] }));
        let removed: Vec<serde_json::Value> = self.client.send_json(request).await?;

        tracing::debug!(object = %object_path, removed = removed.len(), "deleted photo");
        Ok(!removed.is_empty())
    }
}

/// `{slot}_{millis}_{suffix}.jpg`
fn object_name(slot: PhotoSlot, millis: i64, suffix: &str) -> String {
    format!("{slot}_{millis}_{suffix}.jpg")
}

/// Six lowercase base-36 characters
fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

/// `folder/file` from the last two segments of a public object URL
fn object_path_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., folder, file] => Some(format!("{folder}/{file}")),
        _ => None,
    }
}
