//! Hosted backend configuration

use crate::error::SupabaseError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Project endpoint, key and storage layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key
    pub anon_key: String,
    /// Storage bucket for photos
    pub bucket: String,
    /// Folder inside the bucket
    pub folder: String,
    /// Table holding transformation rows
    pub table: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl SupabaseConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the endpoint and key are usable
    ///
    /// # Errors
    /// - `MissingConfig` naming the unset values
    /// - `InvalidUrl` if `url` does not parse
    pub fn validate(&self) -> Result<(), SupabaseError> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.anon_key.trim().is_empty() {
            missing.push("SUPABASE_ANON_KEY");
        }
        if !missing.is_empty() {
            return Err(SupabaseError::MissingConfig(missing.join(", ")));
        }
        url::Url::parse(&self.url).map_err(|e| SupabaseError::InvalidUrl(format!("{}: {e}", self.url)))?;
        Ok(())
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            bucket: "transformation-photos".to_string(),
            folder: "transformations".to_string(),
            table: "transformations".to_string(),
            request_timeout_secs: 30,
        }
    }
}
