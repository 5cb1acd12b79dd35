//! Shared HTTP plumbing
//!
//! Every request carries the `apikey` header and a bearer token: the
//! session's access token when signed in, the anon key otherwise.

use crate::auth::SupabaseAuth;
use crate::config::SupabaseConfig;
use crate::error::{HttpError, SupabaseError};
use crate::records::SupabaseRecords;
use crate::storage::SupabaseStorage;
use reframe_backend::{Backend, SessionStore};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Hosted backend client
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: Arc<SupabaseConfig>,
    session: Arc<SessionStore>,
}

impl SupabaseClient {
    /// Build a client for `config`, authenticating with `session`
    ///
    /// # Errors
    /// - Configuration errors from [`SupabaseConfig::validate`]
    /// - `Client` if the HTTP client cannot be built
    pub fn new(config: SupabaseConfig, session: Arc<SessionStore>) -> Result<Self, SupabaseError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("reframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SupabaseError::Client(e.to_string()))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            session,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn auth(&self) -> SupabaseAuth {
        SupabaseAuth::new(self.clone())
    }

    #[must_use]
    pub fn storage(&self) -> SupabaseStorage {
        SupabaseStorage::new(self.clone())
    }

    #[must_use]
    pub fn records(&self) -> SupabaseRecords {
        SupabaseRecords::new(self.clone())
    }

    /// Storage, records and session wired into a [`Backend`]
    #[must_use]
    pub fn backend(&self) -> Backend {
        Backend::new(
            Arc::new(self.storage()),
            Arc::new(self.records()),
            self.session.clone(),
        )
    }

    /// Absolute URL for a path under the project URL
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Request authenticated as the current session (or anonymously)
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.config.anon_key.clone());
        self.request_with_token(method, path, &token)
    }

    pub(crate) fn request_with_token(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    /// Send and fail on any non-2xx status
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, HttpError> {
        let response = request.send().await.map_err(|e| self.http_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        tracing::debug!(status = status.as_u16(), %message, "request rejected");
        Err(HttpError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Send and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(|e| self.http_error(&e))?;
        serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode(e.to_string()))
    }

    fn http_error(&self, err: &reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout {
                secs: self.config.request_timeout_secs,
            }
        } else {
            HttpError::Transport(err.to_string())
        }
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("url", &self.config.url)
            .field("bucket", &self.config.bucket)
            .finish_non_exhaustive()
    }
}

/// Human message from an auth/storage/PostgREST error body
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
        .or_else(|| Some(trimmed.to_string()))
}
