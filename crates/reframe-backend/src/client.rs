//! Injected backend handle
//!
//! Bundles every collaborator the workflow controller talks to. Built once
//! by the host and passed in, so tests can swap any piece for a fake.

use crate::auth::AuthProvider;
use crate::capture::{NoCamera, PhotoCapture};
use crate::preprocess::{ImagePreprocessor, PassthroughPreprocessor};
use crate::records::RecordStore;
use crate::storage::ObjectStorage;
use std::sync::Arc;

/// Collaborators behind the controller
#[derive(Clone)]
pub struct Backend {
    pub capture: Arc<dyn PhotoCapture>,
    pub preprocessor: Arc<dyn ImagePreprocessor>,
    pub storage: Arc<dyn ObjectStorage>,
    pub records: Arc<dyn RecordStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    /// Backend with no camera and no preprocessing
    #[must_use]
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn RecordStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            capture: Arc::new(NoCamera),
            preprocessor: Arc::new(PassthroughPreprocessor),
            storage,
            records,
            auth,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capture(mut self, capture: Arc<dyn PhotoCapture>) -> Self {
        self.capture = capture;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn ImagePreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
