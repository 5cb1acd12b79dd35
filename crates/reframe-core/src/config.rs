//! Workflow configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Workflow controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Upper bound for every remote call, in seconds
    pub operation_timeout_secs: u64,
    /// Allow records without an owner when nobody is signed in
    pub allow_anonymous: bool,
    /// Delete a draft's stored photo after the record is deleted
    pub delete_photos_with_record: bool,
    /// Buffered events per subscriber before the slowest one lags
    pub event_capacity: usize,
}

impl WorkflowConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.operation_timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_allow_anonymous(mut self, allow: bool) -> Self {
        self.allow_anonymous = allow;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_delete_photos_with_record(mut self, delete: bool) -> Self {
        self.delete_photos_with_record = delete;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Remote call bound as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 30,
            allow_anonymous: false,
            delete_photos_with_record: true,
            event_capacity: 64,
        }
    }
}
