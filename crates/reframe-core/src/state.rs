//! Active transformation state
//!
//! [`WorkflowState`] carries the data each state needs; [`StateKind`] is its
//! fieldless tag, used by the transition table and in events.

use reframe_model::{LocalPhoto, PhotoSlot, Transformation, TransformationId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the transformation being worked on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    /// No photos, no record
    #[default]
    Empty,
    /// Before photo taken, not uploaded
    BeforeCaptured { photo: LocalPhoto },
    /// Before photo upload (and record create) in flight
    BeforeUploading { photo: LocalPhoto },
    /// Record exists with only the before photo
    Draft { record: Transformation },
    /// After photo taken for a draft, not uploaded
    AfterCaptured {
        record: Transformation,
        photo: LocalPhoto,
    },
    /// After photo upload (and record update) in flight
    AfterUploading {
        record: Transformation,
        photo: LocalPhoto,
    },
    /// Record has both photos
    Complete { record: Transformation },
}

impl WorkflowState {
    #[must_use]
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Empty => StateKind::Empty,
            Self::BeforeCaptured { .. } => StateKind::BeforeCaptured,
            Self::BeforeUploading { .. } => StateKind::BeforeUploading,
            Self::Draft { .. } => StateKind::Draft,
            Self::AfterCaptured { .. } => StateKind::AfterCaptured,
            Self::AfterUploading { .. } => StateKind::AfterUploading,
            Self::Complete { .. } => StateKind::Complete,
        }
    }

    /// Remote record backing this state, once one exists
    #[must_use]
    pub fn record(&self) -> Option<&Transformation> {
        match self {
            Self::Draft { record }
            | Self::AfterCaptured { record, .. }
            | Self::AfterUploading { record, .. }
            | Self::Complete { record } => Some(record),
            Self::Empty | Self::BeforeCaptured { .. } | Self::BeforeUploading { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn record_id(&self) -> Option<&TransformationId> {
        self.record().map(|r| &r.id)
    }

    /// Local photo waiting for (or in) upload
    #[must_use]
    pub fn photo(&self) -> Option<&LocalPhoto> {
        match self {
            Self::BeforeCaptured { photo }
            | Self::BeforeUploading { photo }
            | Self::AfterCaptured { photo, .. }
            | Self::AfterUploading { photo, .. } => Some(photo),
            Self::Empty | Self::Draft { .. } | Self::Complete { .. } => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.kind().is_uploading()
    }
}

/// Fieldless state tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Empty,
    BeforeCaptured,
    BeforeUploading,
    Draft,
    AfterCaptured,
    AfterUploading,
    Complete,
}

impl StateKind {
    /// Every state, in workflow order
    pub const ALL: [StateKind; 7] = [
        StateKind::Empty,
        StateKind::BeforeCaptured,
        StateKind::BeforeUploading,
        StateKind::Draft,
        StateKind::AfterCaptured,
        StateKind::AfterUploading,
        StateKind::Complete,
    ];

    #[inline]
    #[must_use]
    pub fn is_uploading(self) -> bool {
        matches!(self, Self::BeforeUploading | Self::AfterUploading)
    }

    /// Slot of the photo captured or uploading in this state
    #[must_use]
    pub fn pending_slot(self) -> Option<PhotoSlot> {
        match self {
            Self::BeforeCaptured | Self::BeforeUploading => Some(PhotoSlot::Before),
            Self::AfterCaptured | Self::AfterUploading => Some(PhotoSlot::After),
            Self::Empty | Self::Draft | Self::Complete => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::BeforeCaptured => "before_captured",
            Self::BeforeUploading => "before_uploading",
            Self::Draft => "draft",
            Self::AfterCaptured => "after_captured",
            Self::AfterUploading => "after_uploading",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reframe_model::PhotoUrl;

    fn draft() -> Transformation {
        let now = Utc::now();
        Transformation {
            id: TransformationId::new("t1"),
            before_photo_url: PhotoUrl::new("https://cdn/before1.jpg").unwrap(),
            after_photo_url: None,
            created_at: now,
            updated_at: now,
            user_id: None,
        }
    }

    #[test]
    fn accessors_follow_variant() {
        let photo = LocalPhoto::new("file://b.jpg");
        let state = WorkflowState::AfterCaptured {
            record: draft(),
            photo: photo.clone(),
        };
        assert_eq!(state.kind(), StateKind::AfterCaptured);
        assert_eq!(state.record_id().map(TransformationId::as_str), Some("t1"));
        assert_eq!(state.photo(), Some(&photo));
        assert!(!state.is_uploading());

        assert!(WorkflowState::Empty.record().is_none());
        assert!(WorkflowState::Draft { record: draft() }.photo().is_none());
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StateKind::BeforeUploading).unwrap(),
            "\"before_uploading\""
        );
        assert_eq!(StateKind::AfterCaptured.to_string(), "after_captured");
        assert_eq!(StateKind::AfterUploading.pending_slot(), Some(PhotoSlot::After));
    }
}
