mod common;

use chrono::{Duration, Utc};
use common::{harness, harness_with};
use pretty_assertions::assert_eq;
use image::{ImageFormat, Rgb, RgbImage};
use reframe_backend::{CaptureError, JpegPreprocessor, PreprocessConfig, StoreError, UploadError};
use reframe_core::{
    OrphanReason, StateKind, TransformationWorkflow, WorkflowConfig, WorkflowError, WorkflowEvent,
    WorkflowState,
};
use reframe_model::{LocalPhoto, PhotoSlot, TransformationId, ANONYMOUS_NAME};
use reframe_test_utils::{
    after_photo, before_photo, fixture_session, other_user, record, FailingPreprocessor,
    StoreOp, TestBackend, AFTER_URI, BEFORE_URI,
};
use std::sync::Arc;

#[tokio::test]
async fn before_submission_creates_draft() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();

    let draft = h.workflow.submit_captured_photo().await.unwrap();

    assert_eq!(draft.id.as_str(), "t1");
    assert_eq!(draft.before_photo_url.as_str(), "https://cdn/before1.jpg");
    assert!(draft.after_photo_url.is_none());
    assert_eq!(draft.user_id, h.fakes.user().map(|u| u.id));
    assert_eq!(h.workflow.state(), WorkflowState::Draft { record: draft.clone() });
    assert_eq!(h.fakes.records.rows().record(&draft.id), Some(draft));
}

#[tokio::test]
async fn submission_emits_transitions_then_saved_record() {
    let mut h = harness();
    let draft = h.saved_draft().await;

    let events = h.drain();
    let transitions: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::StateChanged(change) => Some((change.previous, change.new_state)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (StateKind::Empty, StateKind::BeforeCaptured),
            (StateKind::BeforeCaptured, StateKind::BeforeUploading),
            (StateKind::BeforeUploading, StateKind::Draft),
        ]
    );
    assert_eq!(events.last(), Some(&WorkflowEvent::RecordSaved(draft)));
}

#[tokio::test]
async fn after_submission_completes_draft() {
    let mut h = harness();
    let draft = h.saved_draft().await;

    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    let complete = h.workflow.submit_captured_photo().await.unwrap();

    assert_eq!(complete.id, draft.id);
    assert_eq!(
        complete.after_photo_url.as_ref().map(|u| u.as_str()),
        Some("https://cdn/after1.jpg")
    );
    assert_eq!(complete.before_photo_url, draft.before_photo_url);
    assert_eq!(complete.created_at, draft.created_at);
    assert_eq!(complete.user_id, draft.user_id);
    assert!(complete.updated_at >= draft.updated_at);
    assert_eq!(h.workflow.state_kind(), StateKind::Complete);

    let drafts = h.workflow.list_drafts().await.unwrap();
    assert!(drafts.iter().all(|d| d.id != draft.id));
    assert_eq!(h.fakes.records.calls(StoreOp::Create), 1);
    assert_eq!(h.fakes.records.calls(StoreOp::Update), 1);
}

#[tokio::test]
async fn resumed_draft_upload_failure_keeps_after_photo() {
    let mut h = harness();
    let draft = h.saved_draft().await;
    h.workflow.discard_active();

    h.workflow.resume_draft(&draft.id).await.unwrap();
    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.fakes
        .storage
        .fail_next_upload(UploadError::Network("connection reset".to_string()));

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    assert!(matches!(err, WorkflowError::Upload(UploadError::Network(_))));
    assert!(err.is_retryable());
    assert_eq!(
        h.workflow.state(),
        WorkflowState::AfterCaptured {
            record: draft.clone(),
            photo: after_photo(),
        }
    );
    assert_eq!(h.fakes.records.rows().record(&draft.id), Some(draft));
    assert_eq!(h.fakes.records.calls(StoreOp::Update), 0);
}

#[tokio::test]
async fn resumed_draft_completes_and_leaves_drafts() {
    let mut h = harness();
    let draft = h.saved_draft().await;
    h.workflow.discard_active();

    h.workflow.resume_draft(&draft.id).await.unwrap();
    assert_eq!(h.workflow.state_kind(), StateKind::Draft);

    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    let complete = h.workflow.submit_captured_photo().await.unwrap();

    assert_eq!(complete.id.as_str(), "t1");
    assert_eq!(
        h.fakes.storage.objects().source_of(complete.after_photo_url.as_ref().unwrap()),
        Some(after_photo())
    );
    let drafts = h.workflow.list_drafts().await.unwrap();
    assert!(drafts.is_empty());
}

#[tokio::test]
async fn retry_after_upload_error_creates_exactly_once() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.storage.fail_next_upload(UploadError::Rejected {
        status: 503,
        message: "unavailable".to_string(),
    });

    assert!(h.workflow.submit_captured_photo().await.is_err());
    assert_eq!(h.workflow.state_kind(), StateKind::BeforeCaptured);

    let draft = h.workflow.submit_captured_photo().await.unwrap();
    assert_eq!(draft.id.as_str(), "t1");
    assert_eq!(h.fakes.storage.upload_calls(), 2);
    assert_eq!(h.fakes.records.calls(StoreOp::Create), 1);
    assert_eq!(h.fakes.records.rows().len(), 1);
}

#[tokio::test]
async fn retry_after_upload_error_updates_exactly_once() {
    let mut h = harness();
    h.saved_draft().await;
    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.fakes.storage.fail_next_upload(UploadError::Timeout { secs: 30 });

    assert!(h.workflow.submit_captured_photo().await.is_err());
    let complete = h.workflow.submit_captured_photo().await.unwrap();

    assert!(complete.is_complete());
    assert_eq!(h.fakes.records.calls(StoreOp::Update), 1);
}

#[tokio::test]
async fn create_failure_reports_orphan_and_rolls_back() {
    let mut h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes
        .records
        .fail_next(StoreOp::Create, StoreError::Network("timeout".to_string()));

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    match &err {
        WorkflowError::OrphanedUpload { url, slot, source } => {
            assert_eq!(url.as_str(), "https://cdn/before1.jpg");
            assert_eq!(*slot, PhotoSlot::Before);
            assert_eq!(*source, StoreError::Network("timeout".to_string()));
        }
        other => panic!("expected orphaned upload, got {other:?}"),
    }
    assert!(err.is_orphan());
    assert_eq!(
        h.workflow.state(),
        WorkflowState::BeforeCaptured {
            photo: before_photo()
        }
    );
    assert!(h.fakes.records.rows().is_empty());

    let orphans = h.workflow.orphans();
    assert_eq!(orphans.len(), 1);
    assert!(matches!(orphans[0].reason, OrphanReason::StoreFailed(_)));
    assert!(h
        .drain()
        .iter()
        .any(|e| matches!(e, WorkflowEvent::OrphanDetected(_))));
}

#[tokio::test]
async fn update_failure_reports_orphan_and_keeps_after_photo() {
    let mut h = harness();
    let draft = h.saved_draft().await;
    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.fakes.records.fail_next(
        StoreOp::Update,
        StoreError::Rejected {
            status: 500,
            message: "boom".to_string(),
        },
    );

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::OrphanedUpload {
            slot: PhotoSlot::After,
            ..
        }
    ));
    assert_eq!(h.workflow.state_kind(), StateKind::AfterCaptured);
    assert_eq!(h.fakes.records.rows().record(&draft.id), Some(draft));
}

#[tokio::test]
async fn sweep_reclaims_orphans_and_keeps_failures() {
    let mut h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes
        .records
        .fail_next(StoreOp::Create, StoreError::Network("down".to_string()));
    h.fakes
        .records
        .fail_next(StoreOp::Create, StoreError::Network("down".to_string()));
    let _ = h.workflow.submit_captured_photo().await;
    let _ = h.workflow.submit_captured_photo().await;
    assert_eq!(h.workflow.orphans().len(), 2);

    h.fakes
        .storage
        .fail_next_delete(UploadError::Network("down".to_string()));
    let report = h.workflow.sweep_orphans().await;
    assert_eq!(report.reclaimed.len() + report.failed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(!report.is_clean());
    assert_eq!(h.workflow.orphans().len(), 1);

    let report = h.workflow.sweep_orphans().await;
    assert!(report.is_clean());
    assert_eq!(report.reclaimed.len(), 1);
    assert!(h.workflow.orphans().is_empty());
    assert_eq!(h.fakes.storage.objects().object_count(), 0);
}

#[tokio::test]
async fn deleting_active_draft_resets_to_empty() {
    let mut h = harness();
    let draft = h.saved_draft().await;
    h.workflow.list_drafts().await.unwrap();
    h.drain();

    assert!(h.workflow.delete_draft(&draft.id).await.unwrap());

    assert_eq!(h.workflow.state(), WorkflowState::Empty);
    assert!(h.workflow.drafts().is_empty());
    assert!(h.workflow.list_drafts().await.unwrap().is_empty());
    let events = h.drain();
    assert!(events.contains(&WorkflowEvent::DraftDeleted(draft.id.clone())));
    assert!(!h.fakes.storage.objects().contains(&draft.before_photo_url));
}

#[tokio::test]
async fn deleting_inactive_draft_keeps_active_state() {
    let mut h = harness();
    let first = h.saved_draft().await;
    h.workflow.discard_active();
    let second = h.saved_draft().await;

    assert!(h.workflow.delete_draft(&first.id).await.unwrap());

    assert_eq!(h.workflow.state(), WorkflowState::Draft { record: second });
}

#[tokio::test]
async fn failed_delete_leaves_listing_untouched() {
    let mut h = harness();
    let draft = h.saved_draft().await;
    h.workflow.list_drafts().await.unwrap();
    h.fakes
        .records
        .fail_next(StoreOp::Delete, StoreError::Network("offline".to_string()));

    let err = h.workflow.delete_draft(&draft.id).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Store(StoreError::Network(_))));
    assert_eq!(h.workflow.drafts(), vec![draft.clone()]);
    assert_eq!(h.workflow.state_kind(), StateKind::Draft);
    assert!(h.fakes.storage.objects().contains(&draft.before_photo_url));
}

#[tokio::test]
async fn deleting_missing_record_reports_false() {
    let h = harness();
    let existed = h
        .workflow
        .delete_draft(&TransformationId::new("t404"))
        .await
        .unwrap();
    assert!(!existed);
    assert_eq!(h.fakes.storage.delete_calls(), 0);
}

#[tokio::test]
async fn delete_rejects_foreign_records() {
    let mut h = harness();
    let mine = h.saved_draft().await;
    let other = other_user().id;
    h.fakes
        .records
        .rows()
        .insert(record("t8", Some(&other), None, Utc::now()));

    assert_eq!(
        h.workflow.delete_draft(&TransformationId::new("t8")).await,
        Err(WorkflowError::NotOwner(TransformationId::new("t8")))
    );
    assert!(h.fakes.records.rows().record(&TransformationId::new("t8")).is_some());

    h.fakes.session.set_session(fixture_session(other_user()));

    assert_eq!(
        h.workflow.delete_draft(&mine.id).await,
        Err(WorkflowError::NotOwner(mine.id.clone()))
    );
    assert_eq!(h.fakes.records.rows().record(&mine.id), Some(mine.clone()));
    assert!(h.fakes.storage.objects().contains(&mine.before_photo_url));
    assert_eq!(h.fakes.records.calls(StoreOp::Delete), 0);
}

#[tokio::test]
async fn foreign_records_are_checked_without_photo_cleanup() {
    let h = harness_with(
        TestBackend::signed_in(),
        WorkflowConfig::new().with_delete_photos_with_record(false),
    );
    let other = other_user().id;
    h.fakes
        .records
        .rows()
        .insert(record("t8", Some(&other), None, Utc::now()));

    assert_eq!(
        h.workflow.delete_draft(&TransformationId::new("t8")).await,
        Err(WorkflowError::NotOwner(TransformationId::new("t8")))
    );
    assert!(h.fakes.records.rows().record(&TransformationId::new("t8")).is_some());
}

#[tokio::test]
async fn failed_lookup_aborts_delete() {
    let h = harness();
    h.fakes
        .records
        .fail_next(StoreOp::Get, StoreError::Network("offline".to_string()));

    let err = h
        .workflow
        .delete_draft(&TransformationId::new("t3"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Store(StoreError::Network(_))));
    assert_eq!(h.fakes.records.calls(StoreOp::Delete), 0);
}

#[tokio::test]
async fn photos_survive_delete_when_cleanup_disabled() {
    let mut h = harness_with(
        TestBackend::signed_in(),
        WorkflowConfig::new().with_delete_photos_with_record(false),
    );
    let draft = h.saved_draft().await;

    h.workflow.delete_draft(&draft.id).await.unwrap();

    assert!(h.fakes.storage.objects().contains(&draft.before_photo_url));
    assert_eq!(h.fakes.storage.delete_calls(), 0);
}

#[tokio::test]
async fn listings_split_by_completion_and_owner() {
    let h = harness();
    let me = h.fakes.user().unwrap().id;
    let other = other_user().id;
    let now = Utc::now();
    let rows = h.fakes.records.rows();
    rows.insert(record("t1", Some(&me), None, now - Duration::minutes(4)));
    rows.insert(record("t2", Some(&me), Some("https://cdn/t2-after.jpg"), now - Duration::minutes(3)));
    rows.insert(record("t3", Some(&other), None, now - Duration::minutes(2)));
    rows.insert(record("t4", Some(&other), Some("https://cdn/t4-after.jpg"), now - Duration::minutes(1)));
    rows.insert(record("t5", None, Some("https://cdn/t5-after.jpg"), now));

    let drafts = h.workflow.list_drafts().await.unwrap();
    let ids: Vec<_> = drafts.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["t1"]);

    let feed = h.workflow.list_completed().await.unwrap();
    let ids: Vec<_> = feed.iter().map(|e| e.transformation.id.as_str()).collect();
    assert_eq!(ids, ["t5", "t4", "t2"]);
    assert!(feed.iter().all(|e| e.transformation.is_complete()));
    assert_eq!(feed[0].author.name, ANONYMOUS_NAME);
    assert_eq!(feed[1].author.name, "Riley");
    assert_eq!(feed[2].author.name, "Test User");
    assert!(feed[2].author.is_current_user);

    let theirs = h.workflow.list_completed_by(&other).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].transformation.id.as_str(), "t4");

    let profile = h.workflow.profile().await.unwrap();
    assert_eq!(profile.total, 2);
    assert_eq!(profile.completed, 1);
    assert_eq!(profile.author.name, "Test User");
}

#[tokio::test]
async fn drafts_snapshot_tracks_local_saves() {
    let mut h = harness();
    h.workflow.list_drafts().await.unwrap();
    let draft = h.saved_draft().await;
    assert_eq!(h.workflow.drafts(), vec![draft]);

    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.workflow.submit_captured_photo().await.unwrap();
    assert!(h.workflow.drafts().is_empty());
}

#[tokio::test]
async fn signed_out_submission_requires_auth() {
    let h = harness_with(TestBackend::signed_out(), WorkflowConfig::new());
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    assert_eq!(err, WorkflowError::AuthRequired);
    assert!(err.requires_auth());
    assert_eq!(h.workflow.state_kind(), StateKind::BeforeCaptured);
    assert_eq!(h.fakes.storage.upload_calls(), 0);
    assert_eq!(
        h.workflow.list_drafts().await.unwrap_err(),
        WorkflowError::AuthRequired
    );
    assert_eq!(h.workflow.profile().await.unwrap_err(), WorkflowError::AuthRequired);
    assert_eq!(h.fakes.records.calls(StoreOp::List), 0);
}

#[tokio::test]
async fn anonymous_records_when_allowed() {
    let mut h = harness_with(
        TestBackend::signed_out(),
        WorkflowConfig::new().with_allow_anonymous(true),
    );

    let draft = h.saved_draft().await;

    assert!(draft.user_id.is_none());
    assert_eq!(h.workflow.list_drafts().await.unwrap(), vec![draft]);
}

#[tokio::test]
async fn unauthorized_upload_maps_to_auth_required() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.storage.fail_next_upload(UploadError::Unauthorized);

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    assert_eq!(err, WorkflowError::AuthRequired);
    assert_eq!(h.workflow.state_kind(), StateKind::BeforeCaptured);
}

#[tokio::test]
async fn capture_policy_rejections() {
    let mut h = harness();

    assert_eq!(
        h.workflow.accept_photo(PhotoSlot::After, after_photo()),
        Err(WorkflowError::NoActiveDraft)
    );
    assert_eq!(h.workflow.state_kind(), StateKind::Empty);

    let draft = h.saved_draft().await;
    assert_eq!(
        h.workflow.accept_photo(PhotoSlot::Before, before_photo()),
        Err(WorkflowError::BeforeAlreadySaved(draft.id.clone()))
    );

    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.workflow.submit_captured_photo().await.unwrap();
    assert_eq!(
        h.workflow.accept_photo(PhotoSlot::After, after_photo()),
        Err(WorkflowError::AlreadyComplete(draft.id))
    );
    assert_eq!(
        h.workflow.submit_captured_photo().await.unwrap_err(),
        WorkflowError::NothingToSubmit
    );
}

#[tokio::test]
async fn recapture_replaces_pending_photo() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    let retake = reframe_model::LocalPhoto::new("file://a2.jpg");
    h.workflow
        .accept_photo(PhotoSlot::Before, retake.clone())
        .unwrap();

    assert_eq!(h.workflow.state(), WorkflowState::BeforeCaptured { photo: retake });
}

#[tokio::test]
async fn before_capture_after_complete_starts_over() {
    let mut h = harness();
    h.saved_draft().await;
    h.workflow.accept_photo(PhotoSlot::After, after_photo()).unwrap();
    h.workflow.submit_captured_photo().await.unwrap();
    h.drain();

    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();

    assert_eq!(
        h.transitions(),
        vec![
            (StateKind::Complete, StateKind::Empty),
            (StateKind::Empty, StateKind::BeforeCaptured),
        ]
    );
    let second = h.workflow.submit_captured_photo().await.unwrap();
    assert_eq!(second.id.as_str(), "t2");
}

#[tokio::test]
async fn camera_outcomes() {
    let h = harness();
    h.fakes
        .capture
        .then_cancel()
        .then_error(CaptureError::PermissionDenied)
        .then_photo(BEFORE_URI);

    assert_eq!(h.workflow.capture(PhotoSlot::Before).await.unwrap(), None);
    assert_eq!(h.workflow.state_kind(), StateKind::Empty);

    let err = h.workflow.capture(PhotoSlot::Before).await.unwrap_err();
    assert_eq!(err, WorkflowError::Capture(CaptureError::PermissionDenied));
    assert_eq!(h.workflow.state_kind(), StateKind::Empty);

    let photo = h.workflow.capture(PhotoSlot::Before).await.unwrap();
    assert_eq!(photo, Some(before_photo()));
    assert_eq!(h.workflow.state_kind(), StateKind::BeforeCaptured);
}

#[tokio::test]
async fn after_capture_without_draft_never_opens_camera() {
    let h = harness();
    h.fakes.capture.then_photo(AFTER_URI);

    let err = h.workflow.capture(PhotoSlot::After).await.unwrap_err();

    assert_eq!(err, WorkflowError::NoActiveDraft);
    assert_eq!(h.fakes.capture.calls(), 0);
}

#[tokio::test]
async fn preprocessing_failure_uploads_original() {
    let fakes = TestBackend::signed_in();
    let preprocessor = Arc::new(FailingPreprocessor::default());
    let workflow = TransformationWorkflow::new(
        fakes.backend().with_preprocessor(preprocessor.clone()),
        WorkflowConfig::new(),
    );
    workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();

    let draft = workflow.submit_captured_photo().await.unwrap();

    assert_eq!(preprocessor.calls(), 1);
    assert_eq!(
        fakes.storage.objects().source_of(&draft.before_photo_url),
        Some(before_photo())
    );
}

#[tokio::test]
async fn sign_out_resets_active_transformation() {
    let mut h = harness();
    h.saved_draft().await;
    h.workflow.list_drafts().await.unwrap();
    h.drain();

    h.fakes.session.clear();

    assert_eq!(h.workflow.state(), WorkflowState::Empty);
    assert!(h.workflow.drafts().is_empty());
    assert_eq!(h.transitions(), vec![(StateKind::Draft, StateKind::Empty)]);
}

#[tokio::test]
async fn token_refresh_keeps_active_transformation() {
    let mut h = harness();
    h.saved_draft().await;
    let user = h.fakes.user().unwrap();

    h.fakes.session.set_session(fixture_session(user));

    assert_eq!(h.workflow.state_kind(), StateKind::Draft);
}

#[tokio::test]
async fn switching_user_resets_active_transformation() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();

    h.fakes.session.set_session(fixture_session(other_user()));

    assert_eq!(h.workflow.state_kind(), StateKind::Empty);
}

#[tokio::test]
async fn discard_during_upload_orphans_the_photo() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.storage.hold_uploads();

    let (result, ()) = tokio::join!(h.workflow.submit_captured_photo(), async {
        h.fakes.storage.upload_started().await;
        assert_eq!(h.workflow.state_kind(), StateKind::BeforeUploading);
        h.workflow.discard_active();
        h.fakes.storage.release_upload();
    });

    assert_eq!(result.unwrap_err(), WorkflowError::Superseded { saved: None });
    assert_eq!(h.workflow.state(), WorkflowState::Empty);
    assert!(h.fakes.records.rows().is_empty());
    let orphans = h.workflow.orphans();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].reason, OrphanReason::Superseded);
}

#[tokio::test]
async fn busy_while_uploading() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.storage.hold_uploads();

    let (result, ()) = tokio::join!(h.workflow.submit_captured_photo(), async {
        h.fakes.storage.upload_started().await;
        assert_eq!(
            h.workflow.accept_photo(PhotoSlot::Before, before_photo()),
            Err(WorkflowError::Busy)
        );
        assert_eq!(
            h.workflow.submit_captured_photo().await.unwrap_err(),
            WorkflowError::Busy
        );
        h.fakes.storage.release_upload();
    });

    assert!(result.is_ok());
    assert_eq!(h.fakes.storage.upload_calls(), 1);
}

#[tokio::test]
async fn slow_upload_times_out() {
    let h = harness_with(
        TestBackend::signed_in(),
        WorkflowConfig::new().with_timeout_secs(1),
    );
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.storage.hold_uploads();

    let err = h.workflow.submit_captured_photo().await.unwrap_err();

    assert_eq!(err, WorkflowError::Upload(UploadError::Timeout { secs: 1 }));
    assert_eq!(h.workflow.state_kind(), StateKind::BeforeCaptured);
}

#[tokio::test]
async fn resume_rejects_complete_and_foreign_records() {
    let h = harness();
    let other = other_user().id;
    let me = h.fakes.user().unwrap().id;
    let now = Utc::now();
    h.fakes
        .records
        .rows()
        .insert(record("t7", Some(&me), Some("https://cdn/t7-after.jpg"), now));
    h.fakes.records.rows().insert(record("t8", Some(&other), None, now));

    assert_eq!(
        h.workflow.resume_draft(&TransformationId::new("t7")).await,
        Err(WorkflowError::AlreadyComplete(TransformationId::new("t7")))
    );
    assert_eq!(
        h.workflow.resume_draft(&TransformationId::new("t8")).await,
        Err(WorkflowError::NotOwner(TransformationId::new("t8")))
    );
    assert!(matches!(
        h.workflow.resume_draft(&TransformationId::new("t9")).await,
        Err(WorkflowError::Store(StoreError::NotFound(_)))
    ));
    assert_eq!(h.workflow.state_kind(), StateKind::Empty);
}

#[tokio::test]
async fn discard_keeps_persisted_draft() {
    let mut h = harness();
    let draft = h.saved_draft().await;

    h.workflow.discard_active();

    assert_eq!(h.workflow.state_kind(), StateKind::Empty);
    assert_eq!(h.workflow.transformation(&draft.id).await.unwrap(), draft);
    assert!(matches!(
        h.workflow.transformation(&TransformationId::new("t404")).await,
        Err(WorkflowError::Store(StoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn superseded_save_still_lists_the_draft() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.records.hold_creates();

    let (result, ()) = tokio::join!(h.workflow.submit_captured_photo(), async {
        h.fakes.records.create_started().await;
        h.workflow.discard_active();
        h.fakes.records.release_create();
    });

    let id = TransformationId::new("t1");
    assert_eq!(
        result.unwrap_err(),
        WorkflowError::Superseded { saved: Some(id.clone()) }
    );
    assert_eq!(h.workflow.state(), WorkflowState::Empty);
    let drafts = h.workflow.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, id);
    assert!(h.workflow.orphans().is_empty());
}

#[tokio::test]
async fn superseded_save_of_previous_user_stays_out_of_drafts() {
    let h = harness();
    h.workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    h.fakes.records.hold_creates();

    let (result, ()) = tokio::join!(h.workflow.submit_captured_photo(), async {
        h.fakes.records.create_started().await;
        h.fakes.session.set_session(fixture_session(other_user()));
        h.fakes.records.release_create();
    });

    assert!(matches!(
        result,
        Err(WorkflowError::Superseded { saved: Some(_) })
    ));
    assert!(h.workflow.drafts().is_empty());
}

fn write_png(path: &std::path::Path) {
    RgbImage::from_pixel(64, 48, Rgb([200, 40, 40]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

#[tokio::test]
async fn compressed_copies_are_removed_after_upload() {
    let photos = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let source = photos.path().join("before.png");
    write_png(&source);

    let fakes = TestBackend::signed_in();
    let preprocessor =
        JpegPreprocessor::new(PreprocessConfig::new().with_output_dir(output.path()));
    let workflow = TransformationWorkflow::new(
        fakes.backend().with_preprocessor(Arc::new(preprocessor)),
        WorkflowConfig::new(),
    );

    workflow
        .accept_photo(PhotoSlot::Before, LocalPhoto::from_path(&source))
        .unwrap();
    fakes
        .storage
        .fail_next_upload(UploadError::Network("offline".to_string()));
    assert!(workflow.submit_captured_photo().await.is_err());

    for _ in 0..3 {
        workflow.discard_active();
        workflow
            .accept_photo(PhotoSlot::Before, LocalPhoto::from_path(&source))
            .unwrap();
        let draft = workflow.submit_captured_photo().await.unwrap();
        let uploaded = fakes.storage.objects().source_of(&draft.before_photo_url).unwrap();
        assert_eq!(uploaded.path().parent(), Some(output.path()));
    }

    assert_eq!(fakes.storage.upload_calls(), 4);
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    assert!(source.exists());
}
