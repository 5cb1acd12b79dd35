//! Interaction tests against a mocked record store

use async_trait::async_trait;
use chrono::Utc;
use mockall::{mock, predicate::eq};
use reframe_backend::{Backend, RecordStore, StoreError};
use reframe_core::{StateKind, TransformationWorkflow, WorkflowConfig, WorkflowError};
use reframe_model::{
    NewTransformation, PhotoSlot, PhotoUrl, RecordQuery, Transformation, TransformationId,
};
use reframe_test_utils::{after_photo, before_photo, fixture_user, signed_in_store, FlakyStorage};
use std::sync::Arc;

mock! {
    pub Records {}

    #[async_trait]
    impl RecordStore for Records {
        async fn create(&self, new: NewTransformation) -> Result<Transformation, StoreError>;
        async fn update(
            &self,
            id: &TransformationId,
            after_photo_url: &PhotoUrl,
        ) -> Result<Transformation, StoreError>;
        async fn delete(&self, id: &TransformationId) -> Result<bool, StoreError>;
        async fn get(&self, id: &TransformationId) -> Result<Transformation, StoreError>;
        async fn list(&self, query: &RecordQuery) -> Result<Vec<Transformation>, StoreError>;
    }
}

fn draft(id: &str) -> Transformation {
    let now = Utc::now();
    Transformation {
        id: TransformationId::new(id),
        before_photo_url: PhotoUrl::new("https://cdn/before1.jpg").unwrap(),
        after_photo_url: None,
        created_at: now,
        updated_at: now,
        user_id: Some(fixture_user().id),
    }
}

fn workflow(records: MockRecords) -> TransformationWorkflow {
    let backend = Backend::new(
        Arc::new(FlakyStorage::new()),
        Arc::new(records),
        signed_in_store(),
    );
    TransformationWorkflow::new(backend, WorkflowConfig::new())
}

#[tokio::test]
async fn before_submission_creates_once_with_owner() {
    let mut records = MockRecords::new();
    records
        .expect_create()
        .withf(|new| {
            new.before_photo_url.as_str() == "https://cdn/before1.jpg"
                && new.user_id == Some(fixture_user().id)
        })
        .times(1)
        .returning(|_| Ok(draft("t1")));
    records.expect_update().never();

    let workflow = workflow(records);
    workflow
        .accept_photo(PhotoSlot::Before, before_photo())
        .unwrap();
    let saved = workflow.submit_captured_photo().await.unwrap();

    assert_eq!(saved.id.as_str(), "t1");
    assert_eq!(workflow.state_kind(), StateKind::Draft);
}

#[tokio::test]
async fn after_submission_updates_only_the_after_url() {
    let mut records = MockRecords::new();
    records
        .expect_get()
        .with(eq(TransformationId::new("t1")))
        .times(1)
        .returning(|_| Ok(draft("t1")));
    records
        .expect_update()
        .withf(|id, url| id.as_str() == "t1" && url.as_str() == "https://cdn/after1.jpg")
        .times(1)
        .returning(|_, url| {
            let mut record = draft("t1");
            record.after_photo_url = Some(url.clone());
            record.updated_at = Utc::now();
            Ok(record)
        });
    records.expect_create().never();

    let workflow = workflow(records);
    workflow
        .resume_draft(&TransformationId::new("t1"))
        .await
        .unwrap();
    workflow
        .accept_photo(PhotoSlot::After, after_photo())
        .unwrap();
    let complete = workflow.submit_captured_photo().await.unwrap();

    assert!(complete.is_complete());
    assert_eq!(workflow.state_kind(), StateKind::Complete);
}

#[tokio::test]
async fn list_drafts_queries_own_drafts() {
    let mut records = MockRecords::new();
    records
        .expect_list()
        .with(eq(RecordQuery::drafts().owned_by(fixture_user().id)))
        .times(1)
        .returning(|_| Ok(vec![draft("t2"), draft("t1")]));

    let drafts = workflow(records).list_drafts().await.unwrap();

    let ids: Vec<_> = drafts.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["t2", "t1"]);
}

#[tokio::test]
async fn list_drafts_drops_completed_rows() {
    let mut records = MockRecords::new();
    records.expect_list().returning(|_| {
        let mut done = draft("t3");
        done.after_photo_url = Some(PhotoUrl::new("https://cdn/after3.jpg").unwrap());
        Ok(vec![done, draft("t1")])
    });

    let drafts = workflow(records).list_drafts().await.unwrap();

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id.as_str(), "t1");
}

#[tokio::test]
async fn profile_queries_everything_owned() {
    let mut records = MockRecords::new();
    records
        .expect_list()
        .with(eq(RecordQuery::all().owned_by(fixture_user().id)))
        .times(1)
        .returning(|_| Ok(vec![draft("t1")]));

    let profile = workflow(records).profile().await.unwrap();

    assert_eq!(profile.total, 1);
    assert_eq!(profile.completed, 0);
}

#[tokio::test]
async fn unauthorized_store_maps_to_auth_required() {
    let mut records = MockRecords::new();
    records
        .expect_list()
        .returning(|_| Err(StoreError::Unauthorized));

    let err = workflow(records).list_drafts().await.unwrap_err();

    assert_eq!(err, WorkflowError::AuthRequired);
}

#[tokio::test]
async fn delete_of_unknown_record_looks_it_up_first() {
    let mut records = MockRecords::new();
    let mut seq = mockall::Sequence::new();
    records
        .expect_get()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id| Err(StoreError::NotFound(id.clone())));
    records
        .expect_delete()
        .with(eq(TransformationId::new("t5")))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(false));

    let existed = workflow(records)
        .delete_draft(&TransformationId::new("t5"))
        .await
        .unwrap();

    assert!(!existed);
}
