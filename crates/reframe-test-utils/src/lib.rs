//! Testing utilities for the Reframe workspace
//!
//! Scriptable collaborators and fixtures shared by the crates' tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reframe_backend::{
    Backend, CaptureError, ImagePreprocessor, MemoryObjectStorage, MemoryRecordStore,
    ObjectStorage, PhotoCapture, PreprocessError, RecordStore, SessionStore, StoreError,
    UploadError,
};
use reframe_model::{
    AuthSession, AuthUser, LocalPhoto, NewTransformation, PhotoSlot, PhotoUrl, RecordQuery,
    Transformation, TransformationId, UserId, UserMetadata,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub const BEFORE_URI: &str = "file://a.jpg";
pub const AFTER_URI: &str = "file://b.jpg";

pub fn fixture_user() -> AuthUser {
    AuthUser::new(UserId::new("aaa1-0000")).with_metadata(UserMetadata {
        full_name: Some("Test User".to_string()),
        ..UserMetadata::default()
    })
}

pub fn other_user() -> AuthUser {
    AuthUser::new(UserId::new("bbb3-0000")).with_email("other@example.com")
}

pub fn fixture_session(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("access-{}", user.id),
        refresh_token: format!("refresh-{}", user.id),
        expires_in: 3600,
        expires_at: None,
        token_type: "bearer".to_string(),
        user,
    }
}

pub fn signed_in_store() -> Arc<SessionStore> {
    Arc::new(SessionStore::signed_in(fixture_session(fixture_user())))
}

pub fn before_photo() -> LocalPhoto {
    LocalPhoto::new(BEFORE_URI)
}

pub fn after_photo() -> LocalPhoto {
    LocalPhoto::new(AFTER_URI)
}

pub fn photo_url(url: &str) -> PhotoUrl {
    PhotoUrl::new(url).unwrap()
}

/// A stored row, for seeding record stores
pub fn record(
    id: &str,
    owner: Option<&UserId>,
    after: Option<&str>,
    created_at: DateTime<Utc>,
) -> Transformation {
    Transformation {
        id: TransformationId::new(id),
        before_photo_url: photo_url(&format!("https://cdn/{id}-before.jpg")),
        after_photo_url: after.map(photo_url),
        created_at,
        updated_at: created_at,
        user_id: owner.cloned(),
    }
}

/// Memory storage with scripted failures, call counts and an upload gate
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryObjectStorage,
    upload_failures: Mutex<VecDeque<UploadError>>,
    delete_failures: Mutex<VecDeque<UploadError>>,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    hold_uploads: AtomicBool,
    upload_started: Notify,
    upload_released: Notify,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_upload(&self, err: UploadError) {
        self.upload_failures.lock().push_back(err);
    }

    pub fn fail_next_delete(&self, err: UploadError) {
        self.delete_failures.lock().push_back(err);
    }

    /// Park every upload until [`Self::release_upload`]
    pub fn hold_uploads(&self) {
        self.hold_uploads.store(true, Ordering::SeqCst);
    }

    pub async fn upload_started(&self) {
        self.upload_started.notified().await;
    }

    pub fn release_upload(&self) {
        self.upload_released.notify_one();
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn objects(&self) -> &MemoryObjectStorage {
        &self.inner
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn upload(&self, photo: &LocalPhoto, slot: PhotoSlot) -> Result<PhotoUrl, UploadError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.hold_uploads.load(Ordering::SeqCst) {
            self.upload_started.notify_one();
            self.upload_released.notified().await;
        }
        let scripted = self.upload_failures.lock().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        self.inner.upload(photo, slot).await
    }

    async fn delete(&self, url: &PhotoUrl) -> Result<bool, UploadError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let scripted = self.delete_failures.lock().pop_front();
        if let Some(err) = scripted {
            return Err(err);
        }
        self.inner.delete(url).await
    }
}

/// Record store operations, for scripting and counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    Update,
    Delete,
    Get,
    List,
}

/// Memory record store with scripted failures, call counts and a create gate
#[derive(Debug, Default)]
pub struct FlakyRecords {
    inner: MemoryRecordStore,
    failures: Mutex<HashMap<StoreOp, VecDeque<StoreError>>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    hold_creates: AtomicBool,
    create_started: Notify,
    create_released: Notify,
}

impl FlakyRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.failures.lock().entry(op).or_default().push_back(err);
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn rows(&self) -> &MemoryRecordStore {
        &self.inner
    }

    /// Park every create until [`Self::release_create`]
    pub fn hold_creates(&self) {
        self.hold_creates.store(true, Ordering::SeqCst);
    }

    pub async fn create_started(&self) {
        self.create_started.notified().await;
    }

    pub fn release_create(&self) {
        self.create_released.notify_one();
    }

    fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        *self.calls.lock().entry(op).or_default() += 1;
        match self.failures.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for FlakyRecords {
    async fn create(&self, new: NewTransformation) -> Result<Transformation, StoreError> {
        self.enter(StoreOp::Create)?;
        if self.hold_creates.load(Ordering::SeqCst) {
            self.create_started.notify_one();
            self.create_released.notified().await;
        }
        self.inner.create(new).await
    }

    async fn update(
        &self,
        id: &TransformationId,
        after_photo_url: &PhotoUrl,
    ) -> Result<Transformation, StoreError> {
        self.enter(StoreOp::Update)?;
        self.inner.update(id, after_photo_url).await
    }

    async fn delete(&self, id: &TransformationId) -> Result<bool, StoreError> {
        self.enter(StoreOp::Delete)?;
        self.inner.delete(id).await
    }

    async fn get(&self, id: &TransformationId) -> Result<Transformation, StoreError> {
        self.enter(StoreOp::Get)?;
        self.inner.get(id).await
    }

    async fn list(&self, query: &RecordQuery) -> Result<Vec<Transformation>, StoreError> {
        self.enter(StoreOp::List)?;
        self.inner.list(query).await
    }
}

/// Camera that replays a script; cancels once the script runs out
#[derive(Debug, Default)]
pub struct ScriptedCapture {
    script: Mutex<VecDeque<Result<Option<LocalPhoto>, CaptureError>>>,
    calls: AtomicUsize,
}

impl ScriptedCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_photo(&self, uri: &str) -> &Self {
        self.script.lock().push_back(Ok(Some(LocalPhoto::new(uri))));
        self
    }

    pub fn then_cancel(&self) -> &Self {
        self.script.lock().push_back(Ok(None));
        self
    }

    pub fn then_error(&self, err: CaptureError) -> &Self {
        self.script.lock().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoCapture for ScriptedCapture {
    async fn capture(&self, _slot: PhotoSlot) -> Result<Option<LocalPhoto>, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(Ok(None))
    }
}

/// Preprocessor that always fails to decode
#[derive(Debug, Default)]
pub struct FailingPreprocessor {
    calls: AtomicUsize,
}

impl FailingPreprocessor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImagePreprocessor for FailingPreprocessor {
    async fn compress(&self, photo: &LocalPhoto) -> Result<LocalPhoto, PreprocessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PreprocessError::Decode(format!("not an image: {photo}")))
    }
}

/// Every fake wired into one [`Backend`]
#[derive(Debug, Clone)]
pub struct TestBackend {
    pub storage: Arc<FlakyStorage>,
    pub records: Arc<FlakyRecords>,
    pub session: Arc<SessionStore>,
    pub capture: Arc<ScriptedCapture>,
}

impl TestBackend {
    pub fn signed_in() -> Self {
        Self::with_session(signed_in_store())
    }

    pub fn signed_out() -> Self {
        Self::with_session(Arc::new(SessionStore::in_memory()))
    }

    pub fn with_session(session: Arc<SessionStore>) -> Self {
        Self {
            storage: Arc::new(FlakyStorage::new()),
            records: Arc::new(FlakyRecords::new()),
            session,
            capture: Arc::new(ScriptedCapture::new()),
        }
    }

    pub fn backend(&self) -> Backend {
        Backend::new(
            self.storage.clone(),
            self.records.clone(),
            self.session.clone(),
        )
        .with_capture(self.capture.clone())
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.session.session().map(|s| s.user)
    }
}
