//! Transformation workflow controller
//!
//! Drives one active transformation from no photos to complete:
//! capture, preprocess, upload, then create or update the backing record.
//! Local state only changes through the transition table, and every
//! failure leaves it in a defined state.
//!
//! State lives behind a `parking_lot` mutex that is never held across an
//! `.await`. A generation counter is bumped whenever the active
//! transformation is dropped (discard, auth change, deleting the active
//! draft); calls that started under an older generation finish without
//! touching the new state.

use crate::config::WorkflowConfig;
use crate::error::{Result, WorkflowError};
use crate::events::{EventBus, StateChangeEvent, WorkflowEvent};
use crate::feed::{FeedEntry, Profile};
use crate::orphans::{OrphanLedger, OrphanReason, OrphanedPhoto, SweepReport};
use crate::state::{StateKind, WorkflowState};
use crate::state_machine::validate_transition;
use parking_lot::Mutex;
use reframe_backend::{AuthEvent, AuthListener, AuthSubscription, Backend, StoreError, UploadError};
use reframe_model::{
    AuthUser, LocalPhoto, NewTransformation, PhotoSlot, PhotoUrl, RecordQuery, Transformation,
    TransformationId, UserId,
};
use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    generation: u64,
    /// Last fetched draft listing, kept in step with local deletes/saves
    drafts: Vec<Transformation>,
}

impl Inner {
    fn transition(&mut self, next: WorkflowState) -> Result<StateChangeEvent> {
        let previous = self.state.kind();
        let new_state = next.kind();
        validate_transition(previous, new_state)?;
        self.state = next;

        let id = self.state.record_id().cloned();
        tracing::info!(%previous, %new_state, id = ?id, "workflow transition");
        Ok(StateChangeEvent {
            id,
            previous,
            new_state,
        })
    }

    /// Drop the active transformation and invalidate in-flight calls
    fn reset(&mut self) -> Option<StateChangeEvent> {
        self.generation += 1;
        if matches!(self.state, WorkflowState::Empty) {
            return None;
        }
        // Empty is reachable from every other state
        self.transition(WorkflowState::Empty).ok()
    }
}

/// A photo on its way to storage
#[derive(Debug, Clone)]
struct Submission {
    slot: PhotoSlot,
    photo: LocalPhoto,
    /// Draft being completed; `None` for a before photo
    draft: Option<Transformation>,
    owner: Option<UserId>,
    generation: u64,
}

impl Submission {
    fn captured_state(&self) -> WorkflowState {
        match &self.draft {
            None => WorkflowState::BeforeCaptured {
                photo: self.photo.clone(),
            },
            Some(record) => WorkflowState::AfterCaptured {
                record: record.clone(),
                photo: self.photo.clone(),
            },
        }
    }

    fn uploading_state(&self) -> WorkflowState {
        match &self.draft {
            None => WorkflowState::BeforeUploading {
                photo: self.photo.clone(),
            },
            Some(record) => WorkflowState::AfterUploading {
                record: record.clone(),
                photo: self.photo.clone(),
            },
        }
    }
}

/// Workflow controller for before/after transformations
///
/// One active transformation per instance. Browsing queries may run
/// concurrently with an upload.
pub struct TransformationWorkflow {
    backend: Backend,
    config: WorkflowConfig,
    inner: Arc<Mutex<Inner>>,
    events: EventBus,
    orphans: OrphanLedger,
    _auth_subscription: AuthSubscription,
}

impl TransformationWorkflow {
    /// Create a controller; subscribes to auth changes for its lifetime
    pub fn new(backend: Backend, config: WorkflowConfig) -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let events = EventBus::new(config.event_capacity);
        let subscription = backend
            .auth
            .on_auth_change(auth_listener(Arc::downgrade(&inner), events.clone()));

        Self {
            backend,
            config,
            inner,
            events,
            orphans: OrphanLedger::default(),
            _auth_subscription: subscription,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.inner.lock().state.clone()
    }

    #[must_use]
    pub fn state_kind(&self) -> StateKind {
        self.inner.lock().state.kind()
    }

    /// Draft listing as of the last successful [`Self::list_drafts`]
    #[must_use]
    pub fn drafts(&self) -> Vec<Transformation> {
        self.inner.lock().drafts.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Uploaded photos no record references
    #[must_use]
    pub fn orphans(&self) -> Vec<OrphanedPhoto> {
        self.orphans.snapshot()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.backend.auth.current_user()
    }

    /// Take a photo for `slot` and make it the active capture
    ///
    /// Returns `Ok(None)` if the user cancelled; state is then unchanged.
    ///
    /// # Errors
    /// - `Busy` while an upload is in flight
    /// - `NoActiveDraft` / `AlreadyComplete` for an after photo without a draft
    /// - `BeforeAlreadySaved` for a before photo once the draft exists
    /// - `Capture` when the camera fails
    pub async fn capture(&self, slot: PhotoSlot) -> Result<Option<LocalPhoto>> {
        check_capture(&self.inner.lock().state, slot)?;

        let photo = match self.backend.capture.capture(slot).await {
            Ok(Some(photo)) => photo,
            Ok(None) => {
                tracing::debug!(%slot, "capture cancelled");
                return Ok(None);
            }
            Err(e) => {
                tracing::error!(%slot, error = %e, "capture failed");
                return Err(e.into());
            }
        };

        self.accept_photo(slot, photo.clone())?;
        Ok(Some(photo))
    }

    /// Use an already captured local photo for `slot`
    ///
    /// A before photo on a complete transformation starts a new one; a
    /// repeated capture replaces the pending photo.
    pub fn accept_photo(&self, slot: PhotoSlot, photo: LocalPhoto) -> Result<StateKind> {
        let (changes, kind) = {
            let mut inner = self.inner.lock();
            check_capture(&inner.state, slot)?;

            let mut changes = Vec::with_capacity(2);
            let next = match slot {
                PhotoSlot::Before => {
                    if matches!(inner.state, WorkflowState::Complete { .. }) {
                        changes.extend(inner.reset());
                    }
                    WorkflowState::BeforeCaptured { photo }
                }
                PhotoSlot::After => {
                    let record = inner
                        .state
                        .record()
                        .cloned()
                        .ok_or(WorkflowError::NoActiveDraft)?;
                    WorkflowState::AfterCaptured { record, photo }
                }
            };
            changes.push(inner.transition(next)?);
            (changes, inner.state.kind())
        };

        self.events
            .emit_all(changes.into_iter().map(WorkflowEvent::StateChanged));
        Ok(kind)
    }

    /// Upload the captured photo and save it to the record store
    ///
    /// A before photo creates a draft; an after photo completes the active
    /// draft. Compression is best-effort.
    ///
    /// # Errors
    /// - `AuthRequired` with nobody signed in (state untouched)
    /// - `Upload` when storage fails; state rolls back and the same photo
    ///   can be submitted again
    /// - `OrphanedUpload` when the record call fails after the upload;
    ///   state rolls back and the photo is added to the orphan ledger
    /// - `Superseded` when the transformation was discarded meanwhile
    pub async fn submit_captured_photo(&self) -> Result<Transformation> {
        let viewer = self.backend.auth.current_user();
        let submission = self.begin_submission(viewer.as_ref())?;
        let slot = submission.slot;
        tracing::info!(%slot, photo = %submission.photo, "submitting photo");

        let prepared = match self.backend.preprocessor.compress(&submission.photo).await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(%slot, error = %e, "preprocessing failed, uploading original");
                submission.photo.clone()
            }
        };

        let upload = self.backend.storage.upload(&prepared, slot);
        let uploaded = self.bounded(upload, |secs| UploadError::Timeout { secs }).await;
        if prepared != submission.photo {
            remove_prepared(&prepared).await;
        }
        let url = match uploaded {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(%slot, error = %e, "upload failed");
                self.roll_back(&submission);
                return Err(e.into());
            }
        };
        tracing::debug!(%slot, %url, "photo uploaded");

        if !self.is_current(submission.generation) {
            self.record_orphan(url, slot, OrphanReason::Superseded);
            return Err(WorkflowError::Superseded { saved: None });
        }

        let saved = match &submission.draft {
            None => {
                let mut new = NewTransformation::new(url.clone());
                if let Some(owner) = submission.owner.clone() {
                    new = new.owned_by(owner);
                }
                self.bounded(self.backend.records.create(new), |secs| {
                    StoreError::Timeout { secs }
                })
                .await
            }
            Some(draft) => {
                self.bounded(self.backend.records.update(&draft.id, &url), |secs| {
                    StoreError::Timeout { secs }
                })
                .await
            }
        };

        match saved {
            Ok(record) => self.finish_submission(&submission, record),
            Err(e) => {
                tracing::error!(%slot, %url, error = %e, "record save failed after upload");
                self.record_orphan(url.clone(), slot, OrphanReason::StoreFailed(e.to_string()));
                self.roll_back(&submission);
                Err(WorkflowError::orphaned(url, slot, e))
            }
        }
    }

    /// Load an existing draft into the active slot
    ///
    /// Any local-only photo is abandoned.
    ///
    /// # Errors
    /// - `AlreadyComplete` if the record has its after photo
    /// - `NotOwner` if it belongs to someone else
    /// - `Store` if the record cannot be fetched
    pub async fn resume_draft(&self, id: &TransformationId) -> Result<Transformation> {
        let viewer = self.require_user()?;
        let generation = self.idle_generation()?;

        let record = self
            .bounded(self.backend.records.get(id), |secs| StoreError::Timeout { secs })
            .await?;

        if record.is_complete() {
            return Err(WorkflowError::AlreadyComplete(record.id));
        }
        check_owner(&record, viewer.as_ref())?;

        self.load_draft(record.clone(), generation)?;
        Ok(record)
    }

    /// Return to `Empty`; persisted drafts are unaffected
    pub fn discard_active(&self) {
        let change = self.inner.lock().reset();
        if let Some(change) = change {
            tracing::info!(previous = %change.previous, "active transformation discarded");
            self.events.emit(WorkflowEvent::StateChanged(change));
        }
    }

    /// Delete a record; `Ok(false)` if it was already gone
    ///
    /// The local listing only changes once the store confirms. Deleting the
    /// active draft resets to `Empty`.
    ///
    /// # Errors
    /// - `NotOwner` if the record belongs to someone else
    /// - `Store` if the record cannot be looked up or deleted
    pub async fn delete_draft(&self, id: &TransformationId) -> Result<bool> {
        let viewer = self.require_user()?;

        let known = match self.known_record(id)? {
            Some(record) => Some(record),
            None => match self
                .bounded(self.backend.records.get(id), |secs| StoreError::Timeout { secs })
                .await
            {
                Ok(record) => Some(record),
                Err(StoreError::NotFound(_)) => None,
                Err(e) => {
                    tracing::error!(%id, error = %e, "lookup before delete failed");
                    return Err(e.into());
                }
            },
        };
        if let Some(record) = &known {
            check_owner(record, viewer.as_ref())?;
        }

        let existed = match self
            .bounded(self.backend.records.delete(id), |secs| StoreError::Timeout { secs })
            .await
        {
            Ok(existed) => existed,
            Err(e) => {
                tracing::error!(%id, error = %e, "delete failed");
                return Err(e.into());
            }
        };

        if let Some(change) = self.forget_record(id) {
            self.events.emit(WorkflowEvent::StateChanged(change));
        }
        self.events.emit(WorkflowEvent::DraftDeleted(id.clone()));
        tracing::info!(%id, existed, "transformation deleted");

        if existed && self.config.delete_photos_with_record {
            if let Some(record) = known {
                self.delete_stored_photos(&record).await;
            }
        }
        Ok(existed)
    }

    /// Refresh the current user's drafts, newest first
    pub async fn list_drafts(&self) -> Result<Vec<Transformation>> {
        let viewer = self.require_user()?;
        let generation = self.inner.lock().generation;

        let mut query = RecordQuery::drafts();
        if let Some(viewer) = &viewer {
            query = query.owned_by(viewer.id.clone());
        }

        let mut drafts = self
            .bounded(self.backend.records.list(&query), |secs| StoreError::Timeout { secs })
            .await?;
        drafts.retain(|record| !record.is_complete());
        tracing::debug!(count = drafts.len(), "drafts fetched");

        if self.store_drafts(generation, &drafts) {
            self.events.emit(WorkflowEvent::DraftsRefreshed(drafts.clone()));
        }
        Ok(drafts)
    }

    /// Everyone's completed transformations, newest first
    pub async fn list_completed(&self) -> Result<Vec<FeedEntry>> {
        self.completed_feed(RecordQuery::completed()).await
    }

    /// Completed transformations of one user
    pub async fn list_completed_by(&self, user: &UserId) -> Result<Vec<FeedEntry>> {
        self.completed_feed(RecordQuery::completed().owned_by(user.clone()))
            .await
    }

    /// The signed-in user's transformations and counts
    pub async fn profile(&self) -> Result<Profile> {
        let user = self
            .backend
            .auth
            .current_user()
            .ok_or(WorkflowError::AuthRequired)?;
        let query = RecordQuery::all().owned_by(user.id.clone());
        let records = self
            .bounded(self.backend.records.list(&query), |secs| StoreError::Timeout { secs })
            .await?;
        Ok(Profile::new(user, records))
    }

    pub async fn transformation(&self, id: &TransformationId) -> Result<Transformation> {
        Ok(self
            .bounded(self.backend.records.get(id), |secs| StoreError::Timeout { secs })
            .await?)
    }

    /// Delete every orphaned photo from storage
    ///
    /// Entries whose delete fails stay in the ledger for the next sweep.
    pub async fn sweep_orphans(&self) -> SweepReport {
        let pending = self.orphans.take_all();
        let deletes = pending.iter().map(|orphan| {
            self.bounded(self.backend.storage.delete(&orphan.url), |secs| {
                UploadError::Timeout { secs }
            })
        });
        let results = futures::future::join_all(deletes).await;

        let mut report = SweepReport::default();
        let mut kept = Vec::new();
        for (orphan, result) in pending.into_iter().zip(results) {
            match result {
                Ok(true) => report.reclaimed.push(orphan.url),
                Ok(false) => report.already_gone.push(orphan.url),
                Err(e) => {
                    tracing::warn!(url = %orphan.url, error = %e, "orphan delete failed");
                    report.failed.push((orphan.url.clone(), e));
                    kept.push(orphan);
                }
            }
        }
        self.orphans.restore(kept);

        tracing::info!(
            reclaimed = report.reclaimed.len(),
            already_gone = report.already_gone.len(),
            failed = report.failed.len(),
            "orphan sweep finished"
        );
        report
    }

    async fn completed_feed(&self, query: RecordQuery) -> Result<Vec<FeedEntry>> {
        let viewer = self.backend.auth.current_user();
        let mut records = self
            .bounded(self.backend.records.list(&query), |secs| StoreError::Timeout { secs })
            .await?;
        records.retain(Transformation::is_complete);
        Ok(FeedEntry::resolve_all(records, viewer.as_ref()))
    }

    async fn delete_stored_photos(&self, record: &Transformation) {
        let urls = std::iter::once(&record.before_photo_url).chain(record.after_photo_url.as_ref());
        for url in urls {
            let deleted = self
                .bounded(self.backend.storage.delete(url), |secs| UploadError::Timeout { secs })
                .await;
            match deleted {
                Ok(_) => tracing::debug!(%url, "stored photo deleted"),
                Err(e) => tracing::warn!(%url, error = %e, "could not delete stored photo"),
            }
        }
    }

    /// Run a remote call under the configured timeout
    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = std::result::Result<T, E>>,
        on_timeout: impl FnOnce(u64) -> E,
    ) -> std::result::Result<T, E> {
        match tokio::time::timeout(self.config.operation_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(self.config.operation_timeout_secs)),
        }
    }

    fn require_user(&self) -> Result<Option<AuthUser>> {
        match self.backend.auth.current_user() {
            Some(user) => Ok(Some(user)),
            None if self.config.allow_anonymous => Ok(None),
            None => Err(WorkflowError::AuthRequired),
        }
    }

    fn begin_submission(&self, viewer: Option<&AuthUser>) -> Result<Submission> {
        let (submission, change) = {
            let mut inner = self.inner.lock();
            let (slot, photo, draft) = match &inner.state {
                WorkflowState::BeforeCaptured { photo } => (PhotoSlot::Before, photo.clone(), None),
                WorkflowState::AfterCaptured { record, photo } => {
                    (PhotoSlot::After, photo.clone(), Some(record.clone()))
                }
                WorkflowState::BeforeUploading { .. } | WorkflowState::AfterUploading { .. } => {
                    return Err(WorkflowError::Busy)
                }
                WorkflowState::Empty
                | WorkflowState::Draft { .. }
                | WorkflowState::Complete { .. } => return Err(WorkflowError::NothingToSubmit),
            };
            if viewer.is_none() && !self.config.allow_anonymous {
                return Err(WorkflowError::AuthRequired);
            }

            let submission = Submission {
                slot,
                photo,
                draft,
                owner: viewer.map(|user| user.id.clone()),
                generation: inner.generation,
            };
            let change = inner.transition(submission.uploading_state())?;
            (submission, change)
        };

        self.events.emit(WorkflowEvent::StateChanged(change));
        Ok(submission)
    }

    fn finish_submission(
        &self,
        submission: &Submission,
        record: Transformation,
    ) -> Result<Transformation> {
        let viewer = self.backend.auth.current_user().map(|user| user.id);
        let change = {
            let mut inner = self.inner.lock();
            if inner.generation == submission.generation {
                let next = match submission.slot {
                    PhotoSlot::Before => WorkflowState::Draft {
                        record: record.clone(),
                    },
                    PhotoSlot::After => WorkflowState::Complete {
                        record: record.clone(),
                    },
                };
                let change = inner.transition(next)?;
                match submission.slot {
                    PhotoSlot::Before => inner.drafts.insert(0, record.clone()),
                    PhotoSlot::After => inner.drafts.retain(|d| d.id != record.id),
                }
                Some(change)
            } else {
                // The row exists even though the active slot moved on
                match submission.slot {
                    PhotoSlot::Before if record.user_id == viewer => {
                        if !inner.drafts.iter().any(|d| d.id == record.id) {
                            inner.drafts.insert(0, record.clone());
                        }
                    }
                    PhotoSlot::Before => {}
                    PhotoSlot::After => inner.drafts.retain(|d| d.id != record.id),
                }
                None
            }
        };

        tracing::info!(id = %record.id, complete = record.is_complete(), "transformation saved");
        match change {
            Some(change) => {
                self.events.emit(WorkflowEvent::StateChanged(change));
                self.events.emit(WorkflowEvent::RecordSaved(record.clone()));
                Ok(record)
            }
            None => {
                self.events.emit(WorkflowEvent::RecordSaved(record.clone()));
                Err(WorkflowError::Superseded {
                    saved: Some(record.id),
                })
            }
        }
    }

    fn roll_back(&self, submission: &Submission) {
        let change = {
            let mut inner = self.inner.lock();
            if inner.generation != submission.generation {
                return;
            }
            inner.transition(submission.captured_state())
        };
        match change {
            Ok(change) => self.events.emit(WorkflowEvent::StateChanged(change)),
            Err(e) => tracing::error!(error = %e, "rollback rejected"),
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn idle_generation(&self) -> Result<u64> {
        let inner = self.inner.lock();
        if inner.state.is_uploading() {
            return Err(WorkflowError::Busy);
        }
        Ok(inner.generation)
    }

    fn load_draft(&self, record: Transformation, generation: u64) -> Result<()> {
        let change = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return Err(WorkflowError::Superseded { saved: None });
            }
            if inner.state.is_uploading() {
                return Err(WorkflowError::Busy);
            }
            inner.transition(WorkflowState::Draft { record })?
        };
        self.events.emit(WorkflowEvent::StateChanged(change));
        Ok(())
    }

    fn known_record(&self, id: &TransformationId) -> Result<Option<Transformation>> {
        let inner = self.inner.lock();
        if inner.state.is_uploading() && inner.state.record_id() == Some(id) {
            return Err(WorkflowError::Busy);
        }
        Ok(inner
            .state
            .record()
            .filter(|record| &record.id == id)
            .or_else(|| inner.drafts.iter().find(|d| &d.id == id))
            .cloned())
    }

    fn forget_record(&self, id: &TransformationId) -> Option<StateChangeEvent> {
        let mut inner = self.inner.lock();
        inner.drafts.retain(|d| &d.id != id);
        if inner.state.record_id() == Some(id) {
            inner.reset()
        } else {
            None
        }
    }

    fn store_drafts(&self, generation: u64, drafts: &[Transformation]) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.drafts = drafts.to_vec();
        true
    }

    fn record_orphan(&self, url: PhotoUrl, slot: PhotoSlot, reason: OrphanReason) {
        let orphan = OrphanedPhoto::new(url, slot, reason);
        self.orphans.record(orphan.clone());
        self.events.emit(WorkflowEvent::OrphanDetected(orphan));
    }
}

impl std::fmt::Debug for TransformationWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationWorkflow")
            .field("state", &self.state_kind())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_owner(record: &Transformation, viewer: Option<&AuthUser>) -> Result<()> {
    match &record.user_id {
        Some(owner) if viewer.map(|v| &v.id) != Some(owner) => {
            Err(WorkflowError::NotOwner(record.id.clone()))
        }
        _ => Ok(()),
    }
}

/// Remove a compressed copy once the upload no longer needs it
async fn remove_prepared(prepared: &LocalPhoto) {
    let path = prepared.path();
    match tokio::fs::remove_file(&path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "compressed copy removed"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove compressed copy"),
    }
}

fn check_capture(state: &WorkflowState, slot: PhotoSlot) -> Result<()> {
    use WorkflowState as S;
    match (slot, state) {
        (_, S::BeforeUploading { .. } | S::AfterUploading { .. }) => Err(WorkflowError::Busy),
        (PhotoSlot::Before, S::Empty | S::BeforeCaptured { .. } | S::Complete { .. })
        | (PhotoSlot::After, S::Draft { .. } | S::AfterCaptured { .. }) => Ok(()),
        (PhotoSlot::Before, S::Draft { record } | S::AfterCaptured { record, .. }) => {
            Err(WorkflowError::BeforeAlreadySaved(record.id.clone()))
        }
        (PhotoSlot::After, S::Complete { record }) => {
            Err(WorkflowError::AlreadyComplete(record.id.clone()))
        }
        (PhotoSlot::After, S::Empty | S::BeforeCaptured { .. }) => Err(WorkflowError::NoActiveDraft),
    }
}

/// Resets the active transformation when the signed-in identity changes
fn auth_listener(inner: Weak<Mutex<Inner>>, events: EventBus) -> AuthListener {
    Arc::new(move |event: &AuthEvent| {
        if !event.kind.changes_identity() {
            return;
        }
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let change = {
            let mut inner = inner.lock();
            inner.drafts.clear();
            inner.reset()
        };
        tracing::info!(kind = ?event.kind, "identity changed, active transformation reset");
        if let Some(change) = change {
            events.emit(WorkflowEvent::StateChanged(change));
        }
    })
}
