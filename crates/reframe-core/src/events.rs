//! Workflow notifications for presentation consumers

use crate::orphans::OrphanedPhoto;
use crate::state::StateKind;
use reframe_model::{Transformation, TransformationId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Emitted on every change of the active state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChangeEvent {
    /// Record backing the new state, if any
    pub id: Option<TransformationId>,
    pub previous: StateKind,
    pub new_state: StateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StateChanged(StateChangeEvent),
    /// A record was created or completed
    RecordSaved(Transformation),
    DraftDeleted(TransformationId),
    /// Fresh draft listing from the store
    DraftsRefreshed(Vec<Transformation>),
    OrphanDetected(OrphanedPhoto),
}

/// Broadcast fan-out; sending never blocks and never fails the caller
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: WorkflowEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub(crate) fn emit_all(&self, events: impl IntoIterator<Item = WorkflowEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}
