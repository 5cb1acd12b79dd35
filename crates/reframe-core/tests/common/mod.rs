//! Shared harness for workflow integration tests

#![allow(dead_code)]

use reframe_core::{StateKind, TransformationWorkflow, WorkflowConfig, WorkflowEvent};
use reframe_model::{PhotoSlot, Transformation};
use reframe_test_utils::{before_photo, TestBackend};
use tokio::sync::broadcast;

pub struct Harness {
    pub fakes: TestBackend,
    pub workflow: TransformationWorkflow,
    pub events: broadcast::Receiver<WorkflowEvent>,
}

pub fn harness() -> Harness {
    harness_with(TestBackend::signed_in(), WorkflowConfig::new())
}

pub fn harness_with(fakes: TestBackend, config: WorkflowConfig) -> Harness {
    let workflow = TransformationWorkflow::new(fakes.backend(), config.with_event_capacity(1024));
    let events = workflow.subscribe();
    Harness {
        fakes,
        workflow,
        events,
    }
}

impl Harness {
    /// Capture and submit a before photo, returning the new draft
    pub async fn saved_draft(&mut self) -> Transformation {
        self.workflow
            .accept_photo(PhotoSlot::Before, before_photo())
            .unwrap();
        self.workflow.submit_captured_photo().await.unwrap()
    }

    pub fn drain(&mut self) -> Vec<WorkflowEvent> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }

    /// `(previous, new_state)` of every state change since the last drain
    pub fn transitions(&mut self) -> Vec<(StateKind, StateKind)> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                WorkflowEvent::StateChanged(change) => Some((change.previous, change.new_state)),
                _ => None,
            })
            .collect()
    }
}
