use crate::error::WorkflowError;
use crate::state::StateKind;

/// Validates a state transition.
///
/// Every change of the active state goes through this table. Resetting to
/// `Empty` is legal from every non-empty state (discard, auth change,
/// deleting the active draft).
pub fn validate_transition(from: StateKind, to: StateKind) -> Result<(), WorkflowError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: StateKind) -> Vec<StateKind> {
    use StateKind::*;
    match from {
        Empty => vec![BeforeCaptured, Draft],
        BeforeCaptured => vec![BeforeCaptured, BeforeUploading, Draft, Empty],
        BeforeUploading => vec![BeforeCaptured, Draft, Empty],
        Draft => vec![AfterCaptured, Draft, Empty],
        AfterCaptured => vec![AfterCaptured, AfterUploading, Draft, Empty],
        AfterUploading => vec![AfterCaptured, Complete, Empty],
        Complete => vec![Empty, Draft],
    }
}

fn allowed(from: StateKind, to: StateKind) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
