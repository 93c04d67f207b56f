//! Generation workflow state machine
//!
//! All stage changes go through `reduce()`, which returns the next state and
//! the effects to run. The reducer never performs I/O: sending the request,
//! cancelling its token and clearing the draft are effects.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::transport::{GenerationRequest, GenerationResponse, TransportError};

/// Stage exposed to the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowStage {
    Input,
    Processing,
    Result,
}

/// Authoritative workflow state.
#[derive(Debug, Clone, Default)]
pub enum State {
    #[default]
    Input,
    Processing {
        request_id: Uuid,
        cancel: CancellationToken,
    },
    Result {
        request_id: Uuid,
        document: GenerationResponse,
    },
}

impl State {
    pub fn stage(&self) -> WorkflowStage {
        match self {
            State::Input => WorkflowStage::Input,
            State::Processing { .. } => WorkflowStage::Processing,
            State::Result { .. } => WorkflowStage::Result,
        }
    }
}

/// User-facing condition raised by a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum Notice {
    /// Submit with neither topic nor files. No request was sent.
    SubmissionValidationFailure,
    /// Submit while a request is already in flight.
    Busy,
    TransportFailure(String),
    /// Not an error: the user abandoned the request.
    Cancelled,
    Capture(String),
}

#[derive(Debug, Clone)]
pub enum Event {
    Submit { request: GenerationRequest },
    Cancel,
    GenerateOk { id: Uuid, response: GenerationResponse },
    GenerateFail { id: Uuid, err: TransportError },
    Reset,
}

#[derive(Debug, Clone)]
pub enum Effect {
    SendRequest {
        id: Uuid,
        request: GenerationRequest,
        cancel: CancellationToken,
    },
    CancelRequest {
        id: Uuid,
        cancel: CancellationToken,
    },
    /// Empty the topic and artifact collection.
    ClearDraft,
    Notify(Notice),
    EmitUi,
}

/// Reducer function: (state, event) -> (next_state, effects)
///
/// Key rules:
/// - Completions for any request other than the in-flight one are ignored
/// - A completion whose token was cancelled is ignored
/// - Only `Reset` leaves the result stage
pub fn reduce(state: &State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;
    use State::*;

    match (state, event) {
        // -----------------
        // Input
        // -----------------
        (Input, Submit { request }) if request.is_empty() => (
            Input,
            vec![Notify(Notice::SubmissionValidationFailure), EmitUi],
        ),
        (Input, Submit { request }) => {
            let id = Uuid::new_v4();
            let cancel = CancellationToken::new();
            (
                Processing {
                    request_id: id,
                    cancel: cancel.clone(),
                },
                vec![
                    SendRequest {
                        id,
                        request,
                        cancel,
                    },
                    EmitUi,
                ],
            )
        }
        (Input, Cancel) => (Input, vec![]),
        (Input, Reset) => (Input, vec![ClearDraft, EmitUi]),

        // -----------------
        // Processing
        // -----------------
        (Processing { .. }, Submit { .. }) => (state.clone(), vec![Notify(Notice::Busy), EmitUi]),
        (Processing { request_id, cancel }, Cancel) => (
            Input,
            vec![
                CancelRequest {
                    id: *request_id,
                    cancel: cancel.clone(),
                },
                Notify(Notice::Cancelled),
                EmitUi,
            ],
        ),
        (Processing { request_id, cancel }, GenerateOk { id, response })
            if *request_id == id && !cancel.is_cancelled() =>
        {
            (
                Result {
                    request_id: id,
                    document: response,
                },
                vec![EmitUi],
            )
        }
        (Processing { request_id, cancel }, GenerateFail { id, err })
            if *request_id == id && !cancel.is_cancelled() =>
        {
            let notice = match err {
                TransportError::Cancelled => Notice::Cancelled,
                other => Notice::TransportFailure(other.to_string()),
            };
            (Input, vec![Notify(notice), EmitUi])
        }

        // -----------------
        // Result
        // -----------------
        (Result { .. }, Reset) => (Input, vec![ClearDraft, EmitUi]),

        // -----------------
        // Late completions (drop silently)
        // -----------------
        (_, GenerateOk { id, .. }) | (_, GenerateFail { id, .. }) => {
            log::debug!("Ignoring stale completion for request {}", id);
            (state.clone(), vec![])
        }

        // -----------------
        // Unhandled: no transition
        // -----------------
        _ => (state.clone(), vec![]),
    }
}
