pub mod artifact;
pub mod capture;
pub mod manual;
pub mod settings;
pub mod studio;
pub mod transport;
pub mod workflow;

use serde::Serialize;

use artifact::ArtifactSummary;
use capture::{CaptureController, CaptureMode, DeviceCaptureService, RasterSurface};
use manual::{layout, parse, SectionRow};
use workflow::{Draft, Notice, State};

pub use artifact::{ArtifactCollection, CapturedArtifact, SourceKind};
pub use studio::{Command, Studio, StudioHandle};

/// Workflow part of the UI state.
/// Uses tagged union format: { "status": "input" } or { "status": "result", "sections": [...] }
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StageView {
    Input,
    Processing,
    Result {
        sections: Vec<SectionRow>,
        images: Vec<String>,
    },
}

/// Snapshot published to the view layer after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    pub capture_mode: CaptureMode,
    pub preview_bound: bool,
    pub stage: StageView,
    pub topic: String,
    pub generate_images: bool,
    pub artifacts: Vec<ArtifactSummary>,
    pub notice: Option<Notice>,
}

/// Convert internal state to the UI snapshot.
pub fn state_to_ui<D, R>(
    workflow: &State,
    draft: &Draft,
    capture: &CaptureController<D, R>,
    notice: Option<&Notice>,
) -> UiState
where
    D: DeviceCaptureService,
    R: RasterSurface,
{
    let stage = match workflow {
        State::Input => StageView::Input,
        State::Processing { .. } => StageView::Processing,
        State::Result { document, .. } => StageView::Result {
            sections: layout(&parse(&document.manual)),
            images: document.images.clone(),
        },
    };

    UiState {
        capture_mode: capture.mode(),
        preview_bound: capture.preview_bound(),
        stage,
        topic: draft.topic.clone(),
        generate_images: draft.generate_images,
        artifacts: draft.artifacts.summaries(),
        notice: notice.cloned(),
    }
}
