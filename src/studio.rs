//! Single-writer event loop
//!
//! The studio owns the capture controller, the draft and the workflow state.
//! UI commands arrive on one channel; transport completions come back on
//! another. Device operations are awaited inline so artifact mutations and
//! submissions are naturally serialized. Network requests are spawned and
//! report back as workflow events.
//!
//! Device streams are not `Send`, so [`Studio::run`] must be driven on a
//! current-thread runtime (or a `LocalSet`).

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::artifact::{ArtifactId, CapturedArtifact};
use crate::capture::{
    CaptureController, CaptureError, DeviceCaptureService, JpegSurface, MicrophoneService,
    RasterSurface,
};
use crate::settings::AppSettings;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::workflow::{reduce, Draft, Effect, Event, Notice, State};
use crate::{state_to_ui, UiState};

const COMMAND_QUEUE: usize = 32;
const EVENT_QUEUE: usize = 8;

/// Commands sent from the UI layer.
#[derive(Debug, Clone)]
pub enum Command {
    SetTopic(String),
    AttachUpload {
        name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
    RemoveArtifact(ArtifactId),
    SetGenerateImages(bool),
    StartAudio,
    StartVideo,
    OpenCamera,
    StopRecording,
    CapturePhoto,
    CancelCamera,
    Submit,
    Cancel,
    Reset,
    /// Tear everything down and end the loop.
    Exit,
}

/// Sender half given to the UI.
#[derive(Clone)]
pub struct StudioHandle {
    tx: mpsc::Sender<Command>,
}

impl StudioHandle {
    pub fn channel() -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        (Self { tx }, rx)
    }

    pub async fn send(&self, command: Command) -> Result<(), mpsc::error::SendError<Command>> {
        self.tx.send(command).await
    }
}

pub struct Studio<D, T, R>
where
    D: DeviceCaptureService,
    T: Transport,
    R: RasterSurface,
{
    capture: CaptureController<D, R>,
    transport: Arc<T>,
    draft: Draft,
    workflow: State,
    notice: Option<Notice>,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    ui: watch::Sender<UiState>,
}

impl<D, T, R> Studio<D, T, R>
where
    D: DeviceCaptureService,
    T: Transport,
    R: RasterSurface,
{
    pub fn new(capture: CaptureController<D, R>, transport: Arc<T>, settings: &AppSettings) -> Self {
        let draft = Draft::new(settings.generate_images);
        let workflow = State::default();
        let initial = state_to_ui(&workflow, &draft, &capture, None);
        let (ui, _) = watch::channel(initial);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

        Self {
            capture,
            transport,
            draft,
            workflow,
            notice: None,
            events_tx,
            events_rx,
            ui,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.ui.subscribe()
    }

    pub fn ui_state(&self) -> UiState {
        state_to_ui(&self.workflow, &self.draft, &self.capture, self.notice.as_ref())
    }

    pub fn workflow(&self) -> &State {
        &self.workflow
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn capture(&self) -> &CaptureController<D, R> {
        &self.capture
    }

    /// Run until `Exit` or until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.emit_ui();
        log::info!("Studio loop started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command).await {
                                break;
                            }
                        }
                        None => {
                            self.shutdown();
                            break;
                        }
                    }
                }
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        log::info!("Studio loop ended");
    }

    /// Handle one UI command. Returns false once the studio has shut down.
    pub async fn handle_command(&mut self, command: Command) -> bool {
        log::debug!("Received command: {:?}", CommandName(&command));
        self.notice = None;

        match command {
            Command::SetTopic(topic) => self.draft.topic = topic,
            Command::AttachUpload {
                name,
                mime_type,
                bytes,
            } => {
                self.draft
                    .artifacts
                    .push(CapturedArtifact::upload(name, mime_type, bytes));
            }
            Command::RemoveArtifact(id) => {
                if self.draft.artifacts.remove(id).is_none() {
                    log::warn!("RemoveArtifact: no artifact with id={}", id);
                }
            }
            Command::SetGenerateImages(enabled) => self.draft.generate_images = enabled,
            Command::StartAudio => {
                let result = self.capture.start_audio_recording().await;
                self.report_capture(result);
            }
            Command::StartVideo => {
                let result = self.capture.start_video_recording().await;
                self.report_capture(result);
            }
            Command::OpenCamera => {
                let result = self.capture.open_camera().await;
                self.report_capture(result);
            }
            Command::StopRecording => {
                let result = self.capture.stop_recording(&mut self.draft.artifacts).await;
                self.report_capture(result.map(|_| ()));
            }
            Command::CapturePhoto => {
                let result = self.capture.capture_photo(&mut self.draft.artifacts);
                self.report_capture(result.map(|_| ()));
            }
            Command::CancelCamera => {
                let result = self.capture.cancel_camera();
                self.report_capture(result);
            }
            Command::Submit => {
                let request = self.draft.snapshot();
                self.handle_event(Event::Submit { request });
            }
            Command::Cancel => {
                self.handle_event(Event::Cancel);
            }
            Command::Reset => {
                self.handle_event(Event::Reset);
            }
            Command::Exit => {
                log::info!("Exit requested, shutting down studio");
                self.shutdown();
                return false;
            }
        }

        self.emit_ui();
        true
    }

    /// Feed one workflow event through the reducer and run its effects.
    pub fn handle_event(&mut self, event: Event) {
        let old_stage = self.workflow.stage();
        let (next, effects) = reduce(&self.workflow, event);
        let new_stage = next.stage();

        if old_stage != new_stage {
            log::info!("Workflow transition: {:?} -> {:?}", old_stage, new_stage);
        }

        self.workflow = next;

        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Wait for the next transport completion and apply it.
    pub async fn process_next_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::SendRequest {
                id,
                request,
                cancel,
            } => {
                let transport = self.transport.clone();
                let tx = self.events_tx.clone();
                log::info!(
                    "Starting request {} ({} files)",
                    id,
                    request.files.len()
                );

                tokio::spawn(async move {
                    let event = match transport.generate(request, cancel).await {
                        Ok(response) => Event::GenerateOk { id, response },
                        Err(err) => {
                            log::warn!("Request {} failed: {}", id, err);
                            Event::GenerateFail { id, err }
                        }
                    };
                    if tx.send(event).await.is_err() {
                        log::debug!("Studio gone before request {} completed", id);
                    }
                });
            }
            Effect::CancelRequest { id, cancel } => {
                log::info!("Cancelling request {}", id);
                cancel.cancel();
            }
            Effect::ClearDraft => self.draft.clear(),
            Effect::Notify(notice) => {
                log::info!("Notice: {:?}", notice);
                self.notice = Some(notice);
            }
            Effect::EmitUi => self.emit_ui(),
        }
    }

    fn report_capture(&mut self, result: Result<(), CaptureError>) {
        if let Err(e) = result {
            self.notice = Some(Notice::Capture(e.to_string()));
        }
    }

    fn shutdown(&mut self) {
        self.capture.teardown();
        if let State::Processing { request_id, cancel } = &self.workflow {
            log::info!("Abandoning request {} on shutdown", request_id);
            cancel.cancel();
        }
    }

    fn emit_ui(&self) {
        let state = self.ui_state();
        log::debug!("Emitting UI state: {:?}", serde_json::to_string(&state));
        self.ui.send_replace(state);
    }
}

impl Studio<MicrophoneService, HttpTransport, JpegSurface> {
    /// Host microphone, JPEG photos and the HTTP backend from settings.
    pub fn with_defaults(settings: &AppSettings) -> Result<Self, TransportError> {
        let capture =
            CaptureController::new(MicrophoneService::new(), JpegSurface::new(settings.photo_quality));
        let transport = Arc::new(HttpTransport::from_settings(settings)?);
        log::info!("Studio configured for {}", transport.endpoint());
        Ok(Self::new(capture, transport, settings))
    }
}

/// Debug view of a command that leaves out upload payloads.
struct CommandName<'a>(&'a Command);

impl std::fmt::Debug for CommandName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Command::AttachUpload {
                name,
                mime_type,
                bytes,
            } => write!(f, "AttachUpload({}, {}, {} bytes)", name, mime_type, bytes.len()),
            other => write!(f, "{:?}", other),
        }
    }
}
