//! Capture state machine
//!
//! The active capture is a single enum that owns its device session, so two
//! capture modes can never be live at once. Every exit from a non-idle state
//! moves the session out of `self.active` and releases it exactly once.

use std::fmt;

use chrono::Local;
use serde::Serialize;

use super::device::{
    DeviceCaptureService, DeviceRequest, MediaStream, RasterSurface, RecordingSink, VideoFrame,
};
use super::naming::artifact_name;
use super::raster::JpegSurface;
use super::session::DeviceSession;
use super::CaptureError;
use crate::artifact::{ArtifactCollection, ArtifactId, CapturedArtifact, SourceKind};

/// The current exclusive capture activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    #[default]
    Idle,
    RecordingAudio,
    RecordingVideo,
    CameraPreview,
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaptureMode::Idle => "idle",
            CaptureMode::RecordingAudio => "recording audio",
            CaptureMode::RecordingVideo => "recording video",
            CaptureMode::CameraPreview => "previewing camera",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordingKind {
    Audio,
    Video,
}

impl RecordingKind {
    fn request(self) -> DeviceRequest {
        match self {
            RecordingKind::Audio => DeviceRequest::Audio,
            RecordingKind::Video => DeviceRequest::VideoWithAudio,
        }
    }

    fn mode(self) -> CaptureMode {
        match self {
            RecordingKind::Audio => CaptureMode::RecordingAudio,
            RecordingKind::Video => CaptureMode::RecordingVideo,
        }
    }

    fn source_kind(self) -> SourceKind {
        match self {
            RecordingKind::Audio => SourceKind::RecordedAudio,
            RecordingKind::Video => SourceKind::RecordedVideo,
        }
    }
}

enum Active<D: DeviceCaptureService> {
    Idle,
    Recording {
        kind: RecordingKind,
        session: DeviceSession<D::Stream>,
        sink: D::Sink,
    },
    Preview {
        session: DeviceSession<D::Stream>,
    },
}

impl<D: DeviceCaptureService> Active<D> {
    fn mode(&self) -> CaptureMode {
        match self {
            Active::Idle => CaptureMode::Idle,
            Active::Recording { kind, .. } => kind.mode(),
            Active::Preview { .. } => CaptureMode::CameraPreview,
        }
    }
}

/// Arbitrates exclusive access to the camera and microphone.
pub struct CaptureController<D: DeviceCaptureService, R: RasterSurface = JpegSurface> {
    devices: D,
    raster: R,
    active: Active<D>,
}

impl<D: DeviceCaptureService, R: RasterSurface> CaptureController<D, R> {
    pub fn new(devices: D, raster: R) -> Self {
        Self {
            devices,
            raster,
            active: Active::Idle,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.active.mode()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.active, Active::Idle)
    }

    /// Whether a preview surface is currently bound to a live stream.
    pub fn preview_bound(&self) -> bool {
        match &self.active {
            Active::Idle => false,
            Active::Recording { session, .. } | Active::Preview { session } => {
                session.preview_bound()
            }
        }
    }

    /// Latest camera frame while a preview is bound.
    pub fn preview_frame(&self) -> Option<VideoFrame> {
        match &self.active {
            Active::Recording { session, .. } | Active::Preview { session }
                if session.preview_bound() =>
            {
                session.stream().and_then(|s| s.preview_frame())
            }
            _ => None,
        }
    }

    pub async fn start_audio_recording(&mut self) -> Result<(), CaptureError> {
        self.start_recording(RecordingKind::Audio).await
    }

    pub async fn start_video_recording(&mut self) -> Result<(), CaptureError> {
        self.start_recording(RecordingKind::Video).await
    }

    /// Open the camera for a still photo. No recording sink is attached.
    pub async fn open_camera(&mut self) -> Result<(), CaptureError> {
        self.ensure_idle()?;

        let stream = self.request_access(DeviceRequest::VideoOnly).await?;
        self.active = Active::Preview {
            session: DeviceSession::acquire(stream, DeviceRequest::VideoOnly),
        };
        self.log_transition(CaptureMode::Idle);
        Ok(())
    }

    /// Stop the active recording and append it to `artifacts`.
    ///
    /// The device session is released whether or not finalization succeeds.
    pub async fn stop_recording(
        &mut self,
        artifacts: &mut ArtifactCollection,
    ) -> Result<ArtifactId, CaptureError> {
        let (kind, mut session, sink) = match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Recording {
                kind,
                session,
                sink,
            } => (kind, session, sink),
            other => return Err(self.reject(other, "stop recording")),
        };
        self.log_transition(kind.mode());

        let mime_type = sink.mime_type().to_string();
        let blob = match sink.finalize().await {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Recording finalization failed ({:?}): {}", kind, e);
                session.release();
                return Err(match e {
                    CaptureError::RecordingFinalizationFailure(_) => e,
                    other => CaptureError::RecordingFinalizationFailure(other.to_string()),
                });
            }
        };

        let name = artifact_name(kind.source_kind(), &mime_type, Local::now().naive_local());
        let id = artifacts.push(CapturedArtifact::new(
            name,
            mime_type,
            kind.source_kind(),
            blob,
        ));
        session.release();
        Ok(id)
    }

    /// Grab the current preview frame as a photo and append it to `artifacts`.
    ///
    /// The camera is released on success and on failure.
    pub fn capture_photo(
        &mut self,
        artifacts: &mut ArtifactCollection,
    ) -> Result<ArtifactId, CaptureError> {
        let mut session = match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Preview { session } => session,
            other => return Err(self.reject(other, "capture a photo")),
        };
        self.log_transition(CaptureMode::CameraPreview);

        let encoded = session
            .stream()
            .and_then(|s| s.preview_frame())
            .ok_or_else(|| {
                CaptureError::RecordingFinalizationFailure(
                    "no preview frame available".to_string(),
                )
            })
            .and_then(|frame| {
                if frame.is_well_formed() {
                    self.raster.encode(&frame)
                } else {
                    Err(CaptureError::RecordingFinalizationFailure(format!(
                        "malformed {}x{} frame ({} bytes)",
                        frame.width,
                        frame.height,
                        frame.rgba.len()
                    )))
                }
            });

        let result = match encoded {
            Ok(image) => {
                let name =
                    artifact_name(SourceKind::Photo, image.mime_type, Local::now().naive_local());
                Ok(artifacts.push(CapturedArtifact::new(
                    name,
                    image.mime_type,
                    SourceKind::Photo,
                    image.bytes,
                )))
            }
            Err(e) => {
                log::error!("Photo capture failed: {}", e);
                Err(e)
            }
        };
        session.release();
        result
    }

    /// Close the camera preview without taking a photo.
    pub fn cancel_camera(&mut self) -> Result<(), CaptureError> {
        let mut session = match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Preview { session } => session,
            other => return Err(self.reject(other, "cancel the camera")),
        };
        self.log_transition(CaptureMode::CameraPreview);
        session.release();
        Ok(())
    }

    /// Forced release of whatever is active. Never produces an artifact.
    pub fn teardown(&mut self) {
        let previous = self.active.mode();
        match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Idle => {}
            Active::Recording { mut session, .. } | Active::Preview { mut session } => {
                log::warn!("Capture torn down while {}", previous);
                session.release();
                self.log_transition(previous);
            }
        }
    }

    async fn start_recording(&mut self, kind: RecordingKind) -> Result<(), CaptureError> {
        self.ensure_idle()?;

        let request = kind.request();
        let stream = self.request_access(request).await?;
        // Acquire first so a failing sink still releases the stream.
        let mut session = DeviceSession::acquire(stream, request);
        let sink = match session.stream_mut() {
            Some(stream) => self.devices.open_sink(stream, request),
            None => Err(CaptureError::DeviceAccessDenied(
                "stream released before recording started".to_string(),
            )),
        };
        let sink = match sink {
            Ok(sink) => sink,
            Err(e) => {
                log::warn!("Could not open recording sink for {:?}: {}", kind, e);
                session.release();
                return Err(e);
            }
        };

        self.active = Active::Recording {
            kind,
            session,
            sink,
        };
        self.log_transition(CaptureMode::Idle);
        Ok(())
    }

    async fn request_access(&self, request: DeviceRequest) -> Result<D::Stream, CaptureError> {
        self.devices.request(request).await.map_err(|e| {
            log::warn!("Device request {:?} refused: {}", request, e);
            match e {
                CaptureError::DeviceAccessDenied(_) => e,
                other => CaptureError::DeviceAccessDenied(other.to_string()),
            }
        })
    }

    fn ensure_idle(&self) -> Result<(), CaptureError> {
        match self.active.mode() {
            CaptureMode::Idle => Ok(()),
            active => {
                log::warn!("Rejected capture start: already {}", active);
                Err(CaptureError::CaptureBusy { active })
            }
        }
    }

    /// Put back an active state taken for an operation it does not support.
    fn reject(&mut self, previous: Active<D>, operation: &'static str) -> CaptureError {
        let mode = previous.mode();
        self.active = previous;
        log::warn!("Rejected '{}' while {}", operation, mode);
        CaptureError::InvalidTransition { mode, operation }
    }

    fn log_transition(&self, from: CaptureMode) {
        log::info!("Capture transition: {:?} -> {:?}", from, self.active.mode());
    }
}

impl<D: DeviceCaptureService, R: RasterSurface> Drop for CaptureController<D, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::EncodedImage;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        stops: Cell<usize>,
        granted: Cell<usize>,
    }

    struct FakeStream {
        log: Rc<Log>,
        frame: Option<VideoFrame>,
    }

    impl MediaStream for FakeStream {
        fn stop_tracks(&mut self) {
            self.log.stops.set(self.log.stops.get() + 1);
        }

        fn preview_frame(&self) -> Option<VideoFrame> {
            self.frame.clone()
        }
    }

    struct FakeSink {
        result: Result<Vec<u8>, CaptureError>,
    }

    impl RecordingSink for FakeSink {
        fn mime_type(&self) -> &str {
            "audio/webm"
        }

        async fn finalize(self) -> Result<Vec<u8>, CaptureError> {
            self.result
        }
    }

    struct FakeDevices {
        log: Rc<Log>,
        deny: bool,
        sink_fails: bool,
        finalize: RefCell<Result<Vec<u8>, CaptureError>>,
        camera_frame: Option<VideoFrame>,
    }

    impl FakeDevices {
        fn new(log: Rc<Log>) -> Self {
            Self {
                log,
                deny: false,
                sink_fails: false,
                finalize: RefCell::new(Ok(vec![1, 2, 3])),
                camera_frame: Some(VideoFrame {
                    width: 2,
                    height: 2,
                    rgba: vec![200; 16],
                }),
            }
        }
    }

    impl DeviceCaptureService for FakeDevices {
        type Stream = FakeStream;
        type Sink = FakeSink;

        async fn request(&self, request: DeviceRequest) -> Result<FakeStream, CaptureError> {
            if self.deny {
                return Err(CaptureError::DeviceAccessDenied("permission denied".into()));
            }
            self.log.granted.set(self.log.granted.get() + 1);
            let frame = if request.wants_camera() {
                self.camera_frame.clone()
            } else {
                None
            };
            Ok(FakeStream {
                log: self.log.clone(),
                frame,
            })
        }

        fn open_sink(
            &self,
            _stream: &mut FakeStream,
            _request: DeviceRequest,
        ) -> Result<FakeSink, CaptureError> {
            if self.sink_fails {
                return Err(CaptureError::DeviceAccessDenied("no encoder".into()));
            }
            Ok(FakeSink {
                result: self.finalize.borrow().clone(),
            })
        }
    }

    struct FakeRaster;

    impl RasterSurface for FakeRaster {
        fn encode(&self, frame: &VideoFrame) -> Result<EncodedImage, CaptureError> {
            Ok(EncodedImage {
                bytes: vec![0; (frame.width * frame.height) as usize],
                mime_type: "image/jpeg",
            })
        }
    }

    fn controller(devices: FakeDevices) -> CaptureController<FakeDevices, FakeRaster> {
        CaptureController::new(devices, FakeRaster)
    }

    /// Open the camera with `frame` as the preview and take a photo.
    /// Returns the result, the final mode, release count and artifact count.
    async fn photo_with_frame(
        frame: Option<VideoFrame>,
    ) -> (Result<ArtifactId, CaptureError>, CaptureMode, usize, usize) {
        let log = Rc::new(Log::default());
        let mut devices = FakeDevices::new(log.clone());
        devices.camera_frame = frame;
        let mut c = controller(devices);
        let mut artifacts = ArtifactCollection::new();

        c.open_camera().await.unwrap();
        let result = c.capture_photo(&mut artifacts);
        (result, c.mode(), log.stops.get(), artifacts.len())
    }

    #[tokio::test]
    async fn photo_without_frame_fails_and_releases_camera() {
        let (result, mode, stops, artifacts) = photo_with_frame(None).await;

        assert!(matches!(
            result,
            Err(CaptureError::RecordingFinalizationFailure(_))
        ));
        assert_eq!(mode, CaptureMode::Idle);
        assert_eq!(stops, 1);
        assert_eq!(artifacts, 0);
    }

    #[tokio::test]
    async fn photo_from_malformed_frame_fails_and_releases_camera() {
        // 2x2 RGBA needs 16 bytes.
        let frame = VideoFrame {
            width: 2,
            height: 2,
            rgba: vec![0; 7],
        };
        let (result, mode, stops, artifacts) = photo_with_frame(Some(frame)).await;

        assert!(matches!(
            result,
            Err(CaptureError::RecordingFinalizationFailure(m)) if m.contains("malformed")
        ));
        assert_eq!(mode, CaptureMode::Idle);
        assert_eq!(stops, 1);
        assert_eq!(artifacts, 0);
    }

    #[tokio::test]
    async fn audio_recording_produces_artifact_and_releases_once() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));
        let mut artifacts = ArtifactCollection::new();

        c.start_audio_recording().await.unwrap();
        assert_eq!(c.mode(), CaptureMode::RecordingAudio);
        assert!(!c.preview_bound());

        let id = c.stop_recording(&mut artifacts).await.unwrap();
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.stops.get(), 1);

        let artifact = artifacts.get(id).unwrap();
        assert_eq!(artifact.source_kind(), SourceKind::RecordedAudio);
        assert_eq!(artifact.mime_type(), "audio/webm");
        assert_eq!(artifact.size_bytes(), 3);
        assert!(artifact.display_name().starts_with("recording-audio-"));
        assert!(artifact.display_name().ends_with(".webm"));
    }

    #[tokio::test]
    async fn video_recording_binds_preview() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));
        let mut artifacts = ArtifactCollection::new();

        c.start_video_recording().await.unwrap();
        assert_eq!(c.mode(), CaptureMode::RecordingVideo);
        assert!(c.preview_bound());
        assert!(c.preview_frame().is_some());

        c.stop_recording(&mut artifacts).await.unwrap();
        assert!(!c.preview_bound());
        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts.iter().next().unwrap().source_kind(),
            SourceKind::RecordedVideo
        );
        assert_eq!(log.stops.get(), 1);
    }

    #[tokio::test]
    async fn second_start_is_rejected_and_active_capture_kept() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));

        c.start_audio_recording().await.unwrap();
        let err = c.open_camera().await.unwrap_err();
        assert_eq!(
            err,
            CaptureError::CaptureBusy {
                active: CaptureMode::RecordingAudio
            }
        );
        let err = c.start_video_recording().await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureBusy { .. }));

        assert_eq!(c.mode(), CaptureMode::RecordingAudio);
        assert_eq!(log.granted.get(), 1);
        assert_eq!(log.stops.get(), 0);
    }

    #[tokio::test]
    async fn denied_access_stays_idle() {
        let log = Rc::new(Log::default());
        let mut devices = FakeDevices::new(log.clone());
        devices.deny = true;
        let mut c = controller(devices);

        let err = c.start_audio_recording().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceAccessDenied(_)));
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.stops.get(), 0);
    }

    #[tokio::test]
    async fn sink_failure_releases_granted_stream() {
        let log = Rc::new(Log::default());
        let mut devices = FakeDevices::new(log.clone());
        devices.sink_fails = true;
        let mut c = controller(devices);

        assert!(c.start_audio_recording().await.is_err());
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.granted.get(), 1);
        assert_eq!(log.stops.get(), 1);
    }

    #[tokio::test]
    async fn finalization_failure_returns_idle_without_artifact() {
        let log = Rc::new(Log::default());
        let devices = FakeDevices::new(log.clone());
        *devices.finalize.borrow_mut() =
            Err(CaptureError::RecordingFinalizationFailure("encoder crashed".into()));
        let mut c = controller(devices);
        let mut artifacts = ArtifactCollection::new();

        c.start_audio_recording().await.unwrap();
        let err = c.stop_recording(&mut artifacts).await.unwrap_err();
        assert!(matches!(err, CaptureError::RecordingFinalizationFailure(_)));
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert!(artifacts.is_empty());
        assert_eq!(log.stops.get(), 1);
    }

    #[tokio::test]
    async fn photo_capture_appends_photo_and_releases() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));
        let mut artifacts = ArtifactCollection::new();

        c.open_camera().await.unwrap();
        assert_eq!(c.mode(), CaptureMode::CameraPreview);
        assert!(c.preview_bound());

        let id = c.capture_photo(&mut artifacts).unwrap();
        let photo = artifacts.get(id).unwrap();
        assert_eq!(photo.source_kind(), SourceKind::Photo);
        assert_eq!(photo.mime_type(), "image/jpeg");
        assert_eq!(photo.size_bytes(), 4);
        assert!(photo.display_name().starts_with("photo-"));
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.stops.get(), 1);
    }

    #[tokio::test]
    async fn camera_cancel_releases_without_artifact() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));

        c.open_camera().await.unwrap();
        c.cancel_camera().unwrap();
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.stops.get(), 1);

        // Nothing left to release.
        c.teardown();
        assert_eq!(log.stops.get(), 1);
    }

    #[tokio::test]
    async fn wrong_mode_operations_are_rejected_without_change() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));
        let mut artifacts = ArtifactCollection::new();

        assert!(matches!(
            c.stop_recording(&mut artifacts).await,
            Err(CaptureError::InvalidTransition {
                mode: CaptureMode::Idle,
                ..
            })
        ));

        c.open_camera().await.unwrap();
        assert!(matches!(
            c.stop_recording(&mut artifacts).await,
            Err(CaptureError::InvalidTransition {
                mode: CaptureMode::CameraPreview,
                ..
            })
        ));
        assert_eq!(c.mode(), CaptureMode::CameraPreview);
        assert_eq!(log.stops.get(), 0);

        c.cancel_camera().unwrap();
        c.start_audio_recording().await.unwrap();
        assert!(c.capture_photo(&mut artifacts).is_err());
        assert!(c.cancel_camera().is_err());
        assert_eq!(c.mode(), CaptureMode::RecordingAudio);
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn teardown_and_drop_release_exactly_once() {
        let log = Rc::new(Log::default());
        let mut c = controller(FakeDevices::new(log.clone()));
        c.start_video_recording().await.unwrap();
        c.teardown();
        c.teardown();
        assert_eq!(c.mode(), CaptureMode::Idle);
        assert_eq!(log.stops.get(), 1);

        c.open_camera().await.unwrap();
        drop(c);
        assert_eq!(log.stops.get(), 2);
    }
}
