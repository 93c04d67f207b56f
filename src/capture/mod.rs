//! Camera and microphone capture
//!
//! The [`CaptureController`] owns the only live device session and enforces
//! that at most one capture (audio recording, video recording or camera
//! preview) is active at a time. Device access, recording sinks and photo
//! encoding are collaborators behind the traits in [`device`]; the default
//! implementations use CPAL + hound for the microphone and the `image` crate
//! for still photos.

pub mod controller;
pub mod device;
pub mod microphone;
mod naming;
pub mod raster;
mod session;

pub use controller::{CaptureController, CaptureMode};
pub use device::{
    DeviceCaptureService, DeviceRequest, EncodedImage, MediaStream, RasterSurface, RecordingSink,
    VideoFrame,
};
pub use microphone::{MicrophoneService, MicrophoneStream, WavSink};
pub use naming::{artifact_name, extension_for_mime};
pub use raster::{JpegSurface, PngSurface};
pub use session::DeviceSession;

/// Errors surfaced by capture operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// Permission refusal or missing hardware. The controller stays idle.
    #[error("Device access denied: {0}")]
    DeviceAccessDenied(String),
    /// The recording or photo could not be turned into an artifact.
    #[error("Failed to finalize capture: {0}")]
    RecordingFinalizationFailure(String),
    /// Another capture is already running; stop or cancel it first.
    #[error("Capture already active ({active})")]
    CaptureBusy { active: CaptureMode },
    #[error("Cannot {operation} while {mode}")]
    InvalidTransition {
        mode: CaptureMode,
        operation: &'static str,
    },
}
