//! Collaborator traits for device access, recording and photo encoding.

use std::future::Future;

use super::CaptureError;

/// What kind of device access a capture mode needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Microphone only.
    Audio,
    /// Camera and microphone.
    VideoWithAudio,
    /// Camera only.
    VideoOnly,
}

impl DeviceRequest {
    pub fn wants_camera(&self) -> bool {
        matches!(self, DeviceRequest::VideoWithAudio | DeviceRequest::VideoOnly)
    }

    pub fn wants_microphone(&self) -> bool {
        matches!(self, DeviceRequest::Audio | DeviceRequest::VideoWithAudio)
    }
}

/// One decoded video frame, tightly packed RGBA8 at the camera's native size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl VideoFrame {
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.rgba.len() as u64 == u64::from(self.width) * u64::from(self.height) * 4
    }
}

/// A live capture stream. Dropping a stream without calling
/// [`MediaStream::stop_tracks`] is allowed but the session never does it.
pub trait MediaStream {
    /// Stop every track of the stream. Only called once per stream.
    fn stop_tracks(&mut self);

    /// Latest frame from the camera, if this stream has video.
    fn preview_frame(&self) -> Option<VideoFrame> {
        None
    }
}

/// Accumulates encoded chunks from a stream and finalizes them into one blob.
pub trait RecordingSink {
    fn mime_type(&self) -> &str;

    fn finalize(self) -> impl Future<Output = Result<Vec<u8>, CaptureError>>;
}

/// Grants access to capture hardware.
pub trait DeviceCaptureService {
    type Stream: MediaStream;
    type Sink: RecordingSink;

    /// Ask for device access. Denial or missing hardware is reported as
    /// [`CaptureError::DeviceAccessDenied`].
    fn request(
        &self,
        request: DeviceRequest,
    ) -> impl Future<Output = Result<Self::Stream, CaptureError>>;

    /// Bind a recording sink to a granted stream.
    fn open_sink(
        &self,
        stream: &mut Self::Stream,
        request: DeviceRequest,
    ) -> Result<Self::Sink, CaptureError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Draws a frame at its native resolution and encodes it as one image.
pub trait RasterSurface {
    fn encode(&self, frame: &VideoFrame) -> Result<EncodedImage, CaptureError>;
}
