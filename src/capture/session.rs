//! Owned device session
//!
//! A `DeviceSession` holds the live stream and the preview binding for one
//! capture. `release()` is the single release operation: it stops the stream's
//! tracks and unbinds the preview at most once, and is a no-op afterwards.
//! Dropping the session releases it, so every exit path (including `?` and
//! panics unwinding through the controller) gives the hardware back.

use super::device::{DeviceRequest, MediaStream};

pub struct DeviceSession<S: MediaStream> {
    stream: Option<S>,
    request: DeviceRequest,
    preview_bound: bool,
}

impl<S: MediaStream> DeviceSession<S> {
    /// Take ownership of a granted stream. Camera streams get the preview
    /// surface bound immediately.
    pub fn acquire(stream: S, request: DeviceRequest) -> Self {
        let preview_bound = request.wants_camera();
        if preview_bound {
            log::debug!("Preview bound for {:?} session", request);
        }
        Self {
            stream: Some(stream),
            request,
            preview_bound,
        }
    }

    pub fn request(&self) -> DeviceRequest {
        self.request
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    pub fn preview_bound(&self) -> bool {
        self.preview_bound
    }

    /// Release the stream and preview binding. Returns true if anything was
    /// actually released.
    pub fn release(&mut self) -> bool {
        let had_preview = std::mem::take(&mut self.preview_bound);
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop_tracks();
                log::info!(
                    "Device session released ({:?}, preview_bound={})",
                    self.request,
                    had_preview
                );
                true
            }
            None => had_preview,
        }
    }
}

impl<S: MediaStream> Drop for DeviceSession<S> {
    fn drop(&mut self) {
        self.release();
    }
}
