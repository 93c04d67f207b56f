//! Still-photo encoding with the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

use super::device::{EncodedImage, RasterSurface, VideoFrame};
use super::CaptureError;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encodes frames as JPEG at their native resolution.
#[derive(Debug, Clone, Copy)]
pub struct JpegSurface {
    quality: u8,
}

impl JpegSurface {
    /// Quality is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegSurface {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl RasterSurface for JpegSurface {
    fn encode(&self, frame: &VideoFrame) -> Result<EncodedImage, CaptureError> {
        let rgba = frame_image(frame)?;
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality)
            .encode_image(&rgb)
            .map_err(|e| CaptureError::RecordingFinalizationFailure(e.to_string()))?;

        Ok(EncodedImage {
            bytes,
            mime_type: "image/jpeg",
        })
    }
}

/// Lossless PNG encoding, alpha preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngSurface;

impl RasterSurface for PngSurface {
    fn encode(&self, frame: &VideoFrame) -> Result<EncodedImage, CaptureError> {
        let rgba = frame_image(frame)?;

        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                rgba.as_raw(),
                rgba.width(),
                rgba.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CaptureError::RecordingFinalizationFailure(e.to_string()))?;

        Ok(EncodedImage {
            bytes,
            mime_type: "image/png",
        })
    }
}

fn frame_image(frame: &VideoFrame) -> Result<RgbaImage, CaptureError> {
    if !frame.is_well_formed() {
        return Err(CaptureError::RecordingFinalizationFailure(format!(
            "frame buffer does not match {}x{}",
            frame.width, frame.height
        )));
    }
    RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone()).ok_or_else(|| {
        CaptureError::RecordingFinalizationFailure(format!(
            "frame buffer does not match {}x{}",
            frame.width, frame.height
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame {
            width,
            height,
            rgba: vec![128; (width * height * 4) as usize],
        }
    }

    #[test]
    fn jpeg_keeps_native_resolution() {
        let encoded = JpegSurface::default().encode(&frame(16, 8)).unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn png_keeps_native_resolution() {
        let encoded = PngSurface.encode(&frame(3, 5)).unwrap();
        assert_eq!(encoded.mime_type, "image/png");

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 5));
    }

    #[test]
    fn malformed_frame_is_a_finalization_failure() {
        let bad = VideoFrame {
            width: 4,
            height: 4,
            rgba: vec![0; 3],
        };
        assert!(matches!(
            JpegSurface::default().encode(&bad),
            Err(CaptureError::RecordingFinalizationFailure(_))
        ));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegSurface::new(0).quality(), 1);
        assert_eq!(JpegSurface::new(255).quality(), 100);
    }
}
