//! Microphone capture using CPAL, recorded to an in-memory WAV with hound
//!
//! `MicrophoneService` opens the default input device when audio is
//! requested. The CPAL stream starts immediately; samples are only kept once
//! a `WavSink` has been attached, and `WavSink::finalize` turns them into a
//! 16-bit PCM WAV blob. Camera requests are refused: this host backend has no
//! video source.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};

use super::device::{DeviceCaptureService, DeviceRequest, MediaStream, RecordingSink};
use super::CaptureError;

pub const WAV_MIME: &str = "audio/wav";

/// Samples collected since a sink was attached. `None` means nobody is recording.
type SharedSamples = Arc<Mutex<Option<Vec<i16>>>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct MicrophoneService;

impl MicrophoneService {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceCaptureService for MicrophoneService {
    type Stream = MicrophoneStream;
    type Sink = WavSink;

    fn request(
        &self,
        request: DeviceRequest,
    ) -> impl std::future::Future<Output = Result<MicrophoneStream, CaptureError>> {
        let result = if request.wants_camera() {
            Err(CaptureError::DeviceAccessDenied(
                "No camera available on this host".to_string(),
            ))
        } else {
            MicrophoneStream::open_default()
        };
        std::future::ready(result)
    }

    fn open_sink(
        &self,
        stream: &mut MicrophoneStream,
        _request: DeviceRequest,
    ) -> Result<WavSink, CaptureError> {
        stream.attach_sink()
    }
}

/// Live microphone stream. Stopping the tracks pauses and drops the CPAL stream.
pub struct MicrophoneStream {
    stream: Option<Stream>,
    samples: SharedSamples,
    spec: WavSpec,
}

impl MicrophoneStream {
    fn open_default() -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceAccessDenied("No audio input device found".to_string())
        })?;

        log::info!("Using audio input device: {:?}", device.name());

        let supported_config = device.default_input_config().map_err(|e| {
            CaptureError::DeviceAccessDenied(format!("No supported audio configuration: {}", e))
        })?;

        log::info!(
            "Audio config: {} Hz, {} channels, {:?}",
            supported_config.sample_rate().0,
            supported_config.channels(),
            supported_config.sample_format()
        );

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();
        let spec = WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate.0,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let samples: SharedSamples = Arc::new(Mutex::new(None));
        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, samples.clone()),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, samples.clone()),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, samples.clone()),
            other => Err(CaptureError::DeviceAccessDenied(format!(
                "Unsupported sample format: {:?}",
                other
            ))),
        }?;

        stream.play().map_err(|e| {
            CaptureError::DeviceAccessDenied(format!("Failed to start stream: {}", e))
        })?;

        Ok(Self {
            stream: Some(stream),
            samples,
            spec,
        })
    }

    fn attach_sink(&mut self) -> Result<WavSink, CaptureError> {
        if self.stream.is_none() {
            return Err(CaptureError::DeviceAccessDenied(
                "Microphone stream already stopped".to_string(),
            ));
        }
        let mut guard = self.samples.lock().map_err(|_| {
            CaptureError::DeviceAccessDenied("Audio buffer lock poisoned".to_string())
        })?;
        *guard = Some(Vec::new());
        Ok(WavSink {
            samples: self.samples.clone(),
            spec: self.spec,
        })
    }
}

impl MediaStream for MicrophoneStream {
    fn stop_tracks(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause audio stream: {}", e);
            }
        }
    }
}

/// Recording sink for a microphone stream.
pub struct WavSink {
    samples: SharedSamples,
    spec: WavSpec,
}

impl RecordingSink for WavSink {
    fn mime_type(&self) -> &str {
        WAV_MIME
    }

    async fn finalize(self) -> Result<Vec<u8>, CaptureError> {
        let samples = self
            .samples
            .lock()
            .map_err(|_| {
                CaptureError::RecordingFinalizationFailure("Audio buffer lock poisoned".to_string())
            })?
            .take()
            .unwrap_or_default();

        log::info!(
            "Finalizing WAV: {} samples, {} Hz, {} channels",
            samples.len(),
            self.spec.sample_rate,
            self.spec.channels
        );

        encode_wav(&samples, self.spec)
            .map_err(|e| CaptureError::RecordingFinalizationFailure(e.to_string()))
    }
}

/// Encode interleaved 16-bit samples as a complete WAV file.
pub fn encode_wav(samples: &[i16], spec: WavSpec) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: SharedSamples,
) -> Result<Stream, CaptureError>
where
    T: cpal::SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let Ok(mut guard) = samples.lock() else {
                    return;
                };
                if let Some(buffer) = guard.as_mut() {
                    buffer.extend(data.iter().map(|&s| sample_to_i16(s)));
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::DeviceAccessDenied(format!("Failed to create audio stream: {}", e)))
}

/// Convert any sample type to i16 for WAV writing.
fn sample_to_i16<T>(sample: T) -> i16
where
    f32: FromSample<T>,
{
    let clamped = f32::from_sample_(sample).clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}
