//! File names for captured artifacts.
//!
//! Format: `<kind>-<YYYYMMDD-HHMMSS>.<ext>`, e.g. `recording-audio-20261019-153012.wav`.

use chrono::NaiveDateTime;

use crate::artifact::SourceKind;

/// File extension for a MIME type. Parameters (`;codecs=...`) are ignored.
pub fn extension_for_mime(mime: &str) -> &'static str {
    let base = mime.split(';').next().unwrap_or("").trim();
    match base {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" | "video/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "video/mp4" | "audio/mp4" => "mp4",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}

pub fn artifact_name(kind: SourceKind, mime: &str, captured_at: NaiveDateTime) -> String {
    let stem = match kind {
        SourceKind::RecordedAudio => "recording-audio",
        SourceKind::RecordedVideo => "recording-video",
        SourceKind::Photo => "photo",
        SourceKind::Upload => "upload",
    };
    format!(
        "{}-{}.{}",
        stem,
        captured_at.format("%Y%m%d-%H%M%S"),
        extension_for_mime(mime)
    )
}
