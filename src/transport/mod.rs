//! Manual generation requests
//!
//! One outbound operation: submit the topic and every attached artifact,
//! receive the generated manual text and an optional list of illustrations.
//! Calls take a `CancellationToken`; once it fires the response is abandoned.

mod http;

pub use http::{decode_response, error_message, HttpTransport};

use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::artifact::CapturedArtifact;

/// Snapshot of the draft taken at submission time.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub files: Vec<CapturedArtifact>,
    pub generate_images: bool,
}

impl GenerationRequest {
    /// Nothing to generate from: blank topic and no files.
    pub fn is_empty(&self) -> bool {
        self.topic.trim().is_empty() && self.files.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub manual: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request cancelled")]
    Cancelled,
}

/// Sends generation requests.
pub trait Transport: Send + Sync + 'static {
    fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<GenerationResponse, TransportError>> + Send;
}
