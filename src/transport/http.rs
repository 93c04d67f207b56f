//! Multipart HTTP client for the manual generator backend.
//!
//! `POST {endpoint}` with form fields `topic`, `generate_images` and one
//! `files` part per artifact. The backend answers either with JSON
//! (`{"manual": "...", "images": [...]}`) or with the markdown file itself.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{GenerationRequest, GenerationResponse, Transport, TransportError};
use crate::settings::AppSettings;

#[derive(Debug, Deserialize)]
struct WireResponse {
    manual: String,
    #[serde(default)]
    images: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidRequest(format!("bad endpoint {endpoint:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, TransportError> {
        Self::new(
            &settings.endpoint,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `GET /health` on the backend host.
    pub async fn health(&self) -> bool {
        let Ok(url) = self.endpoint.join("/health") else {
            return false;
        };
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn send(&self, request: GenerationRequest) -> Result<GenerationResponse, TransportError> {
        let total_bytes: u64 = request.files.iter().map(|f| f.size_bytes()).sum();
        log::info!(
            "Submitting manual request: topic_len={}, files={}, bytes={}, generate_images={}",
            request.topic.len(),
            request.files.len(),
            total_bytes,
            request.generate_images
        );

        let form = build_form(&request)?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if status.is_success() {
            let decoded = decode_response(&content_type, &body)?;
            log::info!(
                "Manual received: {} chars, {} images",
                decoded.manual.len(),
                decoded.images.len()
            );
            Ok(decoded)
        } else {
            let message = error_message(&body);
            log::error!("Generator error ({}): {}", status.as_u16(), message);
            Err(TransportError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl Transport for HttpTransport {
    async fn generate(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResponse, TransportError> {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                log::info!("Manual request abandoned (cancelled)");
                Err(TransportError::Cancelled)
            }

            result = self.send(request) => result,
        }
    }
}

fn build_form(request: &GenerationRequest) -> Result<Form, TransportError> {
    let mut form = Form::new()
        .text("topic", request.topic.clone())
        .text("generate_images", request.generate_images.to_string());

    for file in &request.files {
        let part = Part::bytes(file.payload().to_vec())
            .file_name(file.display_name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| {
                TransportError::InvalidRequest(format!(
                    "bad MIME type {:?} for {}: {}",
                    file.mime_type(),
                    file.display_name(),
                    e
                ))
            })?;
        form = form.part("files", part);
    }

    Ok(form)
}

/// Decode a successful response body.
///
/// Markdown or plain-text bodies are the manual itself; anything else must be
/// the JSON envelope.
pub fn decode_response(content_type: &str, body: &str) -> Result<GenerationResponse, TransportError> {
    let content_type = content_type.trim().to_ascii_lowercase();
    if content_type.starts_with("text/markdown") || content_type.starts_with("text/plain") {
        return Ok(GenerationResponse {
            manual: body.to_string(),
            images: Vec::new(),
        });
    }

    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    Ok(GenerationResponse {
        manual: wire.manual,
        images: wire.images.unwrap_or_default(),
    })
}

/// Best-effort error text from a failed response body.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.get("detail"),
            value.get("error").and_then(|e| e.get("message")),
            value.get("error"),
            value.get("message"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(text) = candidate.as_str() {
                return text.to_string();
            }
        }
    }
    body.trim().to_string()
}
