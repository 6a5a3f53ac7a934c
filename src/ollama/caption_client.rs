use reqwest::{Client, StatusCode};
use std::path::Path;

use crate::{
    error::CaptionError,
    logger,
    models::{CaptionRequest, CaptionResult, ImageReference},
    ollama::stream::read_caption_stream,
};

#[derive(Clone)]
pub struct CaptionClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl CaptionClient {
    pub fn new(client: Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Captions one image. Makes a single attempt; errors come back as values.
    pub async fn retrieve(&self, image_path: impl AsRef<Path>, prompt: &str) -> CaptionResult {
        let image = ImageReference::open(image_path)?;
        let _timer = logger::timer(format!("caption for {}", image.path().display()));

        let encoded = image.read_base64().map_err(|e| {
            CaptionError::Unexpected(format!(
                "could not read {}: {}",
                image.path().display(),
                e
            ))
        })?;
        let request = CaptionRequest::new(&self.model, prompt, encoded);

        log::info!("Invoking model {} at {}", self.model, self.endpoint);
        log::debug!("Caption prompt: {}", request.prompt());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Caption request failed with {}: {}", status, body);
            return Err(CaptionError::Network(describe_status(status, &body)));
        }

        read_caption_stream(response.bytes_stream()).await
    }
}

fn classify_request_error(e: reqwest::Error) -> CaptionError {
    if e.is_builder() {
        log::error!("Could not build caption request: {}", e);
        CaptionError::Unexpected(e.to_string())
    } else {
        log::error!("Caption request failed: {}", e);
        CaptionError::Network(e.to_string())
    }
}

/// Ollama answers failures with `{"error": "..."}`; prefer that over the raw body.
fn describe_status(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    if message.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, message)
    }
}
