pub mod caption_client;
pub mod stream;

use crate::{
    config::InferenceConfig,
    error::{Result, SnapSenseError},
};
use reqwest::Client;

pub use caption_client::CaptionClient;

/// Entry point to a local Ollama-compatible inference service.
#[derive(Clone)]
pub struct OllamaClient {
    caption_client: CaptionClient,
}

impl OllamaClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SnapSenseError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            caption_client: CaptionClient::new(client, &config.endpoint, &config.model),
        })
    }

    pub fn caption(&self) -> &CaptionClient {
        &self.caption_client
    }
}
