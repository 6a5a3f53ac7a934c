use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CaptionError;

pub const NO_CAPTION_TEXT: &str = "(No caption returned)";

/// Body of a `POST /api/generate` call. Built once per caption request.
#[derive(Debug, Clone, Serialize)]
pub struct CaptionRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

impl CaptionRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        image_base64: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            images: vec![image_base64.into()],
            stream: true,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }
}

/// One NDJSON line of a streamed generate response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caption {
    Text(String),
    /// The stream finished without any non-whitespace text.
    NoCaption,
}

impl Caption {
    /// Joins fragments in arrival order and trims the result.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: String = fragments.into_iter().map(|f| f.as_ref().to_owned()).collect();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            Caption::NoCaption
        } else {
            Caption::Text(trimmed.to_string())
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Caption::Text(text) => Some(text),
            Caption::NoCaption => None,
        }
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caption::Text(text) => f.write_str(text),
            Caption::NoCaption => f.write_str(NO_CAPTION_TEXT),
        }
    }
}

pub type CaptionResult = std::result::Result<Caption, CaptionError>;
