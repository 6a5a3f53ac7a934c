use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single caption request.
///
/// The `Display` text is what the shell shows in the caption area (wrapped in
/// parentheses), so every variant starts with "Error".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("Error: invalid image → {}", .0.display())]
    InvalidImage(PathBuf),
    #[error("Error talking to Ollama: {0}")]
    Network(String),
    #[error("Error reported by Ollama: {0}")]
    Service(String),
    #[error("Error: unexpected failure: {0}")]
    Unexpected(String),
}

impl CaptionError {
    /// Text for the caption area, e.g. `(Error talking to Ollama: ...)`.
    pub fn display_text(&self) -> String {
        format!("({})", self)
    }
}

#[derive(Debug, Error)]
pub enum SnapSenseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("{0}")]
    ToolUnavailable(String),
    #[error("Screenshot failed: {0}")]
    CaptureError(String),
    #[error("Command error: {0}")]
    CommandError(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SnapSenseError>;
