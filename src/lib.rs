//! SnapSense: caption screenshots and image files with a local vision-language
//! model, then speak, copy or save the caption.

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod ollama;
pub mod shell;
pub mod tools;

pub use config::{CaptureConfig, Config, InferenceConfig, SpeechConfig};
pub use error::{CaptionError, Result, SnapSenseError};
pub use models::{Caption, CaptionRequest, CaptionResult, ImageReference};
pub use ollama::{CaptionClient, OllamaClient};
pub use shell::Shell;
pub use tools::{SystemTools, Toolbox};
