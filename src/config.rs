use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "moondream";
pub const DEFAULT_PROMPT: &str = "Describe this image in detail for a visually impaired user.";

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub model: String,
    /// Whole-request timeout. `None` waits as long as the model keeps streaming.
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub program: String,
    pub rate: u32,
}

/// Box the preview has to fit in, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inference: InferenceConfig,
    pub capture: CaptureConfig,
    pub speech: SpeechConfig,
    pub preview: PreviewConfig,
    pub default_prompt: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let endpoint = env::var("SNAPSENSE_ENDPOINT").unwrap_or(defaults.endpoint);
        let model = env::var("SNAPSENSE_MODEL").unwrap_or(defaults.model);
        let request_timeout = env::var("SNAPSENSE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        InferenceConfig {
            endpoint,
            model,
            request_timeout,
            connect_timeout: defaults.connect_timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            output_dir: default_capture_dir(),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let output_dir = env::var("SNAPSENSE_CAPTURE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let timeout = env::var("SNAPSENSE_CAPTURE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);

        CaptureConfig {
            output_dir,
            timeout,
            poll_interval: defaults.poll_interval,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        SpeechConfig {
            program: "espeak-ng".to_string(),
            rate: 150,
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let rate = env::var("SNAPSENSE_SPEECH_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.rate);

        SpeechConfig {
            program: defaults.program,
            rate,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        PreviewConfig {
            width: 760,
            height: 280,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            inference: InferenceConfig::default(),
            capture: CaptureConfig::default(),
            speech: SpeechConfig::default(),
            preview: PreviewConfig::default(),
            default_prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `SNAPSENSE_*` variables; call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let default_prompt = env::var("SNAPSENSE_PROMPT")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        Config {
            inference: InferenceConfig::from_env(),
            capture: CaptureConfig::from_env(),
            speech: SpeechConfig::from_env(),
            preview: PreviewConfig::default(),
            default_prompt,
        }
    }

    pub fn with_inference(mut self, config: InferenceConfig) -> Self {
        self.inference = config;
        self
    }

    pub fn with_capture(mut self, config: CaptureConfig) -> Self {
        self.capture = config;
        self
    }

    pub fn with_speech(mut self, config: SpeechConfig) -> Self {
        self.speech = config;
        self
    }
}

fn default_capture_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SnapSenseCaptions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_ollama() {
        let config = Config::default();
        assert_eq!(config.inference.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(config.inference.model, "moondream");
        assert!(config.inference.request_timeout.is_none());
        assert_eq!(config.capture.timeout, Duration::from_secs(5));
        assert_eq!(config.capture.poll_interval, Duration::from_millis(100));
        assert!(config.capture.output_dir.ends_with("SnapSenseCaptions"));
        assert_eq!(config.speech.rate, 150);
        assert_eq!(config.default_prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn builders_override_fields() {
        let config = Config::new()
            .with_inference(
                InferenceConfig::new()
                    .with_endpoint("http://127.0.0.1:9999/api/generate")
                    .with_model("llava")
                    .with_request_timeout(Duration::from_secs(30)),
            )
            .with_capture(CaptureConfig::new().with_output_dir("/tmp/shots"));

        assert_eq!(config.inference.endpoint, "http://127.0.0.1:9999/api/generate");
        assert_eq!(config.inference.model, "llava");
        assert_eq!(config.inference.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.capture.output_dir, PathBuf::from("/tmp/shots"));
    }
}
