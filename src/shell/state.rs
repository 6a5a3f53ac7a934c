use std::path::{Path, PathBuf};

use crate::error::CaptionError;
use crate::models::{Caption, CaptionResult, NO_CAPTION_TEXT};

pub const GENERATING_TEXT: &str = "⏳ Generating caption...";
pub const EMPTY_TEXT: &str = "Your captions will appear here...";

/// What the caption area currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionState {
    Empty,
    Generating,
    Ready(String),
    NoCaption,
    Failed(CaptionError),
}

impl CaptionState {
    pub fn from_result(result: CaptionResult) -> Self {
        match result {
            Ok(Caption::Text(text)) => CaptionState::Ready(text),
            Ok(Caption::NoCaption) => CaptionState::NoCaption,
            Err(e) => CaptionState::Failed(e),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            CaptionState::Empty => EMPTY_TEXT.to_string(),
            CaptionState::Generating => GENERATING_TEXT.to_string(),
            CaptionState::Ready(text) => text.clone(),
            CaptionState::NoCaption => NO_CAPTION_TEXT.to_string(),
            CaptionState::Failed(e) => e.display_text(),
        }
    }

    /// Text of a finished request, the no-caption sentinel included.
    /// Placeholders and errors give `None`.
    pub fn caption(&self) -> Option<&str> {
        match self {
            CaptionState::Ready(text) => Some(text),
            CaptionState::NoCaption => Some(NO_CAPTION_TEXT),
            _ => None,
        }
    }

    /// Text worth putting on the clipboard: anything the model or the retriever produced.
    pub fn copyable_text(&self) -> Option<String> {
        match self {
            CaptionState::Empty | CaptionState::Generating => None,
            other => Some(other.display_text()),
        }
    }
}

/// Interface state. Only the shell's event loop reads or writes it.
#[derive(Debug, Clone)]
pub struct ShellState {
    image: Option<PathBuf>,
    caption: CaptionState,
    prompt: String,
    default_prompt: String,
    generation: u64,
}

impl ShellState {
    pub fn new(default_prompt: impl Into<String>) -> Self {
        let default_prompt = default_prompt.into();
        Self {
            image: None,
            caption: CaptionState::Empty,
            prompt: default_prompt.clone(),
            default_prompt,
            generation: 0,
        }
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn caption(&self) -> &CaptionState {
        &self.caption
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn reset_prompt(&mut self) {
        self.prompt = self.default_prompt.clone();
    }

    /// The prompt to send: the custom one unless it is blank.
    pub fn effective_prompt(&self) -> &str {
        let trimmed = self.prompt.trim();
        if trimmed.is_empty() {
            self.default_prompt.as_str()
        } else {
            trimmed
        }
    }

    /// Switches to `image`, shows the placeholder and returns the new request id.
    pub fn begin_generation(&mut self, image: PathBuf) -> u64 {
        self.generation += 1;
        self.image = Some(image);
        self.caption = CaptionState::Generating;
        self.generation
    }

    /// Shows a load failure. Any request still in flight is superseded.
    pub fn reject_image(&mut self, error: CaptionError) {
        self.generation += 1;
        self.caption = CaptionState::Failed(error);
    }

    /// Applies a finished request. Returns `false` if a newer request superseded it.
    pub fn apply_result(&mut self, generation: u64, result: CaptionResult) -> bool {
        if generation != self.generation {
            return false;
        }
        self.caption = CaptionState::from_result(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_prompt_falls_back_to_default() {
        let mut state = ShellState::new("Describe.");
        assert_eq!(state.effective_prompt(), "Describe.");

        state.set_prompt("   ");
        assert_eq!(state.effective_prompt(), "Describe.");

        state.set_prompt("  What colour is the car?  ");
        assert_eq!(state.effective_prompt(), "What colour is the car?");

        state.reset_prompt();
        assert_eq!(state.prompt(), "Describe.");
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut state = ShellState::new("p");
        let first = state.begin_generation(PathBuf::from("a.png"));
        let second = state.begin_generation(PathBuf::from("b.png"));

        assert!(!state.apply_result(first, Ok(Caption::Text("old".into()))));
        assert_eq!(state.caption(), &CaptionState::Generating);

        assert!(state.apply_result(second, Ok(Caption::Text("new".into()))));
        assert_eq!(state.caption().caption(), Some("new"));
        assert_eq!(state.image(), Some(Path::new("b.png")));
    }

    #[test]
    fn rejected_image_supersedes_pending_request() {
        let mut state = ShellState::new("p");
        let pending = state.begin_generation(PathBuf::from("a.png"));
        state.reject_image(CaptionError::InvalidImage(PathBuf::from("b.png")));

        assert!(!state.apply_result(pending, Ok(Caption::Text("late".into()))));
        assert_eq!(state.caption().display_text(), "(Error: invalid image → b.png)");
    }

    #[test]
    fn finished_requests_have_a_caption() {
        assert_eq!(CaptionState::Ready("x".into()).caption(), Some("x"));
        assert_eq!(
            CaptionState::NoCaption.caption(),
            Some("(No caption returned)")
        );
        for state in [
            CaptionState::Empty,
            CaptionState::Generating,
            CaptionState::Failed(CaptionError::Network("refused".into())),
        ] {
            assert!(state.caption().is_none(), "{:?}", state);
        }
    }

    #[test]
    fn copyable_text_excludes_placeholders() {
        assert!(CaptionState::Empty.copyable_text().is_none());
        assert!(CaptionState::Generating.copyable_text().is_none());
        assert_eq!(
            CaptionState::NoCaption.copyable_text().as_deref(),
            Some("(No caption returned)")
        );
        assert_eq!(
            CaptionState::Failed(CaptionError::Network("refused".into()))
                .copyable_text()
                .as_deref(),
            Some("(Error talking to Ollama: refused)")
        );
    }
}
