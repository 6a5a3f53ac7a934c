use crate::config::SpeechConfig;
use crate::error::{Result, SnapSenseError};
use crate::tools::{Invocation, Toolbox};

pub fn speech_invocation(config: &SpeechConfig, text: &str) -> Invocation {
    Invocation::new(&config.program)
        .arg("-s")
        .arg(config.rate.to_string())
        .arg(text)
}

/// Starts speaking `text` in the background. Does not wait for playback.
pub fn speak<T: Toolbox + ?Sized>(tools: &T, config: &SpeechConfig, text: &str) -> Result<()> {
    if !tools.is_available(&config.program) {
        return Err(SnapSenseError::ToolUnavailable(format!(
            "{} not found. Cannot speak caption.",
            config.program
        )));
    }
    tools.spawn_detached(&speech_invocation(config, text))
}
