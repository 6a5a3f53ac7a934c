use std::path::PathBuf;
use thiserror::Error;

pub const HELP_TEXT: &str = "\
Commands:
  snap             select a screen region and caption it
  open <path>      caption an image file (png, jpg, jpeg, bmp)
  again            caption the current image again
  prompt [text]    show or set the prompt (prompt --reset restores the default)
  speak            read the caption aloud
  copy             copy the caption to the clipboard
  save [path]      save the caption (default caption.txt)
  show             show the current image, prompt and caption
  help             show this help
  quit             leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptChange {
    Show,
    Set(String),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Snap,
    Open(PathBuf),
    Again,
    Prompt(PromptChange),
    Speak,
    Copy,
    Save(Option<PathBuf>),
    Show,
    Help,
    Quit,
    /// A blank line.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("Unknown command `{0}`. Type `help` for the list.")]
    Unknown(String),
    #[error("`{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "" => ShellCommand::Nothing,
            "snap" | "screenshot" => ShellCommand::Snap,
            "open" | "choose" => match parse_path(rest) {
                Some(path) => ShellCommand::Open(path),
                None => return Err(CommandParseError::MissingArgument("open", "an image path")),
            },
            "again" | "retry" => ShellCommand::Again,
            "prompt" => ShellCommand::Prompt(match rest {
                "" => PromptChange::Show,
                "--reset" => PromptChange::Reset,
                text => PromptChange::Set(text.to_string()),
            }),
            "speak" | "say" => ShellCommand::Speak,
            "copy" => ShellCommand::Copy,
            "save" => ShellCommand::Save(parse_path(rest)),
            "show" => ShellCommand::Show,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Strips one pair of surrounding quotes and expands a leading `~/`.
fn parse_path(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| raw.strip_prefix(*q).and_then(|r| r.strip_suffix(*q)))
        .unwrap_or(raw);
    if unquoted.is_empty() {
        return None;
    }

    match unquoted.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(unquoted)),
    }
}
