use colored::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SpeechConfig;
use crate::shell::state::ShellState;
use crate::tools::{clipboard, speech, Toolbox};

pub const DEFAULT_SAVE_NAME: &str = "caption.txt";
pub const SEPARATOR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the user, the terminal stand-in for a modal dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn render(&self) -> String {
        let title = match self.level {
            NoticeLevel::Info => self.title.green().bold(),
            NoticeLevel::Warning => self.title.yellow().bold(),
            NoticeLevel::Error => self.title.red().bold(),
        };
        format!("[{}] {}", title, self.message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.title, self.message)
    }
}

pub fn speak<T: Toolbox + ?Sized>(state: &ShellState, tools: &T, config: &SpeechConfig) -> Notice {
    let Some(caption) = state.caption().caption() else {
        return Notice::warning("Warning", "No caption to speak.");
    };
    match speech::speak(tools, config, caption) {
        Ok(()) => Notice::info("Speaking", "Reading the caption aloud."),
        Err(e) => Notice::warning("Warning", e.to_string()),
    }
}

pub async fn copy<T: Toolbox + ?Sized>(state: &ShellState, tools: &T) -> Notice {
    let Some(text) = state.caption().copyable_text() else {
        return Notice::warning("Warning", "No caption to copy.");
    };
    match clipboard::copy_text(tools, &text).await {
        Ok(tool) => {
            log::debug!("Copied {} characters with {}", text.len(), tool.program());
            Notice::info("Copied", "Caption copied to clipboard!")
        }
        Err(e) => Notice::warning("Warning", e.to_string()),
    }
}

pub fn save(state: &ShellState, target: Option<PathBuf>) -> Notice {
    let Some(caption) = state.caption().caption() else {
        return Notice::warning("Warning", "No valid caption to save.");
    };
    let path = save_path(target);
    let contents = caption_file_contents(state.image(), caption);

    match fs::write(&path, contents) {
        Ok(()) => {
            log::info!("💾 Caption saved to {}", path.display());
            Notice::info("Saved", format!("Caption saved to: {}", path.display()))
        }
        Err(e) => Notice::error("Error", format!("Failed to save caption: {}", e)),
    }
}

/// `caption.txt` when no path is given; `.txt` appended when the name has no extension.
pub fn save_path(target: Option<PathBuf>) -> PathBuf {
    match target {
        None => PathBuf::from(DEFAULT_SAVE_NAME),
        Some(path) if path.extension().is_none() => path.with_extension("txt"),
        Some(path) => path,
    }
}

pub fn caption_file_contents(image: Option<&Path>, caption: &str) -> String {
    let source = image
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(unknown)".to_string());
    format!(
        "Image Source: {}\n{}\n{}",
        source,
        "-".repeat(SEPARATOR_WIDTH),
        caption
    )
}
