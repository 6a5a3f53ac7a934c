//! Reading a newline-delimited JSON generate stream.
//!
//! Lines may be split across network chunks. Each complete line is parsed on its
//! own; lines that do not parse are logged and skipped so one bad line never
//! loses the rest of the caption.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt;

use crate::error::CaptionError;
use crate::models::{Caption, CaptionResult, GenerateChunk};

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, terminators removed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            strip_carriage_return(&mut line);
            lines.push(line);
        }
        lines
    }

    /// The trailing line of a body that did not end with a newline.
    pub fn finish(mut self) -> Option<Vec<u8>> {
        strip_carriage_return(&mut self.pending);
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

fn strip_carriage_return(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFlow {
    Continue,
    Done,
}

#[derive(Debug, Default)]
pub struct FragmentCollector {
    fragments: Vec<String>,
    skipped: usize,
}

impl FragmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: &[u8]) -> Result<StreamFlow, CaptionError> {
        let text = match std::str::from_utf8(line) {
            Ok(text) => text.trim(),
            Err(e) => {
                log::warn!("Skipping stream line that is not UTF-8: {}", e);
                self.skipped += 1;
                return Ok(StreamFlow::Continue);
            }
        };
        if text.is_empty() {
            return Ok(StreamFlow::Continue);
        }

        let chunk = match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => match serde_json::from_value::<GenerateChunk>(value) {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::warn!("Unexpected JSON line shape ({}): {}", e, text);
                    self.skipped += 1;
                    return Ok(StreamFlow::Continue);
                }
            },
            Ok(_) => {
                log::warn!("Skipping stream line that is not a JSON object: {}", text);
                self.skipped += 1;
                return Ok(StreamFlow::Continue);
            }
            Err(e) => {
                log::warn!("Could not decode JSON line ({}): {}", e, text);
                self.skipped += 1;
                return Ok(StreamFlow::Continue);
            }
        };

        if let Some(message) = chunk.error {
            return Err(CaptionError::Service(message));
        }
        if let Some(fragment) = chunk.response {
            self.fragments.push(fragment);
        }
        if chunk.done {
            log::debug!(
                "Stream done ({})",
                chunk.done_reason.as_deref().unwrap_or("no reason given")
            );
            return Ok(StreamFlow::Done);
        }
        Ok(StreamFlow::Continue)
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(self) -> Caption {
        log::debug!(
            "Collected {} fragments, skipped {} malformed lines",
            self.fragments.len(),
            self.skipped
        );
        Caption::from_fragments(self.fragments)
    }
}

/// Drains a response body into a caption, stopping at the first `done` line.
pub async fn read_caption_stream<S, B, E>(body: S) -> CaptionResult
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    futures::pin_mut!(body);
    let mut lines = LineBuffer::new();
    let mut collector = FragmentCollector::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| CaptionError::Network(e.to_string()))?;
        for line in lines.push(chunk.as_ref()) {
            if collector.push_line(&line)? == StreamFlow::Done {
                return Ok(collector.finish());
            }
        }
    }

    if let Some(line) = lines.finish() {
        collector.push_line(&line)?;
    }
    Ok(collector.finish())
}
