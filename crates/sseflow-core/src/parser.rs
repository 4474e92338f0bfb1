//! Incremental SSE record parser.
//!
//! Text arrives in arbitrarily sized chunks. Records are separated by a
//! blank line: two consecutive line terminators, each of which may be
//! `\r\n`, `\r` or `\n`. A boundary may straddle two chunks, so boundaries
//! are searched in the accumulated pending text rather than per chunk.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::event::{MESSAGE, MessageEvent};

// Every pair of terminators, spelled out so that a single "\r\n" is never
// read as "\r" followed by "\n". Longer alternatives come first.
static RECORD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n\r\n|\r\n\r|\r\n\n|\r\r|\n\r\n|\n\r|\n\n").expect("valid regex")
});

/// Fields accumulated for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: Option<String>,
    /// Parsed but not acted upon; reconnection timing is not implemented.
    pub retry: Option<u64>,
    pub data: String,
    pub event: String,
}

impl Default for RawRecord {
    fn default() -> Self {
        Self {
            id: None,
            retry: None,
            data: String::new(),
            event: MESSAGE.to_string(),
        }
    }
}

impl RawRecord {
    /// Apply one `field:value` line.
    ///
    /// Comments (leading `:`), lines without a separator, unknown field
    /// names and non-numeric `retry` values are ignored.
    pub fn apply_line(&mut self, line: &str) {
        let line = line.trim_end();
        let (name, value) = match line.find(':') {
            None | Some(0) => return,
            Some(pos) => (&line[..pos], line[pos + 1..].trim_start()),
        };

        match name {
            // Consecutive data lines are joined without a delimiter.
            "data" => self.data.push_str(value),
            "event" => self.event = value.to_string(),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(ms);
                }
            }
            other => tracing::trace!(field = other, "ignoring unknown SSE field"),
        }
    }

    pub fn into_event(self) -> MessageEvent {
        MessageEvent {
            id: self.id,
            ..MessageEvent::new(self.event, Value::String(self.data))
        }
    }
}

/// Parse the text of one complete record.
///
/// Whitespace-only text yields `None`. Any other text yields a record,
/// with defaults for fields no line set.
pub fn parse_record(text: &str) -> Option<RawRecord> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut record = RawRecord::default();
    // Splitting "\r\n" on both characters leaves an empty line in between,
    // which carries no separator and is skipped.
    for line in text.split(['\r', '\n']) {
        record.apply_line(line);
    }
    Some(record)
}

/// Parse one record straight into a dispatchable event.
pub fn parse_event(text: &str) -> Option<MessageEvent> {
    parse_record(text).map(RawRecord::into_event)
}

/// Buffers chunks and yields events as records complete.
#[derive(Debug, Default)]
pub struct ChunkParser {
    pending: String,
    progress: usize,
}

impl ChunkParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed newly arrived text and return every record it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<MessageEvent> {
        self.progress += chunk.chars().count();
        self.pending.push_str(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        for boundary in RECORD_BOUNDARY.find_iter(&self.pending) {
            if let Some(event) = parse_event(&self.pending[consumed..boundary.start()]) {
                events.push(event);
            }
            consumed = boundary.end();
        }
        self.pending.drain(..consumed);
        events
    }

    /// Flush the unterminated record left at end of stream, if any.
    pub fn finish(&mut self) -> Option<MessageEvent> {
        let pending = std::mem::take(&mut self.pending);
        parse_event(&pending)
    }

    /// Text of the record still being accumulated.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Number of characters observed so far.
    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.progress = 0;
    }
}
