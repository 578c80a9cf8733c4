//! Server-Sent Event Parser
//!
//! Incremental decoder for the backend's `text/event-stream` body. Bytes
//! arrive in arbitrary chunks; only complete lines are decoded, so a line (or
//! a multibyte character) split across chunks is reassembled before use.
//!
//! # Framing
//!
//! ```text
//! event: answer_chunk        <- sets the event type for following data lines
//! data: The deductible is    <- raw text, because of the event type
//!                            <- blank line resets the event type
//! data: {"node": "classify", "status": "running"}   <- JSON payload
//! ```

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;

/// Event type whose data lines carry raw answer text instead of JSON
pub const ANSWER_CHUNK_EVENT: &str = "answer_chunk";

/// Payload of one data line
#[derive(Clone, Debug, PartialEq)]
pub enum SsePayload {
    /// Raw text (data lines under `event: answer_chunk`)
    Text(String),
    /// Decoded JSON (all other data lines)
    Json(Value),
}

/// One logical record yielded by the parser
#[derive(Clone, Debug, PartialEq)]
pub struct SseRecord {
    /// Event type in effect when the data line arrived
    pub event_type: Option<String>,
    /// Decoded payload
    pub payload: SsePayload,
}

/// Incremental line-based SSE parser
#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a newline
    scanned: usize,
    /// Event type set by the last `event:` line of the current block
    event_type: Option<String>,
}

impl SseParser {
    /// Create a parser with empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body, returning every record it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            if let Some(record) = self.process_line(&line) {
                records.push(record);
            }
            start = end + 1;
            search_from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        records
    }

    /// Finish the stream, discarding any unterminated final line
    pub fn finish(self) {
        if !self.buffer.is_empty() {
            tracing::trace!(
                bytes = self.buffer.len(),
                "Discarding unterminated final SSE line"
            );
        }
    }

    /// Event type currently in effect
    #[must_use]
    pub fn current_event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    fn process_line(&mut self, raw: &str) -> Option<SseRecord> {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line.is_empty() {
            self.event_type = None;
            return None;
        }

        if let Some(value) = line.strip_prefix("event:") {
            let value = value.trim();
            self.event_type = (!value.is_empty()).then(|| value.to_string());
            return None;
        }

        let data = line.strip_prefix("data:")?.trim();
        if data.is_empty() {
            return None;
        }

        let payload = if self.event_type.as_deref() == Some(ANSWER_CHUNK_EVENT) {
            SsePayload::Text(data.to_string())
        } else {
            match serde_json::from_str::<Value>(data) {
                Ok(value) => SsePayload::Json(value),
                Err(e) => {
                    tracing::debug!(error = %e, data = %data, "Dropping malformed SSE data line");
                    return None;
                }
            }
        };

        Some(SseRecord {
            event_type: self.event_type.clone(),
            payload,
        })
    }
}

/// Adapt a byte stream into a lazy stream of SSE records
///
/// A fresh parser is created for every call. Transport errors from the
/// underlying stream are passed through unchanged; parsing never fails.
pub fn decode_records<S, E>(bytes: S) -> impl Stream<Item = Result<SseRecord, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let state = (bytes, Some(SseParser::new()), VecDeque::new());

    futures::stream::unfold(state, |(mut bytes, mut parser, mut pending)| async move {
        loop {
            if let Some(record) = pending.pop_front() {
                return Some((Ok(record), (bytes, parser, pending)));
            }

            let active = parser.as_mut()?;
            match bytes.next().await {
                Some(Ok(chunk)) => pending.extend(active.feed(&chunk)),
                Some(Err(e)) => {
                    parser = None;
                    return Some((Err(e), (bytes, parser, pending)));
                }
                None => {
                    if let Some(done) = parser.take() {
                        done.finish();
                    }
                    return None;
                }
            }
        }
    })
}
