//! Stream Record Classification
//!
//! Turns a parsed [`SseRecord`] into one of a closed set of record kinds, so
//! the session controller can dispatch with a plain `match`. The backend
//! does not tag every block reliably, so classification is by JSON shape.
//!
//! Classification is lenient: a shape the client does not recognise, or a
//! recognised shape that fails typed decoding, becomes [`StreamRecord::Heartbeat`]
//! and is ignored. New backend record kinds must never break the client.

use serde_json::{Map, Value};

use super::parser::{SsePayload, SseRecord};
use crate::messages::{AgentResponse, TraceEvent};

/// A classified stream record
#[derive(Clone, Debug, PartialEq)]
pub enum StreamRecord {
    /// Status update for one pipeline node
    TraceUpdate(TraceEvent),
    /// Fragment of the answer text
    AnswerFragment(String),
    /// The structured terminal answer
    TerminalResponse(Box<AgentResponse>),
    /// Backend-reported error; the stream keeps going
    RecoverableError {
        /// Displayable error message
        message: String,
        /// Whether the backend considers a retry worthwhile
        recoverable: bool,
    },
    /// Keep-alive or unrecognised record
    Heartbeat,
}

impl StreamRecord {
    /// Classify a parsed SSE record
    #[must_use]
    pub fn classify(record: SseRecord) -> Self {
        match record.payload {
            SsePayload::Text(text) => Self::AnswerFragment(text),
            SsePayload::Json(Value::Object(object)) => Self::classify_object(object),
            SsePayload::Json(_) => Self::Heartbeat,
        }
    }

    fn classify_object(object: Map<String, Value>) -> Self {
        if object.contains_key("node") && object.contains_key("status") {
            return decode(object, "trace").map_or(Self::Heartbeat, Self::TraceUpdate);
        }

        if let Some(text) = object.get("text") {
            return match text.as_str() {
                Some(text) => Self::AnswerFragment(text.to_string()),
                None => {
                    tracing::debug!(text = %text, "Ignoring non-string answer fragment");
                    Self::Heartbeat
                }
            };
        }

        if object.contains_key("intent") {
            return match serde_json::from_value::<AgentResponse>(Value::Object(object)) {
                Ok(response) => Self::TerminalResponse(Box::new(response)),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring undecodable terminal response");
                    Self::Heartbeat
                }
            };
        }

        if let (Some(message), Some(recoverable)) = (
            object.get("message").and_then(Value::as_str),
            object.get("recoverable"),
        ) {
            return Self::RecoverableError {
                message: message.to_string(),
                recoverable: recoverable.as_bool().unwrap_or(true),
            };
        }

        Self::Heartbeat
    }

    /// Short name of the record kind, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TraceUpdate(_) => "trace",
            Self::AnswerFragment(_) => "answer_fragment",
            Self::TerminalResponse(_) => "terminal",
            Self::RecoverableError { .. } => "error",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl From<SseRecord> for StreamRecord {
    fn from(record: SseRecord) -> Self {
        Self::classify(record)
    }
}

fn decode<T: serde::de::DeserializeOwned>(object: Map<String, Value>, what: &str) -> Option<T> {
    match serde_json::from_value(Value::Object(object)) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, kind = what, "Ignoring undecodable stream record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ChartType, Intent, TraceStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn classify_json(value: Value) -> StreamRecord {
        StreamRecord::classify(SseRecord {
            event_type: None,
            payload: SsePayload::Json(value),
        })
    }

    #[test]
    fn test_trace_update() {
        let record = classify_json(json!({"node": "classify", "status": "complete", "timing_ms": 40}));
        assert_eq!(
            record,
            StreamRecord::TraceUpdate(
                TraceEvent::new("classify", TraceStatus::Complete).with_timing(40.0)
            )
        );
    }

    #[test]
    fn test_trace_with_unknown_status_is_heartbeat() {
        let record = classify_json(json!({"node": "classify", "status": "queued"}));
        assert_eq!(record, StreamRecord::Heartbeat);
    }

    #[test]
    fn test_legacy_text_fragment() {
        let record = classify_json(json!({"text": "The deductible"}));
        assert_eq!(record, StreamRecord::AnswerFragment("The deductible".to_string()));
    }

    #[test]
    fn test_answer_chunk_text_payload() {
        let record = StreamRecord::classify(SseRecord {
            event_type: Some("answer_chunk".to_string()),
            payload: SsePayload::Text("{\"intent\": \"rag\"}".to_string()),
        });
        assert_eq!(
            record,
            StreamRecord::AnswerFragment("{\"intent\": \"rag\"}".to_string())
        );
    }

    #[test]
    fn test_terminal_response() {
        let record = classify_json(json!({
            "intent": "rag",
            "answer": "The deductible is $1,500.",
            "agent_trace": [{"node": "classify", "status": "complete", "timing_ms": 40}]
        }));
        match record {
            StreamRecord::TerminalResponse(response) => {
                assert_eq!(response.intent, Intent::Rag);
                assert_eq!(response.agent_trace.len(), 1);
            }
            other => panic!("Expected terminal response, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_response_with_unknown_labels() {
        let record = classify_json(json!({
            "intent": "summarize",
            "answer": "Three claims were denied.",
            "sql": "SELECT * FROM claims WHERE status = 'denied'",
            "chart_type": "scatter",
            "agent_trace": []
        }));
        match record {
            StreamRecord::TerminalResponse(response) => {
                assert_eq!(response.intent, Intent::Other);
                assert_eq!(response.chart_type, Some(ChartType::Other));
                assert!(response.sql.is_some());
            }
            other => panic!("Expected terminal response, got {other:?}"),
        }
    }

    #[test]
    fn test_recoverable_error() {
        let record = classify_json(json!({"message": "upstream timeout", "recoverable": true}));
        assert_eq!(
            record,
            StreamRecord::RecoverableError {
                message: "upstream timeout".to_string(),
                recoverable: true,
            }
        );
    }

    #[test]
    fn test_message_without_recoverable_is_heartbeat() {
        assert_eq!(classify_json(json!({"message": "hi"})), StreamRecord::Heartbeat);
    }

    #[test]
    fn test_heartbeats_and_unknown_shapes() {
        assert_eq!(classify_json(json!({})), StreamRecord::Heartbeat);
        assert_eq!(classify_json(json!({"usage": 12})), StreamRecord::Heartbeat);
        assert_eq!(classify_json(json!("plain string")), StreamRecord::Heartbeat);
        assert_eq!(classify_json(json!([1, 2])), StreamRecord::Heartbeat);
    }

    #[test]
    fn test_trace_shape_wins_over_text() {
        let record = classify_json(json!({"node": "n", "status": "running", "text": "x"}));
        assert_eq!(record.kind(), "trace");
    }
}
