//! Streaming Answer Protocol
//!
//! Everything between the raw response body and the session controller.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  response body (bytes, arbitrary chunking)                        │
//! │              │                                                    │
//! │              ▼                                                    │
//! │  SseParser ──────► SseRecord { event_type, Text | Json }          │
//! │              │                                                    │
//! │              ▼                                                    │
//! │  StreamRecord::classify                                           │
//! │     ├── TraceUpdate ───────► TraceList::reconcile                 │
//! │     ├── AnswerFragment ────► AnswerAccumulator::push              │
//! │     ├── TerminalResponse ──► captured once by the controller      │
//! │     ├── RecoverableError ──► error channel                        │
//! │     └── Heartbeat ─────────► ignored                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use claims_chat_core::streaming::{SseParser, StreamRecord, TraceList};
//!
//! let mut parser = SseParser::new();
//! let mut trace = TraceList::new();
//! for record in parser.feed(b"data: {\"node\": \"classify\", \"status\": \"running\"}\n\n") {
//!     if let StreamRecord::TraceUpdate(event) = StreamRecord::classify(record) {
//!         trace.reconcile(event);
//!     }
//! }
//! assert_eq!(trace.len(), 1);
//! ```

mod answer;
mod parser;
mod record;
mod trace;

pub use answer::AnswerAccumulator;
pub use parser::{decode_records, SseParser, SsePayload, SseRecord, ANSWER_CHUNK_EVENT};
pub use record::StreamRecord;
pub use trace::TraceList;
