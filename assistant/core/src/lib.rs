//! Claims Chat Core - Headless Streaming Client for the Claims Assistant
//!
//! This crate provides the chat-session logic for the claims assistant,
//! independent of any UI. It sends a question to the backend, consumes the
//! server-sent event stream that comes back, and turns it into a live trace
//! of the agent's pipeline, an incrementally growing answer, and finally one
//! durable assistant message.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        UI Surfaces                               │
//! │        ┌─────────────┐          ┌───────────────────────┐        │
//! │        │  CLI / REPL │          │  Headless / Tests     │        │
//! │        └──────┬──────┘          └───────────┬───────────┘        │
//! │               └──────────────┬──────────────┘                    │
//! │              submit / cancel / retry (down)                      │
//! │                     ChatUpdate (up)                              │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┼───────────────────────────────────┐
//! │                      CLAIMS CHAT CORE                            │
//! │  ┌───────────────────────────┴─────────────────────────────────┐ │
//! │  │                     ChatController                          │ │
//! │  │  ┌──────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐ │ │
//! │  │  │ History  │  │ TraceList │  │  Answer   │  │  Backend   │ │ │
//! │  │  │          │  │           │  │Accumulator│  │  (HTTP)    │ │ │
//! │  │  └──────────┘  └───────────┘  └───────────┘  └────────────┘ │ │
//! │  └─────────────────────────────────────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatController`]: Runs one streaming session at a time and owns the history
//! - [`ChatUpdate`]: Updates sent from the controller to UI surfaces
//! - [`ChatBackend`]: Transport seam; [`HttpBackend`] talks to the REST API
//! - [`SseParser`]: Incremental server-sent event parser
//! - [`StreamRecord`]: A parsed record classified by shape
//!
//! # Quick Start
//!
//! ```ignore
//! use claims_chat_core::{ChatController, ControllerConfig, HttpBackend};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(256);
//!     let backend = HttpBackend::new("http://localhost:8000").unwrap();
//!     let mut controller = ChatController::new(backend, ControllerConfig::default(), tx);
//!
//!     tokio::spawn(async move {
//!         while let Some(update) = rx.recv().await {
//!             // Render update
//!         }
//!     });
//!
//!     let outcome = controller.submit("What is the in-network deductible?").await;
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Backend abstraction and the HTTP client
//! - [`config`]: Layered client configuration
//! - [`controller`]: Stream session controller
//! - [`error`]: Transport and submit errors
//! - [`history`]: Durable message history
//! - [`messages`]: Wire and history data types
//! - [`streaming`]: Event-stream parsing, trace reconciliation, answer accumulation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod messages;
pub mod streaming;

// Re-exports for convenience
pub use backend::{ByteStream, ChatBackend, HttpBackend, UploadKind};
pub use controller::{
    Canceller, ChatController, ChatUpdate, ControllerConfig, SessionOutcome, SessionState,
    CANCELLED_MESSAGE,
};
pub use error::{SubmitError, TransportError};
pub use history::ChatHistory;
pub use messages::{
    AgentResponse, ChartType, ChatMessage, ChatRequest, Citation, ConfigResponse,
    ConversationHistory, ConversationId, HealthResponse, Intent, MessageRole, TraceEvent,
    TraceStatus, UploadResponse,
};
pub use streaming::{AnswerAccumulator, SseParser, SsePayload, SseRecord, StreamRecord, TraceList};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ClientToml,
    ConfigError, ConfigOverrides, ConfigSource,
};
