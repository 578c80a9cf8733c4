//! Assistant Backend Integration
//!
//! This module provides access to the claims assistant backend through a
//! common trait interface.
//!
//! # Available Backends
//!
//! - **HTTP**: the assistant's REST + server-sent events API (default)
//!
//! # Usage
//!
//! ```ignore
//! use claims_chat_core::backend::{ChatBackend, HttpBackend};
//! use claims_chat_core::messages::{ChatRequest, ConversationId};
//!
//! let backend = HttpBackend::new("http://localhost:8000")?;
//! let request = ChatRequest::new("What is the deductible?", ConversationId::new());
//! let body = backend.open_stream(&request).await?;
//! ```

mod http;
mod traits;

pub use http::{HttpBackend, UploadKind};
pub use traits::{ByteStream, ChatBackend};
