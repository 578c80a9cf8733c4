//! Chat Backend Traits
//!
//! Trait definition for the assistant backend. The session controller only
//! needs a way to open an answer stream; keeping that behind a trait lets the
//! controller run against the HTTP backend in production and scripted
//! backends in tests.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::TransportError;
use crate::messages::{AgentResponse, ChatRequest};

/// Raw response body of a streaming answer
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Chat backend trait
///
/// Implement this trait to drive the controller from a different transport.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Check if the backend is healthy and reachable
    async fn health_check(&self) -> bool;

    /// Send a query and open its server-sent event body
    ///
    /// Resolves once response headers arrive. A non-success status is an
    /// error; the body is not read in that case beyond the error text.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;

    /// Send a query and wait for the complete structured answer
    async fn send(&self, request: &ChatRequest) -> Result<AgentResponse, TransportError>;
}
