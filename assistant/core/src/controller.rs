//! Stream Session Controller
//!
//! The controller owns the chat history and runs one request/response cycle
//! at a time:
//!
//! ```text
//! idle ──submit──► streaming ──► finalized | cancelled | errored ──► idle
//! ```
//!
//! It appends the user message up front, opens the answer stream, feeds each
//! classified record to the trace list or the answer accumulator, and on
//! stream end turns the result into at most one assistant message. Every
//! state change is pushed to the UI surface as a [`ChatUpdate`].
//!
//! # Design Philosophy
//!
//! The controller is UI-agnostic. Surfaces render the updates they receive
//! and call `submit`, `cancel`, `retry` and `clear_error`; they never touch
//! the stream themselves.
//!
//! Exclusivity is enforced by the borrow checker: `submit` takes `&mut self`,
//! so a second submit cannot start while one is running. Cancellation goes
//! through a [`Canceller`] handle obtained beforehand.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::ChatBackend;
use crate::config::ClientConfig;
use crate::error::{SubmitError, TransportError};
use crate::history::ChatHistory;
use crate::messages::{AgentResponse, ChatMessage, ChatRequest, ConversationId, TraceEvent};
use crate::streaming::{decode_records, AnswerAccumulator, StreamRecord, TraceList};

/// Content of the synthetic assistant message appended on cancellation
pub const CANCELLED_MESSAGE: &str = "*Request cancelled*";

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Maximum query length in bytes
    pub max_query_length: usize,
    /// Seed the history with the demo conversation
    pub seed_demo_history: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ControllerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_query_length: config.max_query_length,
            seed_demo_history: config.seed_demo_history,
        }
    }
}

/// Session lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Ready for input
    Idle,
    /// Answer stream is open
    Streaming,
    /// Stream ended normally
    Finalized,
    /// User cancelled the stream
    Cancelled,
    /// Transport failure ended the stream
    Errored,
}

impl SessionState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Streaming => "Answering...",
            Self::Finalized => "Done",
            Self::Cancelled => "Cancelled",
            Self::Errored => "Failed",
        }
    }
}

/// How a submitted session ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stream ended normally
    Finalized {
        /// Whether an assistant message was appended
        appended: bool,
    },
    /// User cancelled; a cancellation notice was appended
    Cancelled,
    /// Transport failure; nothing was appended
    Failed {
        /// Displayable failure message
        message: String,
    },
}

/// Updates sent from the controller to the UI surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChatUpdate {
    /// Session state changed
    State {
        /// The new state
        state: SessionState,
    },
    /// A message was appended to the history
    MessageAppended {
        /// The appended message
        message: ChatMessage,
    },
    /// Reconciled trace of the current session
    Trace {
        /// Trace events in first-appearance order
        trace: Vec<TraceEvent>,
    },
    /// Answer text accumulated so far in the current session
    Answer {
        /// Full accumulated text
        text: String,
    },
    /// An error to display
    Error {
        /// Displayable message
        message: String,
        /// Whether it came from the backend mid-stream (retryable)
        recoverable: bool,
    },
    /// The displayed error was dismissed
    ErrorCleared,
    /// History was truncated for a retry
    HistoryTruncated {
        /// New history length
        len: usize,
    },
}

/// Cloneable handle that cancels the active session
#[derive(Clone, Debug, Default)]
pub struct Canceller {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Canceller {
    /// Cancel the active session
    ///
    /// Returns `false` if no session is active.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a session is currently active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    fn current(&self) -> Option<CancellationToken> {
        self.active.lock().clone()
    }

    fn activate(&self, token: CancellationToken) -> ActiveSession {
        *self.active.lock() = Some(token);
        ActiveSession {
            active: Arc::clone(&self.active),
        }
    }
}

/// Clears the active token when the session ends, even if the submit future is dropped
struct ActiveSession {
    active: Arc<Mutex<Option<CancellationToken>>>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.active.lock().take();
    }
}

/// Transient per-request state
#[derive(Default)]
struct StreamSession {
    trace: TraceList,
    answer: AnswerAccumulator,
    terminal: Option<AgentResponse>,
    records: usize,
}

/// Why the read loop stopped early
enum SessionEnd {
    Cancelled,
    Transport(TransportError),
}

impl From<TransportError> for SessionEnd {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// The chat session controller
pub struct ChatController<B: ChatBackend> {
    /// Configuration
    config: ControllerConfig,
    /// Assistant backend
    backend: Arc<B>,
    /// Conversation identifier sent with every prompt
    conversation_id: ConversationId,
    /// Durable message history
    history: ChatHistory,
    /// Current lifecycle state
    state: SessionState,
    /// Error currently surfaced to the user
    error: Option<String>,
    /// Last submitted query, for retry
    last_query: Option<String>,
    /// Cancellation slot shared with handles
    canceller: Canceller,
    /// Channel to the UI surface
    tx: mpsc::Sender<ChatUpdate>,
}

impl<B: ChatBackend + 'static> ChatController<B> {
    /// Create a controller with a fresh conversation identifier
    ///
    /// The surface must keep draining `tx`'s receiver: a full channel holds
    /// the session back until there is room. Once a session is cancelled,
    /// updates that do not fit are dropped so cancellation never waits on
    /// the surface.
    pub fn new(backend: B, config: ControllerConfig, tx: mpsc::Sender<ChatUpdate>) -> Self {
        Self::with_conversation(backend, config, ConversationId::new(), tx)
    }

    /// Create a controller for an existing conversation
    pub fn with_conversation(
        backend: B,
        config: ControllerConfig,
        conversation_id: ConversationId,
        tx: mpsc::Sender<ChatUpdate>,
    ) -> Self {
        let history = if config.seed_demo_history {
            ChatHistory::with_demo_conversation()
        } else {
            ChatHistory::new()
        };

        Self {
            config,
            backend: Arc::new(backend),
            conversation_id,
            history,
            state: SessionState::Idle,
            error: None,
            last_query: None,
            canceller: Canceller::default(),
            tx,
        }
    }

    /// Get the conversation identifier
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Get the message history
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the surfaced error, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get the last submitted query
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Whether a session is streaming
    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get a handle that can cancel sessions while `submit` is running
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Cancel the active session, if any
    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }

    /// Submit a query and drive its answer stream to completion
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] if the query is blank or too long. Nothing is
    /// appended to the history in that case. Transport failures are not
    /// errors here; they are reported as [`SessionOutcome::Failed`].
    pub async fn submit(&mut self, query: impl Into<String>) -> Result<SessionOutcome, SubmitError> {
        let query = query.into();
        self.validate_query(&query)?;

        self.last_query = Some(query.clone());
        if self.error.take().is_some() {
            self.send(ChatUpdate::ErrorCleared).await;
        }

        self.append(ChatMessage::user(query.clone())).await;

        let token = CancellationToken::new();
        let active = self.canceller.activate(token.clone());
        let started = Instant::now();

        self.set_state(SessionState::Streaming).await;
        self.send(ChatUpdate::Trace { trace: Vec::new() }).await;
        self.send(ChatUpdate::Answer {
            text: String::new(),
        })
        .await;

        let request = ChatRequest::new(query, self.conversation_id.clone());
        let mut session = StreamSession::default();
        let result = self.run_session(&request, &token, &mut session).await;

        let (outcome, end_state) = match result {
            Ok(()) => {
                let appended = self.finalize(&mut session).await;
                (SessionOutcome::Finalized { appended }, SessionState::Finalized)
            }
            Err(SessionEnd::Cancelled) => {
                self.append(ChatMessage::assistant(CANCELLED_MESSAGE)).await;
                (SessionOutcome::Cancelled, SessionState::Cancelled)
            }
            Err(SessionEnd::Transport(e)) => {
                let message = e.to_string();
                tracing::warn!(error = %e, "Answer stream failed");
                self.error = Some(message.clone());
                self.send(ChatUpdate::Error {
                    message: message.clone(),
                    recoverable: false,
                })
                .await;
                (SessionOutcome::Failed { message }, SessionState::Errored)
            }
        };

        tracing::info!(
            outcome = ?outcome,
            records = session.records,
            trace_nodes = session.trace.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session finished"
        );

        self.set_state(end_state).await;

        // Back to idle: transient state is discarded whatever the outcome.
        self.send(ChatUpdate::Trace { trace: Vec::new() }).await;
        self.send(ChatUpdate::Answer {
            text: String::new(),
        })
        .await;
        self.set_state(SessionState::Idle).await;
        drop(active);

        Ok(outcome)
    }

    /// Drop the last user message (and what followed) and resubmit its query
    ///
    /// Returns `Ok(None)` without doing anything if nothing was submitted yet.
    ///
    /// # Errors
    ///
    /// Propagates [`SubmitError`] from the resubmission.
    pub async fn retry(&mut self) -> Result<Option<SessionOutcome>, SubmitError> {
        let Some(query) = self.last_query.clone() else {
            tracing::debug!("Retry requested with no previous query");
            return Ok(None);
        };

        if let Some(len) = self.history.truncate_before_last_user() {
            self.send(ChatUpdate::HistoryTruncated { len }).await;
        }

        self.submit(query).await.map(Some)
    }

    /// Dismiss the surfaced error
    pub async fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.send(ChatUpdate::ErrorCleared).await;
        }
    }

    fn validate_query(&self, query: &str) -> Result<(), SubmitError> {
        if query.trim().is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        if query.len() > self.config.max_query_length {
            return Err(SubmitError::TooLong {
                len: query.len(),
                max: self.config.max_query_length,
            });
        }
        Ok(())
    }

    /// Open the stream and process records until it ends, fails or is cancelled
    async fn run_session(
        &mut self,
        request: &ChatRequest,
        token: &CancellationToken,
        session: &mut StreamSession,
    ) -> Result<(), SessionEnd> {
        let backend = Arc::clone(&self.backend);

        let body = tokio::select! {
            biased;
            () = token.cancelled() => return Err(SessionEnd::Cancelled),
            result = backend.open_stream(request) => result?,
        };

        let records = decode_records(body);
        tokio::pin!(records);

        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Err(SessionEnd::Cancelled),
                next = records.next() => next,
            };

            match next {
                Some(Ok(record)) => {
                    session.records += 1;
                    self.dispatch(StreamRecord::classify(record), session).await;
                }
                Some(Err(e)) => return Err(SessionEnd::Transport(e)),
                None => return Ok(()),
            }
        }
    }

    async fn dispatch(&mut self, record: StreamRecord, session: &mut StreamSession) {
        tracing::debug!(kind = record.kind(), "Stream record");

        if session.terminal.is_some() {
            if matches!(record, StreamRecord::TerminalResponse(_)) {
                tracing::warn!("Ignoring duplicate terminal response");
            }
            return;
        }

        match record {
            StreamRecord::TraceUpdate(event) => {
                session.trace.reconcile(event);
                self.send(ChatUpdate::Trace {
                    trace: session.trace.as_slice().to_vec(),
                })
                .await;
            }
            StreamRecord::AnswerFragment(fragment) => {
                session.answer.push(&fragment);
                self.send(ChatUpdate::Answer {
                    text: session.answer.as_str().to_string(),
                })
                .await;
            }
            StreamRecord::TerminalResponse(response) => {
                tracing::debug!(intent = %response.intent, "Terminal response received");
                session.terminal = Some(*response);
            }
            StreamRecord::RecoverableError {
                message,
                recoverable,
            } => {
                tracing::warn!(error = %message, recoverable, "Backend reported error");
                self.error = Some(message.clone());
                self.send(ChatUpdate::Error {
                    message,
                    recoverable,
                })
                .await;
            }
            StreamRecord::Heartbeat => {}
        }
    }

    /// Turn a normally ended session into at most one assistant message
    async fn finalize(&mut self, session: &mut StreamSession) -> bool {
        if let Some(response) = session.terminal.take() {
            self.append(ChatMessage::from_response(response)).await;
            true
        } else if !session.answer.is_empty() {
            let text = std::mem::take(&mut session.answer).into_string();
            self.append(ChatMessage::assistant(text)).await;
            true
        } else {
            false
        }
    }

    async fn append(&mut self, message: ChatMessage) {
        self.history.push(message.clone());
        self.send(ChatUpdate::MessageAppended { message }).await;
    }

    async fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.send(ChatUpdate::State { state }).await;
    }

    /// Send an update, waiting for room unless the active session is cancelled
    async fn send(&self, update: ChatUpdate) {
        let Some(token) = self.canceller.current() else {
            if let Err(e) = self.tx.send(update).await {
                tracing::warn!("Failed to send update to surface: {}", e);
            }
            return;
        };

        tokio::select! {
            biased;
            permit = self.tx.reserve() => match permit {
                Ok(permit) => permit.send(update),
                Err(e) => tracing::warn!("Failed to send update to surface: {}", e),
            },
            () = token.cancelled() => {
                if let Err(e) = self.tx.try_send(update) {
                    tracing::debug!("Dropping update after cancellation: {}", e);
                }
            }
        }
    }
}
