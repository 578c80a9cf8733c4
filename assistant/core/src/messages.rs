//! Chat Messages and Agent Payloads
//!
//! Types shared between the backend wire protocol, the session controller and
//! UI surfaces. Field names follow the backend's JSON exactly so the same
//! structs decode stream records and history responses.
//!
//! # Design Philosophy
//!
//! The backend is the source of truth for answers. The client never edits an
//! `AgentResponse`; it only carries it from the terminal stream record into
//! the message history, where UI surfaces can render tables, charts, SQL and
//! citations from it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant answer (streamed or synthetic)
    Assistant,
}

/// A message in the chat history
///
/// Messages are immutable once appended to [`crate::history::ChatHistory`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message
    pub role: MessageRole,
    /// Rendered message text
    pub content: String,
    /// Structured answer payload, present on finalized assistant answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<AgentResponse>,
    /// When the message was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a user message stamped with the current time
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            response_data: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a plain assistant message stamped with the current time
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            response_data: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create an assistant message carrying the full structured answer
    pub fn from_response(response: AgentResponse) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: response.answer.clone(),
            response_data: Some(response),
            timestamp: Some(Utc::now()),
        }
    }

    /// Whether this is a user message
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// Status of one backend pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    /// Stage has started
    Running,
    /// Stage finished successfully
    Complete,
    /// Stage failed
    Error,
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Status update for one stage of the backend's answer pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Pipeline node name (e.g. `classify`, `generate_sql`, `synthesize`)
    pub node: String,
    /// Current status of the node
    pub status: TraceStatus,
    /// Optional node output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Elapsed time reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
}

impl TraceEvent {
    /// Create a trace event without result or timing
    pub fn new(node: impl Into<String>, status: TraceStatus) -> Self {
        Self {
            node: node.into(),
            status,
            result: None,
            timing_ms: None,
        }
    }

    /// Set the elapsed time
    #[must_use]
    pub fn with_timing(mut self, timing_ms: f64) -> Self {
        self.timing_ms = Some(timing_ms);
        self
    }
}

/// How the backend classified the question
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Answered by generating and running SQL over claims data
    #[serde(rename = "nl2sql")]
    Nl2Sql,
    /// Answered from plan documents
    #[serde(rename = "rag")]
    Rag,
    /// Backend needs the user to clarify
    #[serde(rename = "clarify")]
    Clarify,
    /// Any intent label this client does not know
    #[serde(other, rename = "other")]
    Other,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nl2Sql => write!(f, "nl2sql"),
            Self::Rag => write!(f, "rag"),
            Self::Clarify => write!(f, "clarify"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Chart hint for tabular answers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// Bar chart
    Bar,
    /// Line chart
    Line,
    /// Pie chart
    Pie,
    /// Any chart hint this client does not know
    #[serde(other)]
    Other,
}

/// A source passage backing a document answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Quoted passage
    pub text: String,
    /// Page number in the source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Source document name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_name: Option<String>,
    /// Retrieval score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// The structured terminal answer of a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Intent classification
    pub intent: Intent,
    /// Final answer text (markdown)
    pub answer: String,
    /// Generated SQL, for `nl2sql` answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Result rows of the generated SQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_results: Option<Vec<Map<String, Value>>>,
    /// Suggested chart for the result rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    /// Supporting passages, for `rag` answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    /// Finalized pipeline trace
    #[serde(default)]
    pub agent_trace: Vec<TraceEvent>,
    /// Total backend time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
    /// How many times SQL generation was retried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_retries: Option<u32>,
}

impl AgentResponse {
    /// Create a response with only intent and answer set
    pub fn new(intent: Intent, answer: impl Into<String>) -> Self {
        Self {
            intent,
            answer: answer.into(),
            sql: None,
            query_results: None,
            chart_type: None,
            citations: None,
            agent_trace: Vec::new(),
            timing_ms: None,
            sql_retries: None,
        }
    }
}

/// Conversation identifier
///
/// Generated once per controller and sent with every prompt so the backend
/// can keep multi-turn context.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Generate a new random conversation ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub query: String,
    /// Conversation the question belongs to
    pub conversation_id: ConversationId,
}

impl ChatRequest {
    /// Create a request for a conversation
    pub fn new(query: impl Into<String>, conversation_id: ConversationId) -> Self {
        Self {
            query: query.into(),
            conversation_id,
        }
    }
}

/// `GET /api/health` response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
    /// Claims database status
    pub duckdb: String,
    /// Document index details
    pub vectorstore: Map<String, Value>,
    /// LLM provider in use
    pub llm_provider: String,
    /// Whether AWS services are enabled
    pub aws_enabled: bool,
    /// Whether canned demo answers are enabled
    pub demo_mode: bool,
}

/// `GET /api/config` response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// LLM provider in use
    pub llm_provider: String,
    /// Anthropic model identifier
    pub anthropic_model_id: String,
    /// Bedrock model identifier
    pub bedrock_model_id: String,
    /// Retrieval engine
    pub rag_engine: String,
    /// Whether AWS services are enabled
    pub enable_aws: bool,
    /// Whether canned demo answers are enabled
    pub demo_mode: bool,
    /// Maximum SQL regeneration attempts
    pub sql_max_retries: u32,
}

/// `POST /api/upload/*` response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Stored file name
    pub filename: String,
    /// Outcome status
    pub status: String,
    /// Human-readable outcome
    pub message: String,
    /// Rows loaded, for CSV uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
}

/// `GET /api/chat/history/{id}` response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    /// Conversation the messages belong to
    pub conversation_id: ConversationId,
    /// Stored messages, oldest first
    pub messages: Vec<ChatMessage>,
}
