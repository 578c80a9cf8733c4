//! Plain-text rendering of chat updates and messages
//!
//! Rendering is pure: [`UpdateRenderer`] turns each [`ChatUpdate`] into the
//! text to write and where to write it. The caller owns the actual output
//! handles.

use claims_chat_core::{AgentResponse, ChatMessage, ChatUpdate, MessageRole, TraceEvent};
use serde_json::Value;

/// Rows of a query result shown before eliding the rest
const MAX_RESULT_ROWS: usize = 10;

/// Where a piece of rendered text goes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Answer text
    Stdout(String),
    /// Progress, trace and error text
    Stderr(String),
}

/// Stateful renderer for one update stream
#[derive(Debug)]
pub struct UpdateRenderer {
    width: usize,
    show_user: bool,
    streamed: String,
    trace: Vec<TraceEvent>,
}

impl UpdateRenderer {
    /// Create a renderer wrapping at `width` columns
    pub fn new(width: usize) -> Self {
        Self {
            width,
            show_user: false,
            streamed: String::new(),
            trace: Vec::new(),
        }
    }

    /// Also render user messages as they are appended
    pub fn with_user_messages(mut self) -> Self {
        self.show_user = true;
        self
    }

    /// Render one update
    pub fn render(&mut self, update: &ChatUpdate) -> Vec<Output> {
        match update {
            ChatUpdate::Trace { trace } => self.render_trace(trace),
            ChatUpdate::Answer { text } => self.render_answer(text),
            ChatUpdate::MessageAppended { message } => self.render_appended(message),
            ChatUpdate::Error {
                message,
                recoverable,
            } => {
                let hint = if *recoverable { " (use /retry to try again)" } else { "" };
                let lead = if self.streamed.is_empty() { "" } else { "\n" };
                vec![Output::Stderr(format!("{lead}error: {message}{hint}\n"))]
            }
            ChatUpdate::HistoryTruncated { .. } => {
                vec![Output::Stderr("Retrying...\n".to_string())]
            }
            ChatUpdate::State { .. } | ChatUpdate::ErrorCleared => Vec::new(),
        }
    }

    /// Print only stages that are new or whose status changed
    fn render_trace(&mut self, trace: &[TraceEvent]) -> Vec<Output> {
        let changed: Vec<Output> = trace
            .iter()
            .filter(|event| {
                !self
                    .trace
                    .iter()
                    .any(|seen| seen.node == event.node && seen.status == event.status)
            })
            .map(|event| Output::Stderr(format!("{}\n", trace_line(event))))
            .collect();

        self.trace = trace.to_vec();
        changed
    }

    fn render_answer(&mut self, text: &str) -> Vec<Output> {
        if text.is_empty() {
            self.streamed.clear();
            return Vec::new();
        }

        let fresh = text.strip_prefix(self.streamed.as_str()).unwrap_or(text);
        self.streamed = text.to_string();
        if fresh.is_empty() {
            Vec::new()
        } else {
            vec![Output::Stdout(fresh.to_string())]
        }
    }

    fn render_appended(&mut self, message: &ChatMessage) -> Vec<Output> {
        if message.role == MessageRole::User {
            return if self.show_user {
                vec![Output::Stdout(render_message(message, self.width))]
            } else {
                Vec::new()
            };
        }

        let streamed = std::mem::take(&mut self.streamed);
        if streamed.is_empty() {
            return vec![Output::Stdout(render_message(message, self.width))];
        }

        if message.content.trim() == streamed.trim() {
            let mut out = String::from("\n");
            if let Some(response) = &message.response_data {
                out.push_str(&render_details(response));
            }
            out.push('\n');
            vec![Output::Stdout(out)]
        } else {
            vec![Output::Stdout(format!(
                "\n\n{}",
                render_message(message, self.width)
            ))]
        }
    }
}

/// One line describing a pipeline stage
pub fn trace_line(event: &TraceEvent) -> String {
    match event.timing_ms {
        Some(ms) => format!("  [{}] {} ({:.0} ms)", event.status, event.node, ms),
        None => format!("  [{}] {}", event.status, event.node),
    }
}

/// Render a complete message with its header and structured details
pub fn render_message(message: &ChatMessage, width: usize) -> String {
    let mut out = match message.role {
        MessageRole::User => String::from("You:"),
        MessageRole::Assistant => String::from("Assistant:"),
    };

    if let Some(response) = &message.response_data {
        out.push_str(&format!(" [{}]", response.intent));
        if let Some(ms) = response.timing_ms {
            out.push_str(&format!(" ({ms:.0} ms)"));
        }
    }
    out.push('\n');

    for line in textwrap::wrap(&message.content, width.max(20)) {
        out.push_str(&line);
        out.push('\n');
    }

    if let Some(response) = &message.response_data {
        out.push_str(&render_details(response));
    }
    out.push('\n');
    out
}

/// SQL, result rows and citations of a structured answer
pub fn render_details(response: &AgentResponse) -> String {
    let mut out = String::new();

    if let Some(sql) = &response.sql {
        out.push_str("\nSQL:\n");
        for line in sql.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        if let Some(retries) = response.sql_retries.filter(|&n| n > 0) {
            out.push_str(&format!("    (regenerated {retries} time(s))\n"));
        }
    }

    if let Some(rows) = &response.query_results {
        out.push_str(&format!("\nResults ({} rows):\n", rows.len()));
        for row in rows.iter().take(MAX_RESULT_ROWS) {
            let cells: Vec<String> = row
                .iter()
                .map(|(column, value)| format!("{column}={}", cell(value)))
                .collect();
            out.push_str("  ");
            out.push_str(&cells.join(", "));
            out.push('\n');
        }
        if rows.len() > MAX_RESULT_ROWS {
            out.push_str(&format!("  ... and {} more\n", rows.len() - MAX_RESULT_ROWS));
        }
    }

    if let Some(citations) = response.citations.as_ref().filter(|c| !c.is_empty()) {
        out.push_str("\nSources:\n");
        for (i, citation) in citations.iter().enumerate() {
            let mut source = citation
                .doc_name
                .clone()
                .unwrap_or_else(|| "document".to_string());
            if let Some(page) = citation.page {
                source.push_str(&format!(", p. {page}"));
            }
            if let Some(score) = citation.score {
                source.push_str(&format!(" (score {score:.2})"));
            }
            out.push_str(&format!("  [{}] {source}\n", i + 1));
        }
    }

    out
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
