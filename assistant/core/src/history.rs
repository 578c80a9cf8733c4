//! Chat History
//!
//! The durable record of a chat: an ordered, append-only list of messages.
//! The only non-append mutation is retry truncation, which drops the last
//! user message and whatever followed it.
//!
//! # Design Philosophy
//!
//! The streaming session is ephemeral. Nothing partial ever lands here; the
//! controller appends a message only when it is final (user prompt, finished
//! answer, or cancellation notice).

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::{AgentResponse, ChatMessage, Citation, Intent, MessageRole};

/// Ordered message history
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with the example exchanges shown on first load
    #[must_use]
    pub fn with_demo_conversation() -> Self {
        Self {
            messages: demo_conversation(),
        }
    }

    /// Append a message
    pub fn push(&mut self, message: ChatMessage) {
        tracing::trace!(role = ?message.role, len = message.content.len(), "History append");
        self.messages.push(message);
    }

    /// Remove the most recent user message and everything after it
    ///
    /// Returns the new length, or `None` if there is no user message (in
    /// which case nothing changes).
    pub fn truncate_before_last_user(&mut self) -> Option<usize> {
        let idx = self.messages.iter().rposition(|m| m.role == MessageRole::User)?;
        let removed = self.messages.len() - idx;
        self.messages.truncate(idx);

        tracing::debug!(
            removed = removed,
            remaining = self.messages.len(),
            "Truncated history for retry"
        );
        Some(idx)
    }

    /// All messages, oldest first
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The newest message
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The newest `count` messages
    #[must_use]
    pub fn recent(&self, count: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl From<Vec<ChatMessage>> for ChatHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

const DIAGNOSIS_ANSWER: &str = "Based on the claims data, here are the top 5 diagnosis codes by claim count:

1. **E11.9** - Type 2 diabetes without complications (342 claims)
2. **I10** - Essential hypertension (289 claims)
3. **M79.3** - Nonspecific back pain (267 claims)
4. **J45.909** - Unspecified asthma (234 claims)
5. **F41.1** - Generalized anxiety disorder (198 claims)

These conditions represent the most common diagnoses in our claims database.";

const DEDUCTIBLE_ANSWER: &str = "According to the plan documents, the **in-network annual deductible is $1,500 for individual coverage and $3,000 for family coverage**.

After meeting your deductible, you'll pay coinsurance (typically 20%) for most covered services. Some preventive services are covered at 100% with no deductible.";

fn demo_conversation() -> Vec<ChatMessage> {
    let now = Utc::now();
    let at = |secs_ago: i64| Some(now - Duration::seconds(secs_ago));

    let mut diagnosis = AgentResponse::new(Intent::Nl2Sql, DIAGNOSIS_ANSWER);
    diagnosis.timing_ms = Some(1245.0);

    let mut deductible = AgentResponse::new(Intent::Rag, DEDUCTIBLE_ANSWER);
    deductible.timing_ms = Some(876.0);
    deductible.citations = Some(vec![Citation {
        text: "Individual deductible: $1,500. Family deductible: $3,000. In-network services only."
            .to_string(),
        page: Some(3),
        doc_name: Some("benefits_summary.pdf".to_string()),
        score: Some(0.89),
    }]);

    vec![
        ChatMessage {
            timestamp: at(120),
            ..ChatMessage::user("What are the top 5 diagnosis codes by claim count?")
        },
        ChatMessage {
            timestamp: at(110),
            ..ChatMessage::from_response(diagnosis)
        },
        ChatMessage {
            timestamp: at(60),
            ..ChatMessage::user("What is the deductible for in-network services?")
        },
        ChatMessage {
            timestamp: at(55),
            ..ChatMessage::from_response(deductible)
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(history: &ChatHistory) -> Vec<&str> {
        history.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_push_keeps_order() {
        let mut history = ChatHistory::new();
        history.push(ChatMessage::user("First question"));
        history.push(ChatMessage::assistant("First answer"));
        assert_eq!(contents(&history), vec!["First question", "First answer"]);
        assert_eq!(history.last().map(|m| m.role), Some(MessageRole::Assistant));
    }

    #[test]
    fn test_truncate_before_last_user() {
        let mut history = ChatHistory::new();
        history.push(ChatMessage::user("q1"));
        history.push(ChatMessage::assistant("a1"));
        history.push(ChatMessage::user("q2"));
        history.push(ChatMessage::assistant("*Request cancelled*"));

        assert_eq!(history.truncate_before_last_user(), Some(2));
        assert_eq!(contents(&history), vec!["q1", "a1"]);
    }

    #[test]
    fn test_truncate_when_last_message_is_user() {
        let mut history = ChatHistory::new();
        history.push(ChatMessage::user("q1"));
        assert_eq!(history.truncate_before_last_user(), Some(0));
        assert!(history.is_empty());
    }

    #[test]
    fn test_truncate_without_user_message_is_noop() {
        let mut history = ChatHistory::new();
        history.push(ChatMessage::assistant("hello"));
        assert_eq!(history.truncate_before_last_user(), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_recent() {
        let history: ChatHistory = vec![
            ChatMessage::user("a"),
            ChatMessage::user("b"),
            ChatMessage::user("c"),
        ]
        .into();
        assert_eq!(history.recent(2).len(), 2);
        assert_eq!(history.recent(2)[0].content, "b");
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn test_demo_conversation() {
        let history = ChatHistory::with_demo_conversation();
        assert_eq!(history.len(), 4);

        let roles: Vec<_> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
                MessageRole::Assistant
            ]
        );

        let rag = history.messages()[3].response_data.as_ref().unwrap();
        assert_eq!(rag.intent, Intent::Rag);
        assert_eq!(rag.citations.as_ref().map(Vec::len), Some(1));

        let stamps: Vec<_> = history.messages().iter().map(|m| m.timestamp.unwrap()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
