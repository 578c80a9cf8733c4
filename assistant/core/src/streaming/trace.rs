//! Trace Reconciliation
//!
//! Keeps one entry per pipeline node. A later update for a node replaces the
//! earlier one at the same index, so stages keep their first-seen order while
//! they move from `running` to `complete` or `error`.

use crate::messages::TraceEvent;

/// Ordered, deduplicated trace list for one streaming session
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TraceList {
    events: Vec<TraceEvent>,
}

impl TraceList {
    /// Create an empty trace list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an update: replace in place by node, or append
    pub fn reconcile(&mut self, event: TraceEvent) {
        match self.events.iter_mut().find(|e| e.node == event.node) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    /// Latest event for a node
    #[must_use]
    pub fn get(&self, node: &str) -> Option<&TraceEvent> {
        self.events.iter().find(|e| e.node == node)
    }

    /// Events in first-appearance order
    #[must_use]
    pub fn as_slice(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Number of distinct nodes seen
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no node has reported yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forget every node
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Take the events out of the list
    #[must_use]
    pub fn into_vec(self) -> Vec<TraceEvent> {
        self.events
    }
}
