//! Answer Accumulation
//!
//! Concatenates answer fragments in arrival order. No normalization,
//! truncation or deduplication.

/// Running answer text for one streaming session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnswerAccumulator {
    text: String,
    fragments: usize,
}

impl AnswerAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    /// Text accumulated so far
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of fragments received
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Whether any text has arrived
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        self.text.clear();
        self.fragments = 0;
    }

    /// Take the accumulated text
    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}
