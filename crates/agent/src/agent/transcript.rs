//! Investigation Transcript
//!
//! Ordered record of everything that happened while answering one question:
//! model thoughts, tool calls, tool results, and the final answer. The engine
//! appends entries as it runs; nothing here is ever mutated or reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step in an investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEntry {
    /// Free-form reasoning emitted by the model before deciding what to do.
    Thought { text: String },
    /// A tool the model chose to call, with the arguments it supplied.
    Action {
        tool: String,
        arguments: serde_json::Value,
    },
    /// What came back from a tool call, or a protocol failure fed back to
    /// the model. `succeeded` is false for timeouts, execution errors, and
    /// unparseable model output.
    Observation { text: String, succeeded: bool },
    /// The model's concluding answer. Always the last entry when present.
    FinalAnswer { text: String },
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::Thought { text } => write!(f, "Thought: {}", text),
            TranscriptEntry::Action { tool, arguments } => {
                write!(f, "Action: {}\nAction Input: {}", tool, arguments)
            }
            TranscriptEntry::Observation { text, .. } => write!(f, "Observation: {}", text),
            TranscriptEntry::FinalAnswer { text } => write!(f, "Final Answer: {}", text),
        }
    }
}

/// Append-only sequence of [`TranscriptEntry`] values for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries are never removed or reordered afterwards.
    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// Ordered view of all entries so far.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The concluding answer, if the investigation reached one.
    pub fn final_answer(&self) -> Option<&str> {
        match self.entries.last() {
            Some(TranscriptEntry::FinalAnswer { text }) => Some(text),
            _ => None,
        }
    }

    /// Distinct tool names in first-use order.
    pub fn tools_used(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if let TranscriptEntry::Action { tool, .. } = entry {
                if !seen.iter().any(|t| t == tool) {
                    seen.push(tool.clone());
                }
            }
        }
        seen
    }
}
