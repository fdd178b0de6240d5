//! Agent Session
//!
//! Per-question state: identity, the growing transcript, and timing. A
//! session lives on the request task's stack and is dropped once the
//! response is assembled; nothing is ever persisted.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::agent::transcript::Transcript;

#[derive(Debug)]
pub struct AgentSession {
    pub id: Uuid,
    pub question: String,
    pub namespace: String,
    pub transcript: Transcript,
    pub iterations: u32,
    pub started_at: DateTime<Utc>,
    pub finished: bool,
}

impl AgentSession {
    pub fn new(question: &str, namespace: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.to_string(),
            namespace: namespace.to_string(),
            transcript: Transcript::new(),
            iterations: 0,
            started_at: Utc::now(),
            finished: false,
        }
    }

    pub fn finish(&mut self, iterations: u32) {
        self.iterations = iterations;
        self.finished = true;
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
