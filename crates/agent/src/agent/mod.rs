//! LLM Agent Module
//!
//! The ReAct reasoning runtime: prompt assembly, directive parsing, the
//! think/act/observe loop, and the per-question session plumbing around it.

pub mod directive;
pub mod engine;
pub mod prompts;
pub mod provider;
pub mod service;
pub mod session;
pub mod transcript;

pub use directive::Directive;
pub use engine::{EngineOutcome, ReactEngine};
pub use provider::{create_provider, LLMProvider, MockProvider};
pub use service::{AgentService, AskOutcome};
pub use session::AgentSession;
pub use transcript::{Transcript, TranscriptEntry};
