pub mod agent;
pub mod cluster;
pub mod config;
pub mod metrics;
pub mod server;
pub mod tools;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),
    #[error("Model communication error: {0}")]
    ModelCommunication(String),
    #[error("Request timed out after {0}s")]
    RequestTimeout(u64),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub use agent::service::{AgentService, AskOutcome};
pub use agent::transcript::{Transcript, TranscriptEntry};
pub use config::Config;
pub use tools::registry::ToolRegistry;
