//! Cluster Access Layer
//!
//! The inspector talks to the cluster through [`ClusterBackend`]; production
//! wiring uses the kube-client implementation, tests substitute mocks.

pub mod kube;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tools::ToolBinding;

pub use kube::KubeBackend;

/// A validated tool call, ready to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub binding: ToolBinding,
    /// Arguments already checked against the tool's schema.
    pub arguments: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(binding: ToolBinding, arguments: serde_json::Value) -> Self {
        Self { binding, arguments }
    }

    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).and_then(|v| v.as_str())
    }
}

/// Read-only window onto one cluster. Implementations return the report text
/// the model will see as an observation; errors become failed observations
/// upstream, never request failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> anyhow::Result<String>;
}
