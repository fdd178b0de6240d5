//! Diagnostic Tools Module
//!
//! Schema-described, read-only inspection operations the model can call.
//! The registry owns the catalog; the inspector validates arguments against
//! each tool's schema and runs the call through a cluster backend.

pub mod inspector;
pub mod registry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which cluster inspection a tool maps to. The registry stays generic over
/// specs; the backend dispatches on this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolBinding {
    ListPods,
    PodStatus,
    PodLogs,
    DescribePod,
}

/// Value shape accepted for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Kubernetes object name or namespace; validated against the DNS-1123
    /// subdomain pattern before it goes anywhere near the cluster.
    Identifier,
    /// Free-form text.
    Text,
}

/// One parameter of a tool's argument schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

/// Immutable definition of a callable tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub binding: ToolBinding,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, binding: ToolBinding, description: &str) -> Self {
        Self {
            name: name.to_string(),
            binding,
            description: description.to_string(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Example argument object shown to the model in the tool catalog.
    pub fn example_input(&self) -> String {
        let fields: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("\"{}\": \"<{}>\"", p.name, p.name))
            .collect();
        format!("{{{}}}", fields.join(", "))
    }
}

/// Result from tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn failed(output: String) -> Self {
        Self {
            success: false,
            output,
        }
    }
}

/// Errors raised at the tool boundary before anything executes.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Cap text at `max_bytes` on a char boundary, marking the cut in the text
/// itself so the model knows it saw a prefix.
pub fn truncate_marked(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n… [output truncated]", &text[..end])
}
