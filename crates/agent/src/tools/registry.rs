//! Tool Registry
//!
//! Startup-time catalog of the tools the model may call. Registration order
//! is preserved so the prompt's tool list is stable run to run.

use crate::tools::{ParamKind, ParamSpec, ToolBinding, ToolError, ToolSpec};

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool definition. Names are unique; registering a name twice is
    /// a wiring bug and is rejected.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), ToolError> {
        if self.tools.iter().any(|t| t.name == spec.name) {
            return Err(ToolError::DuplicateTool(spec.name));
        }
        self.tools.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ToolSpec, ToolError> {
        self.tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One line per tool, the way the prompt's catalog section shows them.
    pub fn describe_for_prompt(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {} Input: {}", t.name, t.description, t.example_input()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Comma-separated tool names for the format section of the prompt.
    pub fn tool_names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The standard pod-diagnostics tool set.
    pub fn diagnostic_tools() -> Self {
        let tools = vec![
            ToolSpec::new(
                "list_pods",
                ToolBinding::ListPods,
                "List all pods in a namespace with phase and container issues.",
            )
            .with_param(ParamSpec::optional(
                "namespace",
                ParamKind::Identifier,
                "Namespace to list; defaults to the configured namespace.",
            )),
            ToolSpec::new(
                "get_pod_status",
                ToolBinding::PodStatus,
                "Get a pod's phase, restart counts and per-container state.",
            )
            .with_param(ParamSpec::required(
                "pod_name",
                ParamKind::Identifier,
                "Exact pod name.",
            ))
            .with_param(ParamSpec::optional(
                "namespace",
                ParamKind::Identifier,
                "Namespace of the pod; defaults to the configured namespace.",
            )),
            ToolSpec::new(
                "get_pod_logs",
                ToolBinding::PodLogs,
                "Fetch recent logs for a pod; falls back to the previous container after a crash.",
            )
            .with_param(ParamSpec::required(
                "pod_name",
                ParamKind::Identifier,
                "Exact pod name.",
            ))
            .with_param(ParamSpec::optional(
                "namespace",
                ParamKind::Identifier,
                "Namespace of the pod; defaults to the configured namespace.",
            )),
            ToolSpec::new(
                "describe_pod",
                ToolBinding::DescribePod,
                "Show recent Kubernetes events for a pod.",
            )
            .with_param(ParamSpec::required(
                "pod_name",
                ParamKind::Identifier,
                "Exact pod name.",
            ))
            .with_param(ParamSpec::optional(
                "namespace",
                ParamKind::Identifier,
                "Namespace of the pod; defaults to the configured namespace.",
            )),
        ];
        Self { tools }
    }
}
