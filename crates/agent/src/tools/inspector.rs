//! Cluster Inspector
//!
//! Gatekeeper between the reasoning loop and the cluster. Looks the tool up,
//! validates arguments strictly against its schema, then executes through the
//! backend with a hard timeout and a cap on output size.
//!
//! Execution failures (timeouts, API errors) are not errors here: they come
//! back as unsuccessful [`ToolResult`]s so the model can read them and adjust.
//! Only unknown tools and schema violations surface as [`ToolError`]s.

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cluster::{ClusterBackend, ToolInvocation};
use crate::config::ClusterConfig;
use crate::metrics;
use crate::tools::{truncate_marked, ParamKind, ToolError, ToolResult, ToolSpec};
use crate::ToolRegistry;

lazy_static! {
    // DNS-1123 subdomain; also keeps names out of field-selector syntax.
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[a-z0-9]([a-z0-9.-]*[a-z0-9])?$").unwrap();
}

pub struct ClusterInspector {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn ClusterBackend>,
    tool_timeout: Duration,
    max_output_bytes: usize,
}

impl ClusterInspector {
    pub fn new(
        registry: Arc<ToolRegistry>,
        backend: Arc<dyn ClusterBackend>,
        config: &ClusterConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            max_output_bytes: config.max_output_bytes,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one tool call. `Err` means the call never executed; an
    /// unsuccessful `Ok` means it executed (or timed out) and the output
    /// says what went wrong.
    pub async fn invoke(&self, tool_name: &str, arguments: &Value) -> Result<ToolResult, ToolError> {
        let spec = self.registry.get(tool_name)?;
        validate_arguments(spec, arguments)?;

        debug!("invoking tool '{}' with {}", tool_name, arguments);
        let invocation = ToolInvocation::new(spec.binding, arguments.clone());
        let (result, outcome) =
            match tokio::time::timeout(self.tool_timeout, self.backend.run(&invocation)).await {
                Ok(Ok(output)) => (
                    ToolResult::ok(truncate_marked(&output, self.max_output_bytes)),
                    "success",
                ),
                Ok(Err(e)) => {
                    warn!("tool '{}' failed: {}", tool_name, e);
                    (ToolResult::failed(format!("Error: {}", e)), "failure")
                }
                Err(_) => {
                    warn!(
                        "tool '{}' timed out after {}s",
                        tool_name,
                        self.tool_timeout.as_secs()
                    );
                    (
                        ToolResult::failed(format!(
                            "Tool '{}' timed out after {}s",
                            tool_name,
                            self.tool_timeout.as_secs()
                        )),
                        "timeout",
                    )
                }
            };

        metrics::TOOL_INVOCATIONS_TOTAL
            .with_label_values(&[tool_name, outcome])
            .inc();
        Ok(result)
    }
}

/// Strict schema check: JSON object, no unknown keys, required keys present,
/// string values only, identifiers shaped like Kubernetes names.
fn validate_arguments(spec: &ToolSpec, arguments: &Value) -> Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        tool: spec.name.clone(),
        reason,
    };

    let Some(object) = arguments.as_object() else {
        return Err(invalid(format!(
            "expected a JSON object, got {}",
            json_kind(arguments)
        )));
    };

    for key in object.keys() {
        if !spec.params.iter().any(|p| p.name == *key) {
            return Err(invalid(format!("unexpected argument '{}'", key)));
        }
    }

    for param in &spec.params {
        match object.get(&param.name) {
            None if param.required => {
                return Err(invalid(format!("missing required argument '{}'", param.name)));
            }
            None => {}
            Some(value) => {
                let Some(text) = value.as_str() else {
                    return Err(invalid(format!(
                        "argument '{}' must be a string, got {}",
                        param.name,
                        json_kind(value)
                    )));
                };
                match param.kind {
                    ParamKind::Identifier => {
                        if text.len() > 253 || !IDENTIFIER_RE.is_match(text) {
                            return Err(invalid(format!(
                                "argument '{}' is not a valid Kubernetes name",
                                param.name
                            )));
                        }
                    }
                    ParamKind::Text => {
                        if text.trim().is_empty() {
                            return Err(invalid(format!(
                                "argument '{}' must not be empty",
                                param.name
                            )));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterBackend;
    use crate::tools::ToolBinding;
    use serde_json::json;

    fn inspector_for(backend: Arc<dyn ClusterBackend>, timeout_secs: u64) -> ClusterInspector {
        let config = ClusterConfig {
            default_namespace: "default".to_string(),
            tool_timeout_secs: timeout_secs,
            max_output_bytes: 4096,
            log_tail_lines: 50,
        };
        ClusterInspector::new(Arc::new(ToolRegistry::diagnostic_tools()), backend, &config)
    }

    fn inspector_with(backend: MockClusterBackend, timeout_secs: u64) -> ClusterInspector {
        inspector_for(Arc::new(backend), timeout_secs)
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected_before_execution() {
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let inspector = inspector_with(backend, 15);

        let err = inspector.invoke("drain_node", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "drain_node"));
    }

    #[tokio::test]
    async fn argument_violations_are_rejected_before_execution() {
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let inspector = inspector_with(backend, 15);

        let cases: Vec<(&str, Value, &str)> = vec![
            ("get_pod_logs", json!("web-1"), "expected a JSON object"),
            ("get_pod_logs", json!({}), "missing required argument 'pod_name'"),
            (
                "get_pod_logs",
                json!({"pod_name": "web-1", "container": "app"}),
                "unexpected argument 'container'",
            ),
            (
                "get_pod_logs",
                json!({"pod_name": 42}),
                "argument 'pod_name' must be a string",
            ),
            (
                "get_pod_logs",
                json!({"pod_name": ""}),
                "not a valid Kubernetes name",
            ),
            (
                "get_pod_logs",
                json!({"pod_name": "web-1", "namespace": "kube;rm -rf"}),
                "not a valid Kubernetes name",
            ),
            (
                "describe_pod",
                json!({"pod_name": "web-1,involvedObject.namespace=kube-system"}),
                "not a valid Kubernetes name",
            ),
        ];

        for (tool, arguments, expected) in cases {
            match inspector.invoke(tool, &arguments).await {
                Err(ToolError::InvalidArguments { reason, .. }) => {
                    assert!(
                        reason.contains(expected),
                        "args {} should mention '{}', got '{}'",
                        arguments,
                        expected,
                        reason
                    );
                }
                other => panic!("args {} should be invalid, got {:?}", arguments, other),
            }
        }
    }

    #[tokio::test]
    async fn successful_run_passes_output_through() {
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .withf(|inv: &ToolInvocation| {
                inv.binding == ToolBinding::ListPods
                    && inv.str_arg("namespace") == Some("prod")
            })
            .returning(|_| Ok("Pods in namespace 'prod':\n  • web-1: Running - Healthy\n".into()));
        let inspector = inspector_with(backend, 15);

        let result = inspector
            .invoke("list_pods", &json!({"namespace": "prod"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.contains("web-1"));
    }

    #[tokio::test]
    async fn backend_errors_become_failed_results() {
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .returning(|_| Err(anyhow::anyhow!("pods \"ghost\" not found")));
        let inspector = inspector_with(backend, 15);

        let result = inspector
            .invoke("get_pod_status", &json!({"pod_name": "ghost"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("Error: pods \"ghost\" not found"));
    }

    struct SlowBackend;

    #[async_trait::async_trait]
    impl ClusterBackend for SlowBackend {
        async fn run(&self, _invocation: &ToolInvocation) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out_into_a_failed_result() {
        let inspector = inspector_for(Arc::new(SlowBackend), 0);

        let result = inspector.invoke("list_pods", &json!({})).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("timed out after 0s"));
    }

    #[tokio::test]
    async fn oversized_output_is_truncated_with_a_marker() {
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .returning(|_| Ok("log line\n".repeat(2000)));
        let inspector = inspector_with(backend, 15);

        let result = inspector.invoke("list_pods", &json!({})).await.unwrap();
        assert!(result.success);
        assert!(result.output.len() < 4096 + 64);
        assert!(result.output.ends_with("[output truncated]"));
    }
}
