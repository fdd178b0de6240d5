//! Kube Client Backend
//!
//! Implements the four diagnostic inspections against a live cluster through
//! the Kubernetes API. Report formatting is split into pure helpers so the
//! output text is testable without a cluster.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::{
    api::{Api, ListParams, LogParams},
    Client,
};
use tracing::debug;

use crate::cluster::{ClusterBackend, ToolInvocation};
use crate::config::ClusterConfig;
use crate::tools::{truncate_marked, ToolBinding};

/// Log output is capped well below the inspector's general cap; fifty tail
/// lines of a chatty app can still be enormous.
const LOG_BYTE_CAP: usize = 2000;

/// Read-only cluster access via the kube client.
#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
    default_namespace: String,
    log_tail_lines: i64,
}

impl KubeBackend {
    pub fn new(client: Client, config: &ClusterConfig) -> Self {
        Self {
            client,
            default_namespace: config.default_namespace.clone(),
            log_tail_lines: config.log_tail_lines,
        }
    }

    async fn list_pods(&self, namespace: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_list = pods
            .list(&ListParams::default())
            .await
            .map_err(|e| anyhow!("listing pods in '{}' failed: {}", namespace, e))?;
        Ok(format_pod_list(namespace, &pod_list.items))
    }

    async fn pod_status(&self, pod_name: &str, namespace: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods
            .get(pod_name)
            .await
            .map_err(|e| anyhow!("getting pod '{}' in '{}' failed: {}", pod_name, namespace, e))?;
        Ok(format_pod_status(pod_name, &pod))
    }

    async fn pod_logs(&self, pod_name: &str, namespace: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            tail_lines: Some(self.log_tail_lines),
            ..LogParams::default()
        };
        let logs = match pods.logs(pod_name, &params).await {
            Ok(logs) => logs,
            Err(e) => {
                // Crashed containers often have no current logs; the
                // previous instance usually holds the interesting lines.
                debug!(
                    "current logs unavailable for '{}' ({}); trying previous container",
                    pod_name, e
                );
                let previous = LogParams {
                    tail_lines: Some(self.log_tail_lines),
                    previous: true,
                    ..LogParams::default()
                };
                pods.logs(pod_name, &previous)
                    .await
                    .map_err(|e| anyhow!("getting logs for '{}' failed: {}", pod_name, e))?
            }
        };
        Ok(format_logs(pod_name, &logs))
    }

    async fn describe_pod(&self, pod_name: &str, namespace: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        pods.get(pod_name)
            .await
            .map_err(|e| anyhow!("getting pod '{}' in '{}' failed: {}", pod_name, namespace, e))?;

        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!(
            "involvedObject.name={},involvedObject.namespace={}",
            pod_name, namespace
        );
        let event_list = events
            .list(&ListParams::default().fields(&selector))
            .await
            .map_err(|e| anyhow!("listing events for '{}' failed: {}", pod_name, e))?;
        Ok(format_events(pod_name, &event_list.items))
    }
}

#[async_trait]
impl ClusterBackend for KubeBackend {
    async fn run(&self, invocation: &ToolInvocation) -> Result<String> {
        let namespace = invocation
            .str_arg("namespace")
            .unwrap_or(&self.default_namespace)
            .to_string();
        match invocation.binding {
            ToolBinding::ListPods => self.list_pods(&namespace).await,
            ToolBinding::PodStatus => {
                self.pod_status(require_pod_name(invocation)?, &namespace).await
            }
            ToolBinding::PodLogs => {
                self.pod_logs(require_pod_name(invocation)?, &namespace).await
            }
            ToolBinding::DescribePod => {
                self.describe_pod(require_pod_name(invocation)?, &namespace).await
            }
        }
    }
}

fn require_pod_name(invocation: &ToolInvocation) -> Result<&str> {
    invocation
        .str_arg("pod_name")
        .ok_or_else(|| anyhow!("invocation is missing 'pod_name'"))
}

/// One line per pod: phase plus a summary of container trouble.
fn format_pod_list(namespace: &str, pods: &[Pod]) -> String {
    if pods.is_empty() {
        return format!("No pods found in namespace '{}'", namespace);
    }

    let mut output = format!("Pods in namespace '{}':\n", namespace);
    for pod in pods {
        let name = pod.metadata.name.as_deref().unwrap_or("<unknown>");
        let status = pod.status.as_ref();
        let phase = status.and_then(|s| s.phase.as_deref()).unwrap_or("Unknown");

        let mut issues: Vec<String> = Vec::new();
        if let Some(containers) = status.and_then(|s| s.container_statuses.as_ref()) {
            for cs in containers {
                if let Some(state) = &cs.state {
                    if let Some(waiting) = &state.waiting {
                        issues.push(
                            waiting.reason.clone().unwrap_or_else(|| "Waiting".to_string()),
                        );
                    } else if let Some(terminated) = &state.terminated {
                        issues.push(format!(
                            "Terminated: {}",
                            terminated.reason.as_deref().unwrap_or("Unknown")
                        ));
                    }
                }
            }
        }

        let summary = if issues.is_empty() {
            " - Healthy".to_string()
        } else {
            format!(" - Issues: {}", issues.join(", "))
        };
        output.push_str(&format!("  • {}: {}{}\n", name, phase, summary));
    }
    output
}

/// Phase, per-container restart counts, and each container's state.
fn format_pod_status(pod_name: &str, pod: &Pod) -> String {
    let status = pod.status.as_ref();
    let phase = status.and_then(|s| s.phase.as_deref()).unwrap_or("Unknown");

    let mut restarts: Vec<String> = Vec::new();
    let mut states = String::new();
    if let Some(containers) = status.and_then(|s| s.container_statuses.as_ref()) {
        for cs in containers {
            restarts.push(cs.restart_count.to_string());
            if let Some(state) = &cs.state {
                if let Some(waiting) = &state.waiting {
                    states.push_str(&format!(
                        "\nContainer '{}': Waiting - {}",
                        cs.name,
                        waiting.reason.as_deref().unwrap_or("Unknown")
                    ));
                    if let Some(message) = &waiting.message {
                        states.push_str(&format!("\n  {}", clip(message, 200)));
                    }
                } else if let Some(terminated) = &state.terminated {
                    states.push_str(&format!(
                        "\nContainer '{}': Terminated - {} (exit code: {})",
                        cs.name,
                        terminated.reason.as_deref().unwrap_or("Unknown"),
                        terminated.exit_code
                    ));
                } else if state.running.is_some() {
                    states.push_str(&format!("\nContainer '{}': Running", cs.name));
                }
            }
        }
    }

    format!(
        "Pod: {}\nPhase: {}\nRestarts: {}{}",
        pod_name,
        phase,
        restarts.join(" "),
        states
    )
}

fn format_logs(pod_name: &str, logs: &str) -> String {
    if logs.is_empty() {
        return "No logs available".to_string();
    }
    format!("Logs for {}:\n{}", pod_name, truncate_marked(logs, LOG_BYTE_CAP))
}

/// Chronological event lines, the part of `describe` worth feeding a model.
fn format_events(pod_name: &str, events: &[Event]) -> String {
    if events.is_empty() {
        return "No events found".to_string();
    }

    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.last_timestamp.as_ref().map(|t| t.0));

    let mut output = format!("Events for {}:\n", pod_name);
    for event in sorted {
        output.push_str(&format!(
            "  [{}] {} (x{}): {}\n",
            event.type_.as_deref().unwrap_or("Normal"),
            event.reason.as_deref().unwrap_or("Unknown"),
            event.count.unwrap_or(1),
            event.message.as_deref().unwrap_or("").trim()
        ));
    }
    output
}

fn clip(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
