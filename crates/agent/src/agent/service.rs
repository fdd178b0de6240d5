//! Request Service
//!
//! The `ask` boundary callers go through. Validates the question, opens an
//! isolated session, runs the reasoning loop under the overall request
//! deadline, and assembles the outcome. The request deadline is distinct
//! from the per-tool timeout: it bounds the whole investigation.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::engine::ReactEngine;
use crate::agent::prompts;
use crate::agent::provider::LLMProvider;
use crate::agent::session::AgentSession;
use crate::agent::transcript::Transcript;
use crate::config::Config;
use crate::metrics;
use crate::tools::inspector::ClusterInspector;
use crate::{Error, Result};

/// Everything one answered question produced.
#[derive(Debug, Serialize)]
pub struct AskOutcome {
    pub session_id: Uuid,
    pub answer: String,
    pub transcript: Transcript,
    pub tools_used: Vec<String>,
    pub iterations: u32,
    pub duration_ms: i64,
}

pub struct AgentService {
    engine: ReactEngine,
    default_namespace: String,
    request_timeout: Duration,
}

impl AgentService {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        inspector: Arc<ClusterInspector>,
        config: &Config,
    ) -> Self {
        Self {
            engine: ReactEngine::new(provider, inspector, &config.agent, &config.llm),
            default_namespace: config.cluster.default_namespace.clone(),
            request_timeout: Duration::from_secs(config.agent.request_timeout_secs),
        }
    }

    /// Answer one question. Each call gets its own session and transcript;
    /// concurrent calls share nothing mutable.
    pub async fn ask(&self, question: &str, namespace: Option<&str>) -> Result<AskOutcome> {
        if question.trim().is_empty() {
            return Err(Error::Validation("question must not be empty".to_string()));
        }
        if let Some(ns) = namespace {
            if ns.trim().is_empty() {
                return Err(Error::Validation(
                    "namespace must not be blank when provided".to_string(),
                ));
            }
        }

        metrics::QUESTIONS_TOTAL.inc();
        let _timer = metrics::REQUEST_DURATION_SECONDS.start_timer();

        let namespace = namespace.unwrap_or(&self.default_namespace);
        let mut session = AgentSession::new(question, namespace);
        info!("session {} asking: {}", session.id, question);

        let framed = prompts::frame_question(question, namespace);
        let run = self.engine.run(&framed, &mut session.transcript);
        let outcome = match tokio::time::timeout(self.request_timeout, run).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                metrics::QUESTIONS_FAILED_TOTAL.inc();
                return Err(e);
            }
            // The engine future is dropped here; whatever partial transcript
            // the session held goes with it.
            Err(_) => {
                metrics::QUESTIONS_FAILED_TOTAL.inc();
                warn!(
                    "session {} exceeded the {}s request deadline",
                    session.id,
                    self.request_timeout.as_secs()
                );
                return Err(Error::RequestTimeout(self.request_timeout.as_secs()));
            }
        };

        session.finish(outcome.iterations);
        info!(
            "session {} answered in {} iteration(s), {}ms",
            session.id,
            outcome.iterations,
            session.elapsed_ms()
        );

        Ok(AskOutcome {
            session_id: session.id,
            answer: outcome.answer,
            tools_used: session.transcript.tools_used(),
            iterations: outcome.iterations,
            duration_ms: session.elapsed_ms(),
            transcript: session.transcript,
        })
    }
}
