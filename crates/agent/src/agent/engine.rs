//! ReAct Reasoning Loop
//!
//! Drives one question through the think/act/observe cycle as an explicit
//! state machine: ask the model, parse its directive, dispatch the tool,
//! feed the observation back, repeat. Terminal states are a final answer
//! (including the synthesized one at the iteration cap) or a model
//! communication failure after retries.
//!
//! Tool problems never terminate the loop. Unknown tools, bad arguments,
//! timeouts, and unparseable model output all come back to the model as
//! failed observations it can react to.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::agent::directive::{self, Directive};
use crate::agent::prompts;
use crate::agent::provider::LLMProvider;
use crate::agent::transcript::{Transcript, TranscriptEntry};
use crate::config::{AgentConfig, LlmConfig};
use crate::metrics;
use crate::tools::inspector::ClusterInspector;
use crate::{Error, Result};

/// Where the loop currently stands. One productive iteration walks
/// `AwaitingModel → ParsingAction → DispatchingTool` and returns.
#[derive(Debug)]
enum EngineState {
    AwaitingModel,
    ParsingAction {
        raw: String,
    },
    DispatchingTool {
        tool: String,
        arguments: serde_json::Value,
    },
    Done {
        answer: String,
    },
    Failed {
        error: Error,
    },
}

/// What a finished run produced.
#[derive(Debug)]
pub struct EngineOutcome {
    pub answer: String,
    /// Model calls spent reaching the answer.
    pub iterations: u32,
}

pub struct ReactEngine {
    provider: Arc<dyn LLMProvider>,
    inspector: Arc<ClusterInspector>,
    max_iterations: u32,
    max_retries: u32,
    retry_backoff: Duration,
}

impl ReactEngine {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        inspector: Arc<ClusterInspector>,
        agent: &AgentConfig,
        llm: &LlmConfig,
    ) -> Self {
        Self {
            provider,
            inspector,
            max_iterations: agent.max_iterations,
            max_retries: llm.max_retries,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Override the initial retry backoff (doubles after each attempt).
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Drive one question to a conclusion, appending every step to the
    /// transcript as it happens.
    pub async fn run(
        &self,
        framed_question: &str,
        transcript: &mut Transcript,
    ) -> Result<EngineOutcome> {
        let tools_block = self.inspector.registry().describe_for_prompt();
        let tool_names = self.inspector.registry().tool_names();

        let mut state = EngineState::AwaitingModel;
        let mut iterations = 0u32;

        loop {
            state = match state {
                EngineState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        warn!(
                            "iteration cap ({}) reached without a final answer",
                            self.max_iterations
                        );
                        let answer = exhausted_answer(self.max_iterations);
                        transcript.push(TranscriptEntry::FinalAnswer {
                            text: answer.clone(),
                        });
                        EngineState::Done { answer }
                    } else {
                        iterations += 1;
                        debug!("model call {}/{}", iterations, self.max_iterations);
                        let prompt = prompts::build_prompt(
                            &tools_block,
                            &tool_names,
                            framed_question,
                            transcript,
                        );
                        match self.complete_with_retry(&prompt).await {
                            Ok(raw) => EngineState::ParsingAction { raw },
                            Err(error) => EngineState::Failed { error },
                        }
                    }
                }

                EngineState::ParsingAction { raw } => match directive::parse(&raw) {
                    Directive::Action {
                        thought,
                        tool,
                        arguments,
                    } => {
                        if let Some(text) = thought {
                            transcript.push(TranscriptEntry::Thought { text });
                        }
                        EngineState::DispatchingTool { tool, arguments }
                    }
                    Directive::FinalAnswer { thought, text } => {
                        if let Some(t) = thought {
                            transcript.push(TranscriptEntry::Thought { text: t });
                        }
                        transcript.push(TranscriptEntry::FinalAnswer { text: text.clone() });
                        EngineState::Done { answer: text }
                    }
                    Directive::Unparseable { reason } => {
                        warn!("unparseable model output: {}", reason);
                        transcript.push(TranscriptEntry::Observation {
                            text: format!(
                                "Could not parse your response ({}). Reply with either an \
                                 Action and Action Input, or a Final Answer.",
                                reason
                            ),
                            succeeded: false,
                        });
                        EngineState::AwaitingModel
                    }
                },

                EngineState::DispatchingTool { tool, arguments } => {
                    transcript.push(TranscriptEntry::Action {
                        tool: tool.clone(),
                        arguments: arguments.clone(),
                    });
                    let observation = match self.inspector.invoke(&tool, &arguments).await {
                        Ok(result) => TranscriptEntry::Observation {
                            text: result.output,
                            succeeded: result.success,
                        },
                        // Unknown tool or schema violation; the message tells
                        // the model what to fix.
                        Err(e) => TranscriptEntry::Observation {
                            text: e.to_string(),
                            succeeded: false,
                        },
                    };
                    transcript.push(observation);
                    EngineState::AwaitingModel
                }

                EngineState::Done { answer } => {
                    info!("investigation concluded after {} model call(s)", iterations);
                    return Ok(EngineOutcome { answer, iterations });
                }

                EngineState::Failed { error } => {
                    warn!("investigation failed: {}", error);
                    return Err(error);
                }
            };
        }
    }

    /// One model call with bounded retry and doubling backoff.
    async fn complete_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0u32;
        let mut backoff = self.retry_backoff;
        loop {
            metrics::MODEL_CALLS_TOTAL.inc();
            match self.provider.prompt(prompt).await {
                Ok(raw) => return Ok(raw),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "model call failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt, self.max_retries, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(match e {
                        Error::ModelCommunication(_) => e,
                        other => Error::ModelCommunication(other.to_string()),
                    })
                }
            }
        }
    }
}

/// Closing answer synthesized when the iteration cap is reached.
fn exhausted_answer(max_iterations: u32) -> String {
    format!(
        "I could not reach a confident conclusion within {} investigation steps. \
         The transcript above records everything examined so far; re-ask with a \
         narrower question (a specific pod or namespace) to dig deeper.",
        max_iterations
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterBackend;
    use crate::config::Config;
    use crate::tools::inspector::ClusterInspector;
    use crate::ToolRegistry;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of model responses.
    struct ScriptedProvider {
        script: Mutex<VecDeque<std::result::Result<String, String>>>,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    steps
                        .into_iter()
                        .map(|s| s.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait::async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn prompt(&self, _prompt: &str) -> Result<String> {
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(Error::ModelCommunication(message)),
                None => panic!("scripted provider ran out of responses"),
            }
        }
    }

    fn engine_with(
        provider: Arc<dyn LLMProvider>,
        backend: MockClusterBackend,
        max_iterations: u32,
        max_retries: u32,
    ) -> ReactEngine {
        let mut config = Config::default();
        config.agent.max_iterations = max_iterations;
        config.llm.max_retries = max_retries;
        let inspector = Arc::new(ClusterInspector::new(
            Arc::new(ToolRegistry::diagnostic_tools()),
            Arc::new(backend),
            &config.cluster,
        ));
        ReactEngine::new(provider, inspector, &config.agent, &config.llm)
            .with_retry_backoff(Duration::from_millis(1))
    }

    /// Every Action is immediately followed by exactly one Observation, and
    /// a FinalAnswer can only close the transcript.
    fn assert_well_formed(transcript: &Transcript) {
        let entries = transcript.entries();
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                TranscriptEntry::Action { .. } => {
                    assert!(
                        matches!(entries.get(i + 1), Some(TranscriptEntry::Observation { .. })),
                        "action at {} is not followed by an observation",
                        i
                    );
                }
                TranscriptEntry::FinalAnswer { .. } => {
                    assert_eq!(i, entries.len() - 1, "final answer must be last");
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn walks_act_observe_then_concludes() {
        let provider = ScriptedProvider::new(vec![
            Ok("Thought: I should check the pods.\nAction: list_pods\nAction Input: {\"namespace\": \"prod\"}"),
            Ok("Thought: Everything looks healthy.\nFinal Answer: All pods in prod are running."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .times(1)
            .returning(|_| Ok("Pods in namespace 'prod':\n  • web-1: Running - Healthy\n".into()));
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine
            .run("anything wrong? (namespace: prod)", &mut transcript)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "All pods in prod are running.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(transcript.final_answer(), Some("All pods in prod are running."));
        assert_eq!(transcript.tools_used(), vec!["list_pods"]);
        assert_well_formed(&transcript);

        let kinds: Vec<&str> = transcript
            .entries()
            .iter()
            .map(|e| match e {
                TranscriptEntry::Thought { .. } => "thought",
                TranscriptEntry::Action { .. } => "action",
                TranscriptEntry::Observation { .. } => "observation",
                TranscriptEntry::FinalAnswer { .. } => "final",
            })
            .collect();
        assert_eq!(kinds, vec!["thought", "action", "observation", "thought", "final"]);
    }

    #[tokio::test]
    async fn immediate_final_answer_needs_no_tools() {
        let provider = ScriptedProvider::new(vec![Ok(
            "Thought: This needs no cluster access.\nFinal Answer: A pod is the smallest deployable unit.",
        )]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("what is a pod?", &mut transcript).await.unwrap();

        assert_eq!(outcome.iterations, 1);
        assert!(transcript.tools_used().is_empty());
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn unknown_tool_feeds_back_and_recovers() {
        let provider = ScriptedProvider::new(vec![
            Ok("Action: reboot_cluster\nAction Input: {}"),
            Ok("Final Answer: I cannot reboot anything; tell me which pod to inspect."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("restart everything", &mut transcript).await.unwrap();

        assert!(outcome.answer.contains("cannot reboot"));
        let failed = transcript.entries().iter().find_map(|e| match e {
            TranscriptEntry::Observation { text, succeeded: false } => Some(text.clone()),
            _ => None,
        });
        assert!(failed.unwrap().contains("unknown tool 'reboot_cluster'"));
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn invalid_arguments_feed_back_and_recover() {
        let provider = ScriptedProvider::new(vec![
            Ok("Action: get_pod_logs\nAction Input: {\"pod_name\": \"WEB_1\"}"),
            Ok("Action: get_pod_logs\nAction Input: {\"pod_name\": \"web-1\"}"),
            Ok("Final Answer: The logs show a panic on startup."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .times(1)
            .returning(|_| Ok("Logs for web-1:\npanic: oh no".into()));
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("why is web-1 down?", &mut transcript).await.unwrap();

        assert!(outcome.answer.contains("panic"));
        let texts: Vec<(&str, bool)> = transcript
            .entries()
            .iter()
            .filter_map(|e| match e {
                TranscriptEntry::Observation { text, succeeded } => {
                    Some((text.as_str(), *succeeded))
                }
                _ => None,
            })
            .collect();
        assert_eq!(texts.len(), 2);
        assert!(!texts[0].1 && texts[0].0.contains("not a valid Kubernetes name"));
        assert!(texts[1].1);
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn unparseable_output_stands_alone_as_failed_observation() {
        let provider = ScriptedProvider::new(vec![
            Ok("The cluster is probably fine, I guess?"),
            Ok("Final Answer: Recovered after re-reading the instructions."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("status?", &mut transcript).await.unwrap();

        assert!(outcome.answer.contains("Recovered"));
        // The parse-failure observation has no preceding action.
        match &transcript.entries()[0] {
            TranscriptEntry::Observation { text, succeeded } => {
                assert!(!succeeded);
                assert!(text.contains("Could not parse"));
            }
            other => panic!("expected a failed observation first, got {:?}", other),
        }
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn iteration_cap_synthesizes_a_final_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok("Action: list_pods\nAction Input: {}"),
            Ok("Action: list_pods\nAction Input: {}"),
        ]);
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .times(2)
            .returning(|_| Ok("No pods found in namespace 'default'".into()));
        let engine = engine_with(provider, backend, 2, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("loop forever", &mut transcript).await.unwrap();

        assert_eq!(outcome.iterations, 2);
        assert!(outcome.answer.contains("could not reach a confident conclusion"));
        assert_eq!(transcript.final_answer(), Some(outcome.answer.as_str()));
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn unregistered_tool_every_step_still_hits_the_cap() {
        let provider = ScriptedProvider::new(vec![
            Ok("Action: drain_node\nAction Input: {\"node\": \"worker-1\"}"),
            Ok("Action: drain_node\nAction Input: {\"node\": \"worker-1\"}"),
            Ok("Action: drain_node\nAction Input: {\"node\": \"worker-1\"}"),
        ]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 3, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("drain the nodes", &mut transcript).await.unwrap();

        assert!(outcome.answer.contains("could not reach a confident conclusion"));
        let failures = transcript
            .entries()
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::Observation { succeeded: false, .. }))
            .count();
        assert_eq!(failures, 3);
        assert_well_formed(&transcript);
    }

    #[tokio::test]
    async fn transient_model_failure_is_retried() {
        let provider = ScriptedProvider::new(vec![
            Err("connection reset by peer"),
            Ok("Final Answer: Back online."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 10, 2);

        let mut transcript = Transcript::new();
        let outcome = engine.run("hello?", &mut transcript).await.unwrap();
        assert_eq!(outcome.answer, "Back online.");
        // The retry happened inside one iteration.
        assert_eq!(outcome.iterations, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_the_run() {
        let provider = ScriptedProvider::new(vec![
            Err("boom"),
            Err("boom"),
            Err("boom"),
        ]);
        let mut backend = MockClusterBackend::new();
        backend.expect_run().times(0);
        let engine = engine_with(provider, backend, 10, 2);

        let mut transcript = Transcript::new();
        let err = engine.run("hello?", &mut transcript).await.unwrap_err();
        assert!(matches!(err, Error::ModelCommunication(ref m) if m.contains("boom")));
        assert_eq!(transcript.final_answer(), None);
    }

    #[tokio::test]
    async fn failed_tool_execution_is_an_observation_not_an_error() {
        let provider = ScriptedProvider::new(vec![
            Ok("Action: get_pod_status\nAction Input: {\"pod_name\": \"ghost\"}"),
            Ok("Final Answer: That pod does not exist."),
        ]);
        let mut backend = MockClusterBackend::new();
        backend
            .expect_run()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("pods \"ghost\" not found")));
        let engine = engine_with(provider, backend, 10, 0);

        let mut transcript = Transcript::new();
        let outcome = engine.run("how is ghost doing?", &mut transcript).await.unwrap();

        assert!(outcome.answer.contains("does not exist"));
        let failed = transcript.entries().iter().any(|e| {
            matches!(e, TranscriptEntry::Observation { text, succeeded: false }
                if text.contains("not found"))
        });
        assert!(failed);
        assert_well_formed(&transcript);
    }
}
