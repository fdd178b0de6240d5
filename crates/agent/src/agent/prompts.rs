//! ReAct Prompt Assembly
//!
//! Builds the single completion prompt sent to the model on every loop
//! iteration: instruction header, tool catalog, the framed question, and the
//! scratchpad replaying the transcript so far, ending with a `Thought:` cue.

use crate::agent::transcript::{Transcript, TranscriptEntry};

/// Fold the target namespace into the question the way callers expect to see
/// it echoed back in the answer.
pub fn frame_question(question: &str, namespace: &str) -> String {
    format!("{} (namespace: {})", question.trim(), namespace)
}

/// Full prompt for the next model call.
///
/// `tools_block` is the registry's prompt rendering of every tool;
/// `tool_names` is the bracketed comma list the format section refers to.
pub fn build_prompt(
    tools_block: &str,
    tool_names: &str,
    framed_question: &str,
    transcript: &Transcript,
) -> String {
    let mut prompt = format!(
        "Answer the following questions as best you can. You have access to the following tools:\n\
         \n\
         {tools}\n\
         \n\
         Use the following format:\n\
         \n\
         Question: the input question\n\
         Thought: think about what to do\n\
         Action: the action to take, one of [{names}]\n\
         Action Input: {{\"pod_name\": \"exact-name\", \"namespace\": \"default\"}}\n\
         Observation: the result\n\
         ... (repeat Thought/Action/Observation as needed)\n\
         Thought: I now know the final answer\n\
         Final Answer: clear diagnosis with root cause and fix steps\n\
         \n\
         IMPORTANT:\n\
         - Action Input must be valid JSON with double quotes!\n\
         - If the question is about \"the cluster\" or \"all pods\", use list_pods first\n\
         - Be concise and actionable in the Final Answer\n\
         \n\
         Begin!\n\
         \n\
         Question: {question}\n",
        tools = tools_block,
        names = tool_names,
        question = framed_question,
    );
    prompt.push_str(&render_scratchpad(transcript));
    prompt.push_str("Thought:");
    prompt
}

/// Replay the transcript in the grammar the model was shown.
fn render_scratchpad(transcript: &Transcript) -> String {
    let mut out = String::new();
    for entry in transcript.entries() {
        match entry {
            TranscriptEntry::Thought { text } => {
                out.push_str("Thought: ");
                out.push_str(text);
                out.push('\n');
            }
            TranscriptEntry::Action { tool, arguments } => {
                out.push_str("Action: ");
                out.push_str(tool);
                out.push_str("\nAction Input: ");
                out.push_str(&arguments.to_string());
                out.push('\n');
            }
            TranscriptEntry::Observation { text, .. } => {
                out.push_str("Observation: ");
                out.push_str(text);
                out.push('\n');
            }
            // The loop stops once an answer exists; nothing to replay.
            TranscriptEntry::FinalAnswer { .. } => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_call_ends_with_bare_thought_cue() {
        let prompt = build_prompt(
            "list_pods: List all pods.",
            "list_pods",
            "is anything broken? (namespace: default)",
            &Transcript::new(),
        );
        assert!(prompt.contains("list_pods: List all pods."));
        assert!(prompt.contains("Question: is anything broken? (namespace: default)"));
        assert!(prompt.ends_with("Question: is anything broken? (namespace: default)\nThought:"));
    }

    #[test]
    fn scratchpad_replays_steps_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::Thought {
            text: "check the pods".into(),
        });
        transcript.push(TranscriptEntry::Action {
            tool: "list_pods".into(),
            arguments: json!({"namespace": "prod"}),
        });
        transcript.push(TranscriptEntry::Observation {
            text: "Pods in namespace 'prod':\n• api-1: Running - Healthy".into(),
            succeeded: true,
        });

        let prompt = build_prompt("tools", "list_pods", "q (namespace: prod)", &transcript);
        let thought_at = prompt.find("Thought: check the pods").unwrap();
        let action_at = prompt.find("Action: list_pods\nAction Input: {\"namespace\":\"prod\"}").unwrap();
        let observation_at = prompt.find("Observation: Pods in namespace 'prod':").unwrap();
        assert!(thought_at < action_at && action_at < observation_at);
        assert!(prompt.ends_with("Thought:"));
    }

    #[test]
    fn question_framing_appends_namespace() {
        assert_eq!(
            frame_question("  why is web-1 down?  ", "staging"),
            "why is web-1 down? (namespace: staging)"
        );
    }
}
