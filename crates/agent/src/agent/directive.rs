//! Directive Parsing
//!
//! Turns raw model output into a typed directive: call a tool, conclude with
//! a final answer, or neither. The reasoning loop never inspects raw text
//! itself; everything the model says passes through here first.
//!
//! When a response contains both an `Action:` and a `Final Answer:` block the
//! action wins. A model that still wants to look at the cluster has not
//! actually finished, so the investigation continues.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref ACTION_RE: Regex = Regex::new(r"(?m)^[ \t>*#-]*Action\s*:(.*)$").unwrap();
    static ref INPUT_RE: Regex = Regex::new(r"(?m)^[ \t>*#-]*Action\s+Input\s*:").unwrap();
    static ref FINAL_RE: Regex = Regex::new(r"(?m)^[ \t>*#-]*Final\s+Answer\s*:").unwrap();
    static ref THOUGHT_RE: Regex = Regex::new(r"(?m)^[ \t>*#-]*Thought\s*:").unwrap();
    static ref MARKER_RE: Regex = Regex::new(
        r"(?m)^[ \t>*#-]*(Thought|Action|Action\s+Input|Observation|Final\s+Answer)\s*:"
    )
    .unwrap();
}

/// What the model asked for in a single response.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Call a tool with the given JSON arguments.
    Action {
        thought: Option<String>,
        tool: String,
        arguments: Value,
    },
    /// Stop and answer the question.
    FinalAnswer {
        thought: Option<String>,
        text: String,
    },
    /// The response fit neither shape; `reason` is fed back as a failed
    /// observation so the model can correct itself.
    Unparseable { reason: String },
}

/// Parse one model response into a [`Directive`].
pub fn parse(raw: &str) -> Directive {
    let thought = extract_thought(raw);

    if let Some(tool) = extract_action_name(raw) {
        let arguments = match extract_action_input(raw) {
            Some(Ok(value)) => value,
            Some(Err(reason)) => return Directive::Unparseable { reason },
            // "Action Input:" absent entirely; tools without required
            // parameters are callable this way.
            None => Value::Object(Default::default()),
        };
        return Directive::Action {
            thought,
            tool,
            arguments,
        };
    }

    if let Some(m) = FINAL_RE.find(raw) {
        let text = raw[m.end()..].trim();
        if !text.is_empty() {
            return Directive::FinalAnswer {
                thought,
                text: text.to_string(),
            };
        }
    }

    Directive::Unparseable {
        reason: "response contains neither an Action nor a Final Answer".to_string(),
    }
}

/// First `Thought:` section, up to the next directive marker.
fn extract_thought(raw: &str) -> Option<String> {
    let m = THOUGHT_RE.find(raw)?;
    let rest = &raw[m.end()..];
    let end = MARKER_RE.find(rest).map(|n| n.start()).unwrap_or(rest.len());
    let text = rest[..end].trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn extract_action_name(raw: &str) -> Option<String> {
    let captures = ACTION_RE.captures(raw)?;
    let name = captures
        .get(1)
        .map(|m| m.as_str())?
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '*' || c.is_whitespace());
    if name.is_empty() || name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(name.to_string())
}

/// Everything after `Action Input:` up to the next marker, parsed as JSON.
fn extract_action_input(raw: &str) -> Option<Result<Value, String>> {
    let m = INPUT_RE.find(raw)?;
    let rest = &raw[m.end()..];
    let end = MARKER_RE.find(rest).map(|n| n.start()).unwrap_or(rest.len());
    let chunk = rest[..end].trim();
    match parse_json_lenient(chunk) {
        Some(value) => Some(Ok(value)),
        None => Some(Err(format!(
            "Action Input is not valid JSON: {}",
            truncate_for_reason(chunk)
        ))),
    }
}

/// Parse a JSON object out of model text, tolerating markdown fences and
/// surrounding prose. Tries the raw text first, then the first balanced
/// `{...}` block.
fn parse_json_lenient(text: &str) -> Option<Value> {
    let stripped = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(stripped) {
        return Some(value);
    }
    let candidate = balanced_object(stripped)?;
    serde_json::from_str(candidate).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag ("json", etc.) on the opening fence line.
    let inner = match inner.find('\n') {
        Some(idx) => &inner[idx + 1..],
        None => inner,
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// First balanced `{...}` span, string-literal aware.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + idx + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate_for_reason(chunk: &str) -> String {
    const LIMIT: usize = 120;
    if chunk.len() <= LIMIT {
        chunk.to_string()
    } else {
        let mut end = LIMIT;
        while !chunk.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &chunk[..end])
    }
}
