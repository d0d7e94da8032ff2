//! The repair cascade: an ordered list of increasingly lenient strategies
//! for recovering a graph-shaped JSON payload from raw model output. Each
//! strategy is a pure function `&str -> Result<Value, ParseError>`; the
//! first success short-circuits the chain.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// Top-level keys that mark a payload as graph-shaped. Anchoring prefers
/// the earliest occurrence of any of them.
const PAYLOAD_KEYS: &[&str] = &[
    "entities",
    "nodes",
    "relations",
    "relationships",
    "edges",
    "anomalies",
    "Document Summaries",
];

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response contained no text")]
    EmptyResponse,
    #[error("no graph-shaped payload found in response")]
    NoPayload,
    #[error("payload survived no repair strategy: {snippet}")]
    Unrepairable { snippet: String },
}

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern"));
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//[^\n]*$").expect("line comment pattern"));

/// Run the full cascade. `raw` is the unmodified model output.
pub fn recover_payload(raw: &str) -> Result<Value, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    let cleaned = preclean(raw);

    let strategies: &[fn(&str) -> Result<Value, ParseError>] = &[
        parse_strict,
        parse_anchored,
        parse_lenient,
        parse_span_scan,
    ];

    for strategy in strategies {
        if let Ok(value) = strategy(&cleaned) {
            return Ok(value);
        }
    }

    Err(ParseError::Unrepairable {
        snippet: cleaned.chars().take(SNIPPET_CHARS).collect(),
    })
}

/// Stage 0: strip code fences and carriage-return noise. Always applied.
pub fn preclean(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```", "")
        .replace('\r', "")
        .trim()
        .to_string()
}

/// Stage 1: the text is already valid JSON carrying a payload key.
fn parse_strict(text: &str) -> Result<Value, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ParseError::NoPayload)?;
    require_payload(value)
}

/// Stage 2: anchor on the first payload key, walk back to the opening
/// brace of the object containing it (synthesizing one when the model
/// dropped it), and cut a brace-balanced object out of the noise.
fn parse_anchored(text: &str) -> Result<Value, ParseError> {
    let anchor = PAYLOAD_KEYS
        .iter()
        .filter_map(|key| text.find(&format!("\"{key}\"")))
        .min()
        .ok_or(ParseError::NoPayload)?;

    let candidate = match text[..anchor].rfind('{') {
        Some(open) => balanced_object(&text[open..]),
        // Key with no wrapper: rebuild one around the rest of the text.
        None => balanced_object(&format!("{{{}", &text[anchor..])),
    };
    let candidate = candidate.ok_or(ParseError::NoPayload)?;

    serde_json::from_str(&candidate)
        .or_else(|_| serde_json::from_str(&lenient_cleanup(&candidate)))
        .map_err(|_| ParseError::NoPayload)
        .and_then(require_payload)
}

/// Stage 3: tolerate trailing commas, comment lines, and stray control
/// characters anywhere in the text.
fn parse_lenient(text: &str) -> Result<Value, ParseError> {
    serde_json::from_str(&lenient_cleanup(text))
        .map_err(|_| ParseError::NoPayload)
        .and_then(require_payload)
}

/// Stage 4: last resort, take the widest `{` .. `}` span and clean it.
fn parse_span_scan(text: &str) -> Result<Value, ParseError> {
    let start = text.find('{').ok_or(ParseError::NoPayload)?;
    let end = text.rfind('}').ok_or(ParseError::NoPayload)?;
    if end < start {
        return Err(ParseError::NoPayload);
    }

    serde_json::from_str(&lenient_cleanup(&text[start..=end]))
        .map_err(|_| ParseError::NoPayload)
        .and_then(require_payload)
}

fn lenient_cleanup(text: &str) -> String {
    let text = LINE_COMMENT.replace_all(text, "");
    let text = TRAILING_COMMA.replace_all(&text, "$1");
    text.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect()
}

fn require_payload(value: Value) -> Result<Value, ParseError> {
    let looks_like_payload = value
        .as_object()
        .is_some_and(|obj| PAYLOAD_KEYS.iter().any(|k| obj.contains_key(*k)));
    if looks_like_payload {
        Ok(value)
    } else {
        Err(ParseError::NoPayload)
    }
}

/// Cut a balanced object prefix from text starting at `{`, respecting JSON
/// string literals and escapes. When the model's output was truncated, the
/// still-open braces and brackets are closed in order.
fn balanced_object(text: &str) -> Option<String> {
    if !text.starts_with('{') {
        return None;
    }

    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut out = String::new();

    for c in text.chars() {
        out.push(c);
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => closers.push('}'),
            '[' if !in_string => closers.push(']'),
            '}' | ']' if !in_string => {
                closers.pop();
                if closers.is_empty() {
                    return Some(out);
                }
            }
            _ => {}
        }
    }

    // Truncated output: close what is still open ourselves.
    if in_string {
        out.push('"');
    }
    while let Some(c) = closers.pop() {
        out.push(c);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_parses_strictly() {
        let raw = r#"{"entities": [{"value": "FBI"}], "relations": []}"#;
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["entities"][0]["value"], "FBI");
    }

    #[test]
    fn test_cascade_is_noop_on_well_formed_input() {
        let raw = r#"{"entities": [{"value": "FBI", "type": "ORGANIZATION"}], "relations": [], "anomalies": []}"#;
        let direct: Value = serde_json::from_str(raw).unwrap();
        let cascaded = recover_payload(raw).unwrap();
        assert_eq!(direct, cascaded);
    }

    #[test]
    fn test_code_fences_are_stripped() {
        let raw = "```json\n{\"entities\": [], \"relations\": []}\n```";
        assert!(recover_payload(raw).is_ok());
    }

    #[test]
    fn test_prefix_noise_is_discarded_by_anchoring() {
        let raw = "Here is the analysis you asked for:\n{\"nodes\": [{\"id\": \"A\"}], \"edges\": []}";
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["nodes"][0]["id"], "A");
    }

    #[test]
    fn test_missing_open_brace_is_rebuilt() {
        let raw = "\"entities\": [{\"value\": \"FBI\"}], \"relations\": []}";
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["entities"][0]["value"], "FBI");
    }

    #[test]
    fn test_trailing_commas_tolerated() {
        let raw = r#"{"entities": [{"value": "FBI"},], "relations": [],}"#;
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["entities"][0]["value"], "FBI");
    }

    #[test]
    fn test_truncated_payload_is_closed() {
        let raw = r#"some preamble {"entities": [{"value": "FBI"}"#;
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["entities"][0]["value"], "FBI");
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_balancing() {
        let raw = r#"noise {"entities": [{"value": "curly {brace} corp"}], "relations": []} trailing"#;
        let value = recover_payload(raw).unwrap();
        assert_eq!(value["entities"][0]["value"], "curly {brace} corp");
    }

    #[test]
    fn test_empty_response_is_an_error() {
        assert!(matches!(recover_payload(""), Err(ParseError::EmptyResponse)));
        assert!(matches!(recover_payload("  \n "), Err(ParseError::EmptyResponse)));
    }

    #[test]
    fn test_hopeless_text_is_unrepairable() {
        let err = recover_payload("the model refused to answer").unwrap_err();
        assert!(matches!(err, ParseError::Unrepairable { .. }));
    }

    #[test]
    fn test_json_without_payload_keys_is_rejected() {
        let err = recover_payload(r#"{"greeting": "hello"}"#).unwrap_err();
        assert!(matches!(err, ParseError::Unrepairable { .. }));
    }
}
