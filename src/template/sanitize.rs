//! Recover JSON from raw model text
//!
//! Models wrap JSON in markdown fences and sometimes emit several objects
//! back to back with no separator. The sanitizer undoes both and never
//! fails past its own boundary: the worst case is [`SanitizeError`].
//!
//! Rules, in order:
//! 1. Trim whitespace.
//! 2. Strip a leading ```` ``` ```` fence, its optional language tag, and the
//!    closing fence.
//! 3. Split concatenated top-level objects (`{..}{..}`, optionally separated
//!    by whitespace) and parse each piece.
//! 4. Otherwise parse the whole text. A top-level array is flattened into
//!    its elements.
//! 5. On failure, parse the span from the first `{` to the last `}` (again
//!    applying rule 3).

use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("model output is not recoverable as JSON")]
    Unparseable,
}

/// Extract one or more JSON values from raw model output
pub fn sanitize(raw: &str) -> Result<Vec<Value>, SanitizeError> {
    let text = strip_fence(raw.trim());

    if let Some(values) = parse_text(text) {
        return Ok(values);
    }

    let start = text.find('{');
    let end = text.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if let Some(span) = text.get(start..=end) {
            if let Some(values) = parse_text(span) {
                tracing::debug!("Recovered JSON from brace span");
                return Ok(values);
            }
        }
    }

    Err(SanitizeError::Unparseable)
}

fn parse_text(text: &str) -> Option<Vec<Value>> {
    if let Some(pieces) = split_concatenated(text) {
        if pieces.len() > 1 {
            return pieces
                .into_iter()
                .map(|piece| serde_json::from_str::<Value>(piece).ok())
                .collect();
        }
    }

    match serde_json::from_str::<Value>(text).ok()? {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            Some(items)
        }
        value => Some(vec![value]),
    }
}

/// Remove a surrounding markdown code fence, if any
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text;
    };

    // Language tag runs up to the first newline (```json, ```JSON, ``` json)
    let rest = match rest.find('\n') {
        Some(nl) if is_language_tag(rest.get(..nl).unwrap_or_default()) => {
            rest.get(nl + 1..).unwrap_or_default()
        }
        _ => strip_inline_tag(rest),
    };

    let rest = rest.trim_end();
    rest.strip_suffix(FENCE).unwrap_or(rest).trim()
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Handle a single-line fence like ```json {"Body": ...}```
fn strip_inline_tag(rest: &str) -> &str {
    let trimmed = rest.trim_start();
    let tag_len = trimmed
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(trimmed.len());
    trimmed.get(tag_len..).unwrap_or(trimmed)
}

/// Tokenizing pre-pass: find the top-level object spans in `text`.
///
/// Tracks string literals and escapes so braces inside strings do not count.
/// Returns `None` unless the text consists solely of balanced top-level
/// objects separated by optional whitespace.
fn split_concatenated(text: &str) -> Option<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    pieces.push(text.get(start.take()?..=i)?);
                }
            }
            c if depth == 0 && !c.is_whitespace() => return None,
            _ => {}
        }
    }

    (depth == 0 && !in_string && !pieces.is_empty()).then_some(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let values = sanitize(r#"{"Body": "hi", "Buttons": []}"#).unwrap();
        assert_eq!(values, vec![json!({"Body": "hi", "Buttons": []})]);
    }

    #[test]
    fn test_fenced_with_and_without_tag() {
        let expected = vec![json!({"Body": "hi", "Buttons": []})];
        let tagged = "```json\n{\"Body\": \"hi\", \"Buttons\": []}\n```";
        let bare = "```\n{\"Body\": \"hi\", \"Buttons\": []}\n```";
        let inline = "```json {\"Body\": \"hi\", \"Buttons\": []}```";
        assert_eq!(sanitize(tagged).unwrap(), expected);
        assert_eq!(sanitize(bare).unwrap(), expected);
        assert_eq!(sanitize(inline).unwrap(), expected);
    }

    #[test]
    fn test_concatenated_objects_split() {
        let raw = r#"{"Body": "Template", "Buttons": [{"type": "QUICK_REPLY", "text": "Yes"}]}{"Body": "Please provide a URL", "Buttons": []}"#;
        let values = sanitize(raw).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["Body"], "Please provide a URL");
    }

    #[test]
    fn test_braces_inside_strings_do_not_split() {
        let raw = r#"{"Body": "Use {{1}}}{ carefully", "Buttons": []}"#;
        let values = sanitize(raw).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["Body"], "Use {{1}}}{ carefully");
    }

    #[test]
    fn test_whitespace_between_objects() {
        let values = sanitize("{\"a\": 1}\n\n{\"b\": 2}").unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_prose_around_object_falls_back_to_brace_span() {
        let raw = "Sure! Here is your template: {\"Body\": \"hi\", \"Buttons\": []} Hope it helps.";
        assert_eq!(sanitize(raw).unwrap(), vec![json!({"Body": "hi", "Buttons": []})]);
    }

    #[test]
    fn test_top_level_array_flattened() {
        let values = sanitize(r#"[{"Body": "a", "Buttons": []}, {"Body": "b", "Buttons": []}]"#).unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(sanitize("no json here"), Err(SanitizeError::Unparseable));
        assert_eq!(sanitize("{\"Body\": "), Err(SanitizeError::Unparseable));
        assert_eq!(sanitize(""), Err(SanitizeError::Unparseable));
    }

    #[test]
    fn test_split_rejects_trailing_garbage() {
        assert!(split_concatenated("{} x").is_none());
        assert!(split_concatenated("{\"a\": 1").is_none());
        assert_eq!(split_concatenated("{}{}").unwrap(), vec!["{}", "{}"]);
    }
}
