//! JSON Repair Mechanism
//!
//! Structural repair for JSON produced by the language model.
//!
//! Handles common LLM JSON output issues:
//! - Markdown code fence wrapping (```json ... ```)
//! - Trailing commas
//! - Missing closing braces/brackets
//! - Truncated strings
//! - JSON embedded in explanatory text
//!
//! The contract is one repair attempt: direct parse, then a single
//! structural pass, then extraction from mixed content. A failure after
//! that is a hard error for the call.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{Result, WikiError};

/// Parse model output as JSON, attempting structural repair on failure.
///
/// Returns the parsed value and whether repair was needed.
pub fn parse_or_repair(raw: &str) -> Result<(Value, bool)> {
    let cleaned = preprocess(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok((value, false));
    }

    debug!("Initial JSON parse failed, attempting structural repair");

    let repaired = repair(&cleaned);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        warn!("Model JSON required structural repair");
        return Ok((value, true));
    }

    if let Some(extracted) = extract_from_mixed(&cleaned)
        && let Ok(value) = serde_json::from_str::<Value>(&extracted)
    {
        warn!("Model JSON extracted from mixed content");
        return Ok((value, true));
    }

    Err(WikiError::MalformedOutput(format!(
        "unparseable after repair; content preview: {}...",
        cleaned.chars().take(200).collect::<String>()
    )))
}

/// Strip code fences, BOM, and surrounding whitespace
fn preprocess(raw: &str) -> String {
    let mut s = raw.trim();
    s = s.trim_start_matches('\u{feff}').trim();

    let mut out = s.to_string();
    if out.starts_with("```")
        && let Some(first_newline) = out.find('\n')
    {
        out = out[first_newline + 1..].to_string();
    }
    if out.ends_with("```") {
        out = out[..out.len() - 3].trim_end().to_string();
    }
    out.trim().to_string()
}

/// One structural pass: trailing commas, truncated strings, bracket balance,
/// then truncation to the last complete structure.
fn repair(s: &str) -> String {
    let mut result = fix_trailing_commas(s);
    result = close_truncated_strings(&result);
    result = balance_brackets(&result);
    truncate_to_valid(&result)
}

/// Drop commas that directly precede a closing bracket or brace
fn fix_trailing_commas(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == ']' || chars[j] == '}') {
                i += 1;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }

    result
}

/// Close strings left open at a newline or at end of input
fn close_truncated_strings(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape = true;
                result.push(ch);
            }
            '"' => {
                in_string = !in_string;
                result.push(ch);
            }
            '\n' | '\r' if in_string => {
                result.push('"');
                in_string = false;
                result.push(ch);
            }
            _ => result.push(ch),
        }
    }

    if in_string {
        result.push('"');
    }
    result
}

/// Append missing closers for unbalanced braces and brackets
fn balance_brackets(s: &str) -> String {
    let mut result = s.to_string();

    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for ch in result.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => brace_count -= 1,
            '[' if !in_string => bracket_count += 1,
            ']' if !in_string => bracket_count -= 1,
            _ => {}
        }
    }

    if in_string {
        result.push('"');
    }
    for _ in 0..bracket_count.max(0) {
        result.push(']');
    }
    for _ in 0..brace_count.max(0) {
        result.push('}');
    }
    result
}

/// Truncate to the last position where all structures were closed
fn truncate_to_valid(s: &str) -> String {
    let mut last_valid = 0;
    let mut brace_count = 0i32;
    let mut bracket_count = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (i, ch) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => {
                brace_count -= 1;
                if brace_count == 0 && bracket_count == 0 {
                    last_valid = i + 1;
                }
            }
            '[' if !in_string => bracket_count += 1,
            ']' if !in_string => {
                bracket_count -= 1;
                if brace_count == 0 && bracket_count == 0 {
                    last_valid = i + 1;
                }
            }
            _ => {}
        }
    }

    if last_valid > 0 && last_valid < s.len() {
        s[..last_valid].to_string()
    } else {
        s.to_string()
    }
}

/// Extract the first complete JSON structure from surrounding prose
fn extract_from_mixed(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let end_char = if s[start..].starts_with('{') { '}' } else { ']' };

    let mut brace_depth = 0i32;
    let mut bracket_depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut end = start;

    for (i, ch) in s[start..].char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_depth += 1,
            '}' if !in_string => {
                brace_depth -= 1;
                if brace_depth == 0 && bracket_depth == 0 && ch == end_char {
                    end = start + i + 1;
                    break;
                }
            }
            '[' if !in_string => bracket_depth += 1,
            ']' if !in_string => {
                bracket_depth -= 1;
                if brace_depth == 0 && bracket_depth == 0 && ch == end_char {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    (end > start).then(|| s[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let (_, repaired) = parse_or_repair(r#"{"key": "value"}"#).unwrap();
        assert!(!repaired);
    }

    #[test]
    fn test_strip_code_fences() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        let (value, _) = parse_or_repair(input).unwrap();
        assert_eq!(value["key"], "value");
    }

    #[test]
    fn test_fix_trailing_comma() {
        let input = r#"{"sections": [{"title": "History"},]}"#;
        let (value, repaired) = parse_or_repair(input).unwrap();
        assert!(repaired);
        assert!(value["sections"].is_array());
    }

    #[test]
    fn test_balance_brackets() {
        let input = r#"{"sections": [{"title": "History"}"#;
        let (value, repaired) = parse_or_repair(input).unwrap();
        assert!(repaired);
        assert!(value["sections"].is_array());
    }

    #[test]
    fn test_extract_from_mixed_content() {
        let input = r#"Here is the outline you asked for:
{"summary": "An empire.", "sections": []}
Let me know if you need more."#;
        let (value, repaired) = parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["summary"], "An empire.");
    }

    #[test]
    fn test_truncated_string_closed() {
        let input = r#"{"summary": "unterminated
, "other": "value"}"#;
        assert!(parse_or_repair(input).is_ok());
    }

    #[test]
    fn test_hopeless_input_is_hard_error() {
        let err = parse_or_repair("no json here at all").unwrap_err();
        assert!(matches!(err, WikiError::MalformedOutput(_)));
    }
}
