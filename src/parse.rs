//! Tolerant extraction of JSON payloads from model output.
//!
//! Models wrap JSON in markdown fences, preamble text, or an envelope object.
//! Extraction is a discriminated result rather than throw/catch parsing so
//! malformed fixtures can be tested deterministically.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BriefParseError {
    #[error("no JSON payload found in model output")]
    NoJson,
    #[error("invalid JSON: {0}")]
    Json(String),
    #[error("unexpected JSON shape: {0}")]
    Shape(String),
}

/// Extract an array of JSON objects from raw model output.
///
/// Accepts a bare array, or an object carrying the array under one of
/// `envelope_keys`. Anything else is a shape error; callers treat errors as
/// an empty batch.
pub fn extract_array(raw: &str, envelope_keys: &[&str]) -> Result<Vec<Value>, BriefParseError> {
    let value = extract_value(raw)?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(ref map) => {
            for key in envelope_keys {
                if let Some(Value::Array(items)) = map.get(*key) {
                    return Ok(items.clone());
                }
            }
            Err(BriefParseError::Shape(format!(
                "expected an array or an object with one of {envelope_keys:?}"
            )))
        }
        other => Err(BriefParseError::Shape(format!(
            "expected an array, got {}",
            type_name(&other)
        ))),
    }
}

/// Extract candidate brief objects: bare array or `{"candidates": [...]}`.
pub fn extract_candidate_values(raw: &str) -> Result<Vec<Value>, BriefParseError> {
    extract_array(raw, &["candidates"])
}

/// Extract a single JSON value: strip fences, try a direct parse, then fall
/// back to slicing between the first/last matching delimiters.
fn extract_value(raw: &str) -> Result<Value, BriefParseError> {
    let stripped = strip_code_fences(raw.trim());
    let trimmed = stripped.trim();

    if trimmed.is_empty() {
        return Err(BriefParseError::NoJson);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => Ok(v),
        Err(direct_err) => {
            // Prefer an array slice; briefs come back as arrays.
            if let Some(slice) = slice_between(trimmed, '[', ']') {
                if let Ok(v) = serde_json::from_str::<Value>(slice) {
                    return Ok(v);
                }
            }
            if let Some(slice) = slice_between(trimmed, '{', '}') {
                if let Ok(v) = serde_json::from_str::<Value>(slice) {
                    return Ok(v);
                }
            }
            Err(BriefParseError::Json(direct_err.to_string()))
        }
    }
}

/// Drop a leading ```/```json fence line and a trailing ``` fence.
fn strip_code_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Skip the info string (e.g. "json") up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body)
}

/// Substring from the first `open` to the last `close`, if they nest sanely.
fn slice_between(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&s[start..end + close.len_utf8()])
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
