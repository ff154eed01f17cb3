//! Brief validation: one batched critique call, parsed into a parallel array
//! of results with per-entry fallback.
//!
//! A validator outage degrades scores, it never fails the pipeline. The
//! `degraded` count makes that degradation observable to callers.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::brief::{default_validation, ProjectBrief, ValidationResult, Verdict};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest};
use crate::parse::extract_array;
use crate::prompts::validation_messages;

pub const VALIDATION_TEMPERATURE: f32 = 0.2;
pub const VALIDATION_MAX_TOKENS: u32 = 2000;

/// Validation results for one batch, in input order.
#[derive(Debug, Clone)]
pub struct ValidationBatch {
    pub results: Vec<ValidationResult>,
    /// How many entries fell back to the default result.
    pub degraded: usize,
}

/// Validate a batch of briefs with a single chat call.
///
/// Missing or invalid entries are individually replaced with the default
/// result; a provider error defaults the whole batch.
pub async fn validate_batch(
    gateway: &dyn ChatGateway,
    model: &str,
    briefs: &[ProjectBrief],
    run_id: Uuid,
) -> ValidationBatch {
    if briefs.is_empty() {
        return ValidationBatch {
            results: Vec::new(),
            degraded: 0,
        };
    }

    let chat_req = ChatRequest::new(
        ChatModel::groq(model),
        validation_messages(briefs),
        Attribution::new("validator::batch").with_run(run_id),
    )
    .temperature(VALIDATION_TEMPERATURE)
    .max_tokens(VALIDATION_MAX_TOKENS)
    .json();

    let raw = match gateway.chat(chat_req).await {
        Ok(resp) => resp.content,
        Err(err) => {
            warn!(error = %err, count = briefs.len(), "validator call failed; defaulting all entries");
            return ValidationBatch {
                results: vec![default_validation(); briefs.len()],
                degraded: briefs.len(),
            };
        }
    };

    let values = match extract_array(&raw, &["results", "validations"]) {
        Ok(values) => values,
        Err(err) => {
            warn!(error = %err, count = briefs.len(), "validator output unparsable; defaulting all entries");
            return ValidationBatch {
                results: vec![default_validation(); briefs.len()],
                degraded: briefs.len(),
            };
        }
    };

    let mut results = Vec::with_capacity(briefs.len());
    let mut degraded = 0;

    for index in 0..briefs.len() {
        match values.get(index).and_then(parse_result) {
            Some(result) => results.push(result),
            None => {
                warn!(index, "validator entry missing or invalid; using default");
                degraded += 1;
                results.push(default_validation());
            }
        }
    }

    ValidationBatch { results, degraded }
}

/// Raw JSON structure of one validator entry.
#[derive(Debug, Deserialize)]
struct RawValidation {
    score: Option<f64>,
    verdict: Option<String>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    summary: String,
}

fn parse_result(value: &Value) -> Option<ValidationResult> {
    let raw: RawValidation = serde_json::from_value(value.clone()).ok()?;

    let score = raw.score?.clamp(0.0, 100.0).round() as u8;
    let verdict = match raw.verdict?.to_lowercase().as_str() {
        "approved" => Verdict::Approved,
        "revised" => Verdict::Revised,
        "rejected" => Verdict::Rejected,
        _ => return None,
    };

    Some(ValidationResult {
        score,
        verdict,
        issues: raw.issues,
        summary: raw.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_entry() {
        let entry = json!({
            "score": 84.4,
            "verdict": "Approved",
            "issues": [],
            "summary": "Solid brief."
        });
        let result = parse_result(&entry).unwrap();
        assert_eq!(result.score, 84);
        assert_eq!(result.verdict, Verdict::Approved);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let entry = json!({"score": 180, "verdict": "revised"});
        assert_eq!(parse_result(&entry).unwrap().score, 100);

        let entry = json!({"score": -5, "verdict": "revised"});
        assert_eq!(parse_result(&entry).unwrap().score, 0);
    }

    #[test]
    fn rejects_entries_missing_required_fields() {
        assert!(parse_result(&json!({"verdict": "approved"})).is_none());
        assert!(parse_result(&json!({"score": 70})).is_none());
        assert!(parse_result(&json!({"score": 70, "verdict": "meh"})).is_none());
        assert!(parse_result(&json!("not an object")).is_none());
    }
}
