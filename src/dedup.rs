//! Cheap near-exact dedup, run before the expensive validation call.
//!
//! Signature: normalized title + the first ~120 characters of the normalized
//! problem statement. First brief seen per signature wins; generation order
//! is preserved.

use std::collections::HashSet;

use crate::brief::ProjectBrief;

/// How much of the problem statement participates in the signature.
const PROBLEM_PREFIX_CHARS: usize = 120;

/// Compact normalized fingerprint of a brief.
pub fn signature(brief: &ProjectBrief) -> String {
    let title = normalize_text(&brief.title);
    let problem = normalize_text(&brief.problem_statement);
    let prefix: String = problem.chars().take(PROBLEM_PREFIX_CHARS).collect();
    format!("{title}::{prefix}")
}

/// Keep the first brief per unique signature. The seen-set is caller-owned so
/// a top-up batch also dedupes against earlier batches.
pub fn dedupe(briefs: Vec<ProjectBrief>, seen: &mut HashSet<String>) -> Vec<ProjectBrief> {
    briefs
        .into_iter()
        .filter(|brief| seen.insert(signature(brief)))
        .collect()
}

/// Lowercase, strip punctuation, collapse whitespace runs to single spaces.
fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}
