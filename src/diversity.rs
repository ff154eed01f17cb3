//! Diversity scoring: penalize candidates that are textually too similar to a
//! higher-ranked candidate that survived validation.
//!
//! `apply_diversity` is pure — it returns adjusted copies and never mutates
//! its input, so re-running it is deterministic.

use std::collections::HashSet;

use crate::brief::{Candidate, ProjectBrief, Verdict};

/// Above this similarity a score penalty and verdict downgrade apply.
pub const PENALTY_THRESHOLD: f64 = 0.55;
/// Above this similarity the candidate is rejected outright.
pub const REJECT_THRESHOLD: f64 = 0.72;
/// Penalty points per unit of similarity above the threshold.
pub const PENALTY_SCALE: f64 = 120.0;

/// How many goals/deliverables/milestone titles feed the signature.
const SIGNATURE_LIST_ITEMS: usize = 3;
/// Tokens shorter than this carry no signal.
const MIN_TOKEN_LEN: usize = 3;

/// Token set for similarity comparison: title, problem statement, and the
/// first few goals, deliverables and milestone titles.
pub fn similarity_tokens(brief: &ProjectBrief) -> HashSet<String> {
    let mut text = String::new();
    text.push_str(&brief.title);
    text.push(' ');
    text.push_str(&brief.problem_statement);
    for goal in brief.goals.iter().take(SIGNATURE_LIST_ITEMS) {
        text.push(' ');
        text.push_str(goal);
    }
    for deliverable in brief.deliverables.iter().take(SIGNATURE_LIST_ITEMS) {
        text.push(' ');
        text.push_str(deliverable);
    }
    for milestone in brief.milestones.iter().take(SIGNATURE_LIST_ITEMS) {
        text.push(' ');
        text.push_str(&milestone.title);
    }

    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Jaccard index of two token sets. Empty-vs-empty counts as identical.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Apply diversity penalties.
///
/// Walks candidates in score-descending order keeping a list of survivors;
/// each candidate is compared against all kept (non-rejected) entries. Above
/// `PENALTY_THRESHOLD` the score drops proportionally and the verdict is
/// demoted one step; above `REJECT_THRESHOLD` the verdict is forced to
/// rejected. Returns adjusted candidates in walk order.
pub fn apply_diversity(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .validation
            .score
            .cmp(&candidates[a].validation.score)
            .then(a.cmp(&b))
    });

    let mut kept: Vec<(HashSet<String>, String)> = Vec::new();
    let mut adjusted = Vec::with_capacity(candidates.len());

    for index in order {
        let mut candidate = candidates[index].clone();
        let tokens = similarity_tokens(&candidate.brief);

        let closest = kept
            .iter()
            .map(|(kept_tokens, title)| (jaccard(&tokens, kept_tokens), title.as_str()))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((similarity, title)) = closest {
            if similarity > PENALTY_THRESHOLD {
                let penalty = (similarity - PENALTY_THRESHOLD) * PENALTY_SCALE;
                let new_score = (candidate.validation.score as f64 - penalty).clamp(0.0, 100.0);
                candidate.validation.score = new_score.round() as u8;
                candidate.validation.issues.push(format!(
                    "Too similar to \"{title}\" (similarity {similarity:.2}); diversity penalty applied"
                ));
                candidate.validation.verdict = candidate.validation.verdict.downgrade();

                if similarity > REJECT_THRESHOLD {
                    candidate.validation.verdict = Verdict::Rejected;
                }
            }
        }

        if candidate.validation.verdict != Verdict::Rejected {
            kept.push((tokens, candidate.brief.title.clone()));
        }
        adjusted.push(candidate);
    }

    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::{ProjectBrief, ValidationResult};
    use uuid::Uuid;

    fn brief(title: &str, problem: &str, goals: &[&str]) -> ProjectBrief {
        ProjectBrief {
            title: title.to_string(),
            context: String::new(),
            problem_statement: problem.to_string(),
            goals: goals.iter().map(|s| s.to_string()).collect(),
            constraints: vec![],
            technical_requirements: vec![],
            deliverables: vec![],
            milestones: vec![],
            total_estimated_hours: 40,
        }
    }

    fn candidate(brief: ProjectBrief, score: u8, verdict: Verdict) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            course_ids: vec![],
            brief,
            validation: ValidationResult {
                score,
                verdict,
                issues: vec![],
                summary: String::new(),
            },
        }
    }

    #[test]
    fn short_tokens_are_discarded() {
        let tokens = similarity_tokens(&brief("An IoT hub on a pi", "it is ok", &[]));
        assert!(tokens.contains("iot"));
        assert!(tokens.contains("hub"));
        assert!(!tokens.contains("an"));
        assert!(!tokens.contains("pi"));
        assert!(!tokens.contains("it"));
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = similarity_tokens(&brief("Solar tracker design", "Track the sun cheaply", &[]));
        let b = similarity_tokens(&brief("Solar tracker design", "Track the sun cheaply", &[]));
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn jaccard_of_disjoint_sets_is_zero() {
        let a = similarity_tokens(&brief("Solar tracker", "photovoltaic alignment", &[]));
        let b = similarity_tokens(&brief("Wastewater plant", "effluent processing", &[]));
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn token_identical_duplicate_is_rejected() {
        let original = candidate(
            brief("Solar tracker design", "Track the sun across the sky cheaply", &["alignment"]),
            90,
            Verdict::Approved,
        );
        let duplicate = candidate(
            brief("Solar tracker design", "Track the sun across the sky cheaply", &["alignment"]),
            80,
            Verdict::Approved,
        );

        let adjusted = apply_diversity(&[original, duplicate]);
        assert_eq!(adjusted[0].validation.verdict, Verdict::Approved);
        assert_eq!(adjusted[0].validation.score, 90);
        // Jaccard 1.0 > 0.72: forced rejection, and hidden follows.
        assert_eq!(adjusted[1].validation.verdict, Verdict::Rejected);
        assert!(adjusted[1].hidden());
        assert!(!adjusted[1].validation.issues.is_empty());
    }

    #[test]
    fn dissimilar_candidates_are_untouched() {
        let a = candidate(
            brief("Solar tracker", "photovoltaic panel alignment control", &[]),
            85,
            Verdict::Approved,
        );
        let b = candidate(
            brief("Wastewater monitor", "effluent turbidity sensing network", &[]),
            75,
            Verdict::Approved,
        );

        let adjusted = apply_diversity(&[a, b]);
        assert_eq!(adjusted[0].validation.score, 85);
        assert_eq!(adjusted[1].validation.score, 75);
        assert_eq!(adjusted[1].validation.verdict, Verdict::Approved);
        assert!(adjusted[1].validation.issues.is_empty());
    }

    #[test]
    fn later_duplicate_of_rejected_candidate_is_not_compared_against_it() {
        // The middle candidate was already rejected by validation, so it never
        // enters the kept list; a later near-duplicate of it is only compared
        // against non-rejected survivors.
        let top = candidate(
            brief("Solar tracker design", "Track the sun across the sky cheaply", &[]),
            90,
            Verdict::Approved,
        );
        let rejected = candidate(
            brief("Bridge strain gauge network", "Measure strain on a highway bridge", &[]),
            80,
            Verdict::Rejected,
        );
        let duplicate_of_rejected = candidate(
            brief("Bridge strain gauge network", "Measure strain on a highway bridge", &[]),
            70,
            Verdict::Approved,
        );

        let adjusted = apply_diversity(&[top, rejected, duplicate_of_rejected]);
        assert_eq!(adjusted[1].validation.verdict, Verdict::Rejected);
        assert_eq!(adjusted[2].validation.verdict, Verdict::Approved);
        assert_eq!(adjusted[2].validation.score, 70);
        assert!(adjusted[2].validation.issues.is_empty());
    }

    #[test]
    fn inputs_are_never_mutated() {
        let a = candidate(brief("Same title here", "same problem statement text", &[]), 90, Verdict::Approved);
        let b = candidate(brief("Same title here", "same problem statement text", &[]), 80, Verdict::Approved);
        let input = vec![a, b];

        let _ = apply_diversity(&input);
        assert_eq!(input[1].validation.verdict, Verdict::Approved);
        assert_eq!(input[1].validation.score, 80);

        // Re-running yields the same adjustments.
        let first = apply_diversity(&input);
        let second = apply_diversity(&input);
        assert_eq!(first[1].validation, second[1].validation);
    }
}
