//! Generation pipeline orchestration.
//!
//! One run per request: batch 1 → dedup → validation → conditional top-up →
//! merge → diversity adjustment → ranking. All backend calls are awaited
//! strictly sequentially; each step depends on the prior step's output.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::brief::{
    Candidate, CourseProgram, GenerationRequest, ProjectBrief, ValidationResult, Verdict,
};
use crate::dedup;
use crate::diversity::apply_diversity;
use crate::gateway::{ChatGateway, ProviderError};
use crate::generator::generate_batch;
use crate::validator::validate_batch;

/// Hard cap on the requested project count.
pub const MAX_PROJECT_COUNT: usize = 5;

/// Extra briefs requested in batch 1 beyond the target, so rejections and
/// duplicates don't immediately force a top-up.
pub const OVERGENERATION_MARGIN: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Both generation attempts produced zero non-rejected candidates.
    #[error("generation quality too low: no viable candidates after {batches} generation batch(es)")]
    GenerationQualityTooLow { batches: usize },
}

/// Outcome of one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    pub run_id: Uuid,
    /// Ranked candidates: approved, then revised, then rejected, each tier by
    /// score descending.
    pub candidates: Vec<Candidate>,
    /// Validator entries that fell back to the default result across all
    /// batches. Nonzero values indicate validation degraded, not failed.
    pub validation_degraded: usize,
}

/// Run the full generation pipeline for one request.
pub async fn generate_candidates(
    gateway: Arc<dyn ChatGateway>,
    model: &str,
    catalog: &[CourseProgram],
    request: &GenerationRequest,
) -> Result<PipelineRun, PipelineError> {
    validate_request(request)?;

    let courses: Vec<CourseProgram> = catalog
        .iter()
        .filter(|c| request.selected_course_ids.contains(&c.id))
        .cloned()
        .collect();
    if courses.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "selectedCourseIds matched no known course".to_string(),
        ));
    }

    let run_id = Uuid::new_v4();
    let today = Utc::now().date_naive();
    let target = request.project_count;
    let mut seen_signatures = HashSet::new();
    let mut degraded = 0;

    // --- Batch 1 ---
    let batch_size = target + OVERGENERATION_MARGIN;
    info!(%run_id, batch_size, "generating candidate briefs");
    let raw = generate_batch(
        gateway.as_ref(),
        model,
        request,
        &courses,
        batch_size,
        &[],
        run_id,
        today,
    )
    .await?;

    let briefs = dedup::dedupe(raw, &mut seen_signatures);
    info!(%run_id, kept = briefs.len(), "deduplicated batch 1");

    let validation = validate_batch(gateway.as_ref(), model, &briefs, run_id).await;
    degraded += validation.degraded;

    let mut working: Vec<(ProjectBrief, ValidationResult)> =
        briefs.into_iter().zip(validation.results).collect();

    let mut batches = 1;
    let viable = count_viable(&working);
    info!(%run_id, viable, target, "validated batch 1");

    // --- Top-up ---
    if viable < target {
        let deficit = target - viable;
        let avoid: Vec<ProjectBrief> = surviving_briefs(&working);
        info!(%run_id, deficit, avoid = avoid.len(), "generating top-up batch");

        let raw = generate_batch(
            gateway.as_ref(),
            model,
            request,
            &courses,
            deficit,
            &avoid,
            run_id,
            today,
        )
        .await?;
        batches += 1;

        let briefs = dedup::dedupe(raw, &mut seen_signatures);
        let validation = validate_batch(gateway.as_ref(), model, &briefs, run_id).await;
        degraded += validation.degraded;

        working.extend(briefs.into_iter().zip(validation.results));
    }

    if count_viable(&working) == 0 {
        return Err(PipelineError::GenerationQualityTooLow { batches });
    }

    if degraded > 0 {
        warn!(%run_id, degraded, "validation degraded for some candidates");
    }

    // --- Diversity + ranking ---
    let candidates: Vec<Candidate> = working
        .into_iter()
        .map(|(brief, validation)| Candidate {
            id: Uuid::new_v4(),
            course_ids: request.selected_course_ids.clone(),
            brief,
            validation,
        })
        .collect();

    let ranked = rank_candidates(apply_diversity(&candidates));
    info!(%run_id, count = ranked.len(), "pipeline complete");

    Ok(PipelineRun {
        run_id,
        candidates: ranked,
        validation_degraded: degraded,
    })
}

/// Sort by verdict precedence (approved < revised < rejected), then score
/// descending. Stable, so equal entries keep their relative order.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.validation
            .verdict
            .precedence()
            .cmp(&b.validation.verdict.precedence())
            .then(b.validation.score.cmp(&a.validation.score))
    });
    candidates
}

fn validate_request(request: &GenerationRequest) -> Result<(), PipelineError> {
    if request.project_count == 0 || request.project_count > MAX_PROJECT_COUNT {
        return Err(PipelineError::InvalidRequest(format!(
            "projectCount must be 1-{MAX_PROJECT_COUNT}, got {}",
            request.project_count
        )));
    }
    let (dmin, dmax) = request.difficulty_range;
    if dmin > dmax {
        return Err(PipelineError::InvalidRequest(format!(
            "difficultyRange is inverted: [{dmin}, {dmax}]"
        )));
    }
    let (wmin, wmax) = request.duration_range_weeks;
    if wmin > wmax {
        return Err(PipelineError::InvalidRequest(format!(
            "durationRangeWeeks is inverted: [{wmin}, {wmax}]"
        )));
    }
    if request.selected_course_ids.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "selectedCourseIds must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn count_viable(working: &[(ProjectBrief, ValidationResult)]) -> usize {
    working
        .iter()
        .filter(|(_, v)| v.verdict != Verdict::Rejected)
        .count()
}

fn surviving_briefs(working: &[(ProjectBrief, ValidationResult)]) -> Vec<ProjectBrief> {
    working
        .iter()
        .filter(|(_, v)| v.verdict != Verdict::Rejected)
        .map(|(b, _)| b.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::FocusMode;

    fn candidate(score: u8, verdict: Verdict) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            course_ids: vec![],
            brief: ProjectBrief {
                title: format!("{verdict:?} {score}"),
                context: String::new(),
                problem_statement: String::new(),
                goals: vec![],
                constraints: vec![],
                technical_requirements: vec![],
                deliverables: vec![],
                milestones: vec![],
                total_estimated_hours: 0,
            },
            validation: ValidationResult {
                score,
                verdict,
                issues: vec![],
                summary: String::new(),
            },
        }
    }

    #[test]
    fn ranking_orders_by_verdict_then_score() {
        let ranked = rank_candidates(vec![
            candidate(95, Verdict::Rejected),
            candidate(70, Verdict::Approved),
            candidate(88, Verdict::Revised),
            candidate(90, Verdict::Approved),
        ]);

        let verdicts: Vec<Verdict> = ranked.iter().map(|c| c.validation.verdict).collect();
        assert_eq!(
            verdicts,
            vec![
                Verdict::Approved,
                Verdict::Approved,
                Verdict::Revised,
                Verdict::Rejected
            ]
        );
        assert_eq!(ranked[0].validation.score, 90);
        assert_eq!(ranked[1].validation.score, 70);
    }

    #[test]
    fn request_validation_rejects_bad_bounds() {
        let mut request = GenerationRequest {
            selected_course_ids: vec!["c1".to_string()],
            project_count: 3,
            focus_mode: FocusMode::Balanced,
            custom_prompt: None,
            difficulty_range: (2, 4),
            duration_range_weeks: (4, 8),
            include_external_context: false,
            external_context: None,
        };
        assert!(validate_request(&request).is_ok());

        request.project_count = 0;
        assert!(validate_request(&request).is_err());
        request.project_count = 9;
        assert!(validate_request(&request).is_err());

        request.project_count = 3;
        request.difficulty_range = (4, 2);
        assert!(validate_request(&request).is_err());

        request.difficulty_range = (2, 4);
        request.selected_course_ids.clear();
        assert!(validate_request(&request).is_err());
    }
}
