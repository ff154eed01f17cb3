//! Domain model: project briefs, milestones, validation verdicts, candidates,
//! and the generation request that drives a pipeline run.
//!
//! Wire names are camelCase because the same shapes are round-tripped through
//! generation and validation prompts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// COURSE CONTEXT
// =============================================================================

/// Skill score trend direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

/// One tracked skill area with a 0-100 proficiency score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillArea {
    pub name: String,
    pub score: u8,
    pub trend: Trend,
}

/// Progress state of one syllabus week.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Completed,
    Current,
    Locked,
}

/// One week of a course syllabus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekModule {
    pub week: u32,
    pub title: String,
    pub topics: Vec<String>,
    pub status: ModuleStatus,
    #[serde(default)]
    pub score: Option<u8>,
}

/// A course from the catalog; the source context briefs are generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgram {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub total_weeks: u32,
    pub week_modules: Vec<WeekModule>,
    pub skills: Vec<SkillArea>,
}

// =============================================================================
// PROJECT BRIEF
// =============================================================================

/// Milestone progress state. The first milestone of a fresh brief is active,
/// the rest are pending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MilestoneStatus {
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "todo")]
    Todo,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::InProgress => "in-progress",
            MilestoneStatus::Todo => "todo",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: MilestoneStatus,
    pub estimated_hours: u32,
    pub deliverables: Vec<String>,
    pub difficulty: u8,
    pub duration_days: u32,
    pub rationale: String,
    pub learning_resources: Vec<String>,
    pub skill_coverage: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBrief {
    pub title: String,
    pub context: String,
    pub problem_statement: String,
    pub goals: Vec<String>,
    pub constraints: Vec<String>,
    pub technical_requirements: Vec<String>,
    pub deliverables: Vec<String>,
    pub milestones: Vec<Milestone>,
    pub total_estimated_hours: u32,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validator's categorical judgment of a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approved,
    Revised,
    Rejected,
}

impl Verdict {
    /// Sort key: approved before revised before rejected.
    pub fn precedence(&self) -> u8 {
        match self {
            Verdict::Approved => 0,
            Verdict::Revised => 1,
            Verdict::Rejected => 2,
        }
    }

    /// Demote one step. Rejected stays rejected.
    pub fn downgrade(&self) -> Verdict {
        match self {
            Verdict::Approved => Verdict::Revised,
            Verdict::Revised | Verdict::Rejected => Verdict::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// Quality score, 0-100.
    pub score: u8,
    pub verdict: Verdict,
    pub issues: Vec<String>,
    pub summary: String,
}

/// Substitute for missing or unparsable validator entries. The pipeline never
/// hard-fails solely because validation was unparsable.
pub fn default_validation() -> ValidationResult {
    ValidationResult {
        score: 55,
        verdict: Verdict::Revised,
        issues: vec!["Validator response was missing or unparsable for this brief".to_string()],
        summary: "Validation unavailable; defaulted to a revised verdict".to_string(),
    }
}

// =============================================================================
// CANDIDATE
// =============================================================================

/// One quality-checked project option produced by a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Unique per pipeline run.
    pub id: Uuid,
    pub course_ids: Vec<String>,
    pub brief: ProjectBrief,
    pub validation: ValidationResult,
}

impl Candidate {
    /// Derived, never stored: a candidate is hidden iff its verdict is
    /// rejected. Recomputing keeps the flag honest when a diversity penalty
    /// changes the verdict.
    pub fn hidden(&self) -> bool {
        self.validation.verdict == Verdict::Rejected
    }
}

// =============================================================================
// GENERATION REQUEST
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    /// Target the student's weakest skills.
    Shortcomings,
    /// Build on the strongest skills.
    Strengths,
    Balanced,
}

/// Pipeline entry point payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub selected_course_ids: Vec<String>,
    /// How many distinct projects the caller wants, 1-5.
    pub project_count: usize,
    pub focus_mode: FocusMode,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Inclusive milestone difficulty bounds.
    pub difficulty_range: (u8, u8),
    /// Overall project duration guidance, in weeks.
    pub duration_range_weeks: (u32, u32),
    #[serde(default)]
    pub include_external_context: bool,
    #[serde(default)]
    pub external_context: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_precedence_orders_approved_first() {
        assert!(Verdict::Approved.precedence() < Verdict::Revised.precedence());
        assert!(Verdict::Revised.precedence() < Verdict::Rejected.precedence());
    }

    #[test]
    fn verdict_downgrade_is_one_step_and_sticky() {
        assert_eq!(Verdict::Approved.downgrade(), Verdict::Revised);
        assert_eq!(Verdict::Revised.downgrade(), Verdict::Rejected);
        assert_eq!(Verdict::Rejected.downgrade(), Verdict::Rejected);
    }

    #[test]
    fn hidden_tracks_verdict() {
        let mut candidate = Candidate {
            id: Uuid::new_v4(),
            course_ids: vec![],
            brief: ProjectBrief {
                title: String::new(),
                context: String::new(),
                problem_statement: String::new(),
                goals: vec![],
                constraints: vec![],
                technical_requirements: vec![],
                deliverables: vec![],
                milestones: vec![],
                total_estimated_hours: 0,
            },
            validation: default_validation(),
        };
        assert!(!candidate.hidden());
        candidate.validation.verdict = Verdict::Rejected;
        assert!(candidate.hidden());
    }

    #[test]
    fn request_round_trips_camel_case() {
        let json = r#"{
            "selectedCourseIds": ["ec-301"],
            "projectCount": 3,
            "focusMode": "shortcomings",
            "difficultyRange": [2, 4],
            "durationRangeWeeks": [4, 8]
        }"#;
        let req: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.project_count, 3);
        assert_eq!(req.focus_mode, FocusMode::Shortcomings);
        assert_eq!(req.difficulty_range, (2, 4));
        assert!(req.external_context.is_none());
    }
}
