//! Brief normalization: coerce loosely-typed generation output into a
//! canonical, bounded `ProjectBrief`.
//!
//! Normalization is total and idempotent. Every numeric field is clamped here
//! so no out-of-range value ever reaches validation or ranking.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::brief::{Milestone, MilestoneStatus, ProjectBrief};

pub const MIN_MILESTONE_HOURS: u32 = 2;
pub const MAX_MILESTONE_HOURS: u32 = 80;
pub const MIN_DURATION_DAYS: u32 = 2;
pub const MAX_DURATION_DAYS: u32 = 42;

/// Hours assumed for a milestone that arrives without an estimate.
pub const DEFAULT_MILESTONE_HOURS: u32 = 8;
/// Total-hours fallback when neither the payload nor the milestones give one.
pub const FALLBACK_TOTAL_HOURS: u32 = 50;

const DEFAULT_TITLE: &str = "AI-Generated Engineering Project";

/// Request-derived bounds applied during normalization.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeBounds {
    /// Inclusive difficulty range from the generation request.
    pub difficulty: (u8, u8),
}

impl NormalizeBounds {
    pub fn new(difficulty: (u8, u8)) -> Self {
        Self { difficulty }
    }

    fn clamp_difficulty(&self, raw: Option<u8>) -> u8 {
        let (min, max) = self.difficulty;
        let fallback = min + (max.saturating_sub(min)) / 2;
        raw.unwrap_or(fallback).clamp(min, max)
    }
}

/// Convert one raw generation object into a typed, clamped `ProjectBrief`.
pub fn normalize_brief(value: &Value, bounds: &NormalizeBounds, today: NaiveDate) -> ProjectBrief {
    let milestones: Vec<Milestone> = value
        .get("milestones")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, m)| normalize_milestone(m, i, bounds, today))
                .collect()
        })
        .unwrap_or_default();

    let milestone_hours: u32 = milestones.iter().map(|m| m.estimated_hours).sum();

    // Payload value wins when present and nonzero, then the milestone sum,
    // then the fixed fallback.
    let total_estimated_hours = match u32_field(value, "totalEstimatedHours") {
        Some(h) if h > 0 => h,
        _ if milestone_hours > 0 => milestone_hours,
        _ => FALLBACK_TOTAL_HOURS,
    };

    ProjectBrief {
        title: str_field(value, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        context: str_field(value, "context").unwrap_or_default(),
        problem_statement: str_field(value, "problemStatement").unwrap_or_default(),
        goals: str_list(value, "goals"),
        constraints: str_list(value, "constraints"),
        technical_requirements: str_list(value, "technicalRequirements"),
        deliverables: str_list(value, "deliverables"),
        milestones,
        total_estimated_hours,
    }
}

fn normalize_milestone(
    value: &Value,
    index: usize,
    bounds: &NormalizeBounds,
    today: NaiveDate,
) -> Milestone {
    let due_date = str_field(value, "dueDate")
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| today + Duration::days(7 * (index as i64 + 1)));

    let status = if index == 0 {
        MilestoneStatus::InProgress
    } else {
        MilestoneStatus::Todo
    };

    Milestone {
        id: str_field(value, "id").unwrap_or_else(|| format!("ms-{}", index + 1)),
        title: str_field(value, "title").unwrap_or_else(|| format!("Milestone {}", index + 1)),
        description: str_field(value, "description").unwrap_or_default(),
        due_date,
        status,
        estimated_hours: u32_field(value, "estimatedHours")
            .unwrap_or(DEFAULT_MILESTONE_HOURS)
            .clamp(MIN_MILESTONE_HOURS, MAX_MILESTONE_HOURS),
        deliverables: str_list(value, "deliverables"),
        difficulty: bounds.clamp_difficulty(u8_field(value, "difficulty")),
        duration_days: u32_field(value, "durationDays")
            .unwrap_or(7)
            .clamp(MIN_DURATION_DAYS, MAX_DURATION_DAYS),
        rationale: str_field(value, "rationale").unwrap_or_default(),
        learning_resources: str_list(value, "learningResources"),
        skill_coverage: str_list(value, "skillCoverage"),
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

fn str_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn u32_field(value: &Value, key: &str) -> Option<u32> {
    let raw = value.get(key)?;
    if let Some(n) = raw.as_u64() {
        return Some(n.min(u32::MAX as u64) as u32);
    }
    // Models sometimes emit floats for hour estimates.
    raw.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u32)
}

fn u8_field(value: &Value, key: &str) -> Option<u8> {
    u32_field(value, key).map(|n| n.min(u8::MAX as u32) as u8)
}
