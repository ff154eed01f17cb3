//! Prompt templates for brief generation, validation and mentoring.
//!
//! Domain logic for rendering prompts. Provider-agnostic.

use chrono::NaiveDate;

use crate::brief::{
    CourseProgram, FocusMode, GenerationRequest, ModuleStatus, ProjectBrief,
};
use crate::gateway::Message;
use crate::normalize::{
    MAX_DURATION_DAYS, MAX_MILESTONE_HOURS, MIN_DURATION_DAYS, MIN_MILESTONE_HOURS,
};

/// Prior briefs included in the anti-duplication block, at most.
pub const AVOID_LIST_MAX: usize = 5;

/// Problem statements in the avoid block are truncated to this many chars.
const AVOID_PROBLEM_CHARS: usize = 160;

// =============================================================================
// Course context
// =============================================================================

/// Compact rendering of the selected courses for system prompts.
pub fn render_course_context(courses: &[CourseProgram]) -> String {
    let mut out = String::new();

    for course in courses {
        out.push_str(&format!(
            "COURSE: {} — {} ({} weeks)\n  {}\n",
            course.code, course.title, course.total_weeks, course.description
        ));

        let completed: Vec<String> = course
            .week_modules
            .iter()
            .filter(|w| w.status == ModuleStatus::Completed)
            .map(|w| {
                let score = w
                    .score
                    .map(|s| format!(" (Score: {s}%)"))
                    .unwrap_or_default();
                format!("  - Week {}: {}{} — Topics: {}", w.week, w.title, score, w.topics.join(", "))
            })
            .collect();
        if !completed.is_empty() {
            out.push_str("COMPLETED MODULES:\n");
            out.push_str(&completed.join("\n"));
            out.push('\n');
        }

        if let Some(current) = course
            .week_modules
            .iter()
            .find(|w| w.status == ModuleStatus::Current)
        {
            out.push_str(&format!(
                "CURRENT MODULE:\n  Week {}: {} — Topics: {}\n",
                current.week,
                current.title,
                current.topics.join(", ")
            ));
        }

        let upcoming: Vec<String> = course
            .week_modules
            .iter()
            .filter(|w| w.status == ModuleStatus::Locked)
            .map(|w| format!("  - Week {}: {} — Topics: {}", w.week, w.title, w.topics.join(", ")))
            .collect();
        if !upcoming.is_empty() {
            out.push_str("UPCOMING MODULES (syllabus preview):\n");
            out.push_str(&upcoming.join("\n"));
            out.push('\n');
        }

        let skills: Vec<String> = course
            .skills
            .iter()
            .map(|s| format!("  - {}: {}/100 (trend: {})", s.name, s.score, s.trend.as_str()))
            .collect();
        if !skills.is_empty() {
            out.push_str("SKILL PROFICIENCY:\n");
            out.push_str(&skills.join("\n"));
            out.push('\n');
        }

        let strong: Vec<&str> = course
            .skills
            .iter()
            .filter(|s| s.score >= 75)
            .map(|s| s.name.as_str())
            .collect();
        let weak: Vec<&str> = course
            .skills
            .iter()
            .filter(|s| s.score < 65)
            .map(|s| s.name.as_str())
            .collect();
        out.push_str(&format!(
            "  Strongest areas: {}\n  Weakest areas: {}\n\n",
            if strong.is_empty() { "N/A".to_string() } else { strong.join(", ") },
            if weak.is_empty() { "N/A".to_string() } else { weak.join(", ") },
        ));
    }

    out.trim_end().to_string()
}

// =============================================================================
// Generation
// =============================================================================

const GENERATION_ROLE: &str = "You are an expert engineering curriculum designer and industry \
project architect. Your job is to generate personalized, industry-grade project briefs for an \
engineering student based on their course syllabus, demonstrated competencies, and skill gaps.

Every project MUST:
1. Be realistic — modeled after actual industry problems
2. Be achievable within the requested duration
3. Directly apply concepts from the completed course modules
4. Include professional deliverables (reports, schematics, code, presentations)
5. Have clear milestones with estimated hours";

fn focus_instruction(mode: FocusMode) -> &'static str {
    match mode {
        FocusMode::Shortcomings => {
            "Focus each project on the student's WEAKEST skills: add preparatory tasks in early \
             milestones and make the weak areas central to the problem statement."
        }
        FocusMode::Strengths => {
            "Focus each project on the student's STRONGEST skills: include stretch goals and \
             advanced requirements that push those areas further."
        }
        FocusMode::Balanced => {
            "Balance each project between reinforcing weak skills and exercising strong ones."
        }
    }
}

/// System prompt for a generation batch.
///
/// Encodes the batch size, focus mode, difficulty/duration bounds, the course
/// context, and the JSON contract.
pub fn generation_system_prompt(
    request: &GenerationRequest,
    courses: &[CourseProgram],
    batch_size: usize,
) -> String {
    let (dmin, dmax) = request.difficulty_range;
    let (wmin, wmax) = request.duration_range_weeks;

    format!(
        "{GENERATION_ROLE}\n\n\
         {}\n\n\
         {}\n\n\
         You must respond with ONLY valid JSON, no markdown, no backticks, no explanation: \
         a JSON array of exactly {batch_size} project brief objects. Each object must match \
         this exact structure:\n\n\
         {{\n\
         \x20 \"title\": \"string - compelling project title\",\n\
         \x20 \"context\": \"string - 2-3 sentence industry scenario that motivates the project\",\n\
         \x20 \"problemStatement\": \"string - clear engineering problem statement (3-4 sentences)\",\n\
         \x20 \"goals\": [\"string - 4-6 specific learning/engineering goals tied to course modules\"],\n\
         \x20 \"constraints\": [\"string - 4-6 realistic project constraints (budget, size, power, etc.)\"],\n\
         \x20 \"technicalRequirements\": [\"string - 6-8 specific technical requirements\"],\n\
         \x20 \"deliverables\": [\"string - 5-7 professional deliverables\"],\n\
         \x20 \"milestones\": [\n\
         \x20   {{\n\
         \x20     \"id\": \"ms-1\",\n\
         \x20     \"title\": \"string\",\n\
         \x20     \"description\": \"string - what the student needs to accomplish\",\n\
         \x20     \"dueDate\": \"YYYY-MM-DD\",\n\
         \x20     \"status\": \"todo\",\n\
         \x20     \"estimatedHours\": number,\n\
         \x20     \"deliverables\": [\"string - 2-4 specific deliverables for this milestone\"],\n\
         \x20     \"difficulty\": number,\n\
         \x20     \"durationDays\": number,\n\
         \x20     \"rationale\": \"string - why this milestone matters for the student\",\n\
         \x20     \"learningResources\": [\"string - 1-3 resources\"],\n\
         \x20     \"skillCoverage\": [\"string - skills this milestone exercises\"]\n\
         \x20   }}\n\
         \x20 ],\n\
         \x20 \"totalEstimatedHours\": number\n\
         }}\n\n\
         IMPORTANT:\n\
         - The {batch_size} briefs must be clearly DISTINCT from each other: different industry \
           scenarios, different problem statements, different deliverables\n\
         - Milestone difficulty must be between {dmin} and {dmax}\n\
         - Milestone estimatedHours must be between {MIN_MILESTONE_HOURS} and {MAX_MILESTONE_HOURS}\n\
         - Milestone durationDays must be between {MIN_DURATION_DAYS} and {MAX_DURATION_DAYS}\n\
         - The whole project should span roughly {wmin}-{wmax} weeks\n\
         - Generate 4-6 milestones per brief, each building on previous ones\n\
         - Space milestone due dates approximately 7-10 days apart",
        focus_instruction(request.focus_mode),
        render_course_context(courses),
    )
}

/// Anti-duplication block: titles and truncated problem statements of prior
/// briefs the model must steer away from.
pub fn avoid_block(avoid: &[ProjectBrief]) -> String {
    if avoid.is_empty() {
        return String::new();
    }

    let entries: Vec<String> = avoid
        .iter()
        .take(AVOID_LIST_MAX)
        .map(|b| {
            let problem: String = b.problem_statement.chars().take(AVOID_PROBLEM_CHARS).collect();
            format!("- \"{}\": {}", b.title, problem)
        })
        .collect();

    format!(
        "AVOID duplicating these existing briefs — every new brief must differ in scenario, \
         problem and deliverables:\n{}",
        entries.join("\n")
    )
}

/// User prompt for a generation batch.
pub fn generation_user_prompt(
    request: &GenerationRequest,
    batch_size: usize,
    avoid: &[ProjectBrief],
    today: NaiveDate,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!(
        "Generate {batch_size} personalized industry-grade project brief(s) for this student.\n\n\
         IMPORTANT CONTEXT:\n\
         - Today's date is {}\n\
         - Milestone due dates should start from {}",
        today,
        today + chrono::Duration::days(7),
    ));

    if let Some(custom) = request.custom_prompt.as_deref() {
        if !custom.trim().is_empty() {
            parts.push(format!("STUDENT REQUEST:\n{}", custom.trim()));
        }
    }

    if request.include_external_context {
        if let Some(external) = &request.external_context {
            parts.push(format!(
                "EXTERNAL CONTEXT (additional signal about the student):\n{}",
                serde_json::to_string_pretty(external).unwrap_or_default()
            ));
        }
    }

    let avoid = avoid_block(avoid);
    if !avoid.is_empty() {
        parts.push(avoid);
    }

    parts.push("Generate the JSON array now.".to_string());
    parts.join("\n\n")
}

pub fn generation_messages(
    request: &GenerationRequest,
    courses: &[CourseProgram],
    batch_size: usize,
    avoid: &[ProjectBrief],
    today: NaiveDate,
) -> Vec<Message> {
    vec![
        Message::system(generation_system_prompt(request, courses, batch_size)),
        Message::user(generation_user_prompt(request, batch_size, avoid, today)),
    ]
}

// =============================================================================
// Validation
// =============================================================================

const VALIDATION_ROLE: &str = "You are a strict engineering curriculum reviewer. You score \
project briefs for realism, achievability, alignment with the course content, and professional \
quality. You are honest about weaknesses and never inflate scores.";

/// System prompt for the batched validation call.
pub fn validation_system_prompt(brief_count: usize) -> String {
    format!(
        "{VALIDATION_ROLE}\n\n\
         You will receive a JSON array of {brief_count} project briefs. Evaluate each brief \
         independently.\n\n\
         You must respond with ONLY valid JSON: an array of exactly {brief_count} result \
         objects, in the SAME ORDER as the input briefs. Each result must match this exact \
         structure:\n\n\
         {{\n\
         \x20 \"score\": number between 0 and 100,\n\
         \x20 \"verdict\": \"approved\" | \"revised\" | \"rejected\",\n\
         \x20 \"issues\": [\"string - concrete problems found, empty if none\"],\n\
         \x20 \"summary\": \"string - one-sentence assessment\"\n\
         }}\n\n\
         Verdict rules:\n\
         - \"approved\": realistic, achievable, well-aligned (score 70+)\n\
         - \"revised\": usable but with real issues worth fixing (score 40-69)\n\
         - \"rejected\": unrealistic, incoherent, or off-syllabus (score below 40)"
    )
}

pub fn validation_messages(briefs: &[ProjectBrief]) -> Vec<Message> {
    let payload = serde_json::to_string_pretty(briefs).unwrap_or_else(|_| "[]".to_string());
    vec![
        Message::system(validation_system_prompt(briefs.len())),
        Message::user(format!("Evaluate these briefs:\n\n{payload}")),
    ]
}

// =============================================================================
// Mentor
// =============================================================================

pub const MENTOR_SYSTEM_PROMPT: &str = "You are the AI Project Mentor for an adaptive learning \
platform; you guide engineering students through their coursework and personalized industry \
projects.

YOUR ROLE & PERSONALITY:
- You are a supportive, knowledgeable engineering mentor with industry experience.
- You use the Socratic method — guide students to discover answers rather than giving direct solutions.
- You are warm but professional, encouraging but honest about gaps.
- You connect theoretical concepts to real-world engineering practice.
- You proactively remind students about upcoming milestones and deadlines.
- Keep responses concise (2-4 paragraphs max). Don't write essays.

RULES:
- NEVER write code or give complete solutions. Guide the thinking process.
- ALWAYS relate advice back to the specific course content and skill levels.
- When a student is struggling (low scores in a skill), be extra supportive and break things into smaller steps.
- When a student excels, challenge them with deeper questions and stretch goals.
- If the student has a project, reference its milestones and deliverables.
- Use markdown-like formatting sparingly: use **bold** for emphasis, bullet points for lists.";

/// Render the active project for the mentor's system prompt.
pub fn render_project_context(brief: Option<&ProjectBrief>) -> String {
    let Some(brief) = brief else {
        return "PROJECT: Not yet generated.".to_string();
    };

    let milestones: Vec<String> = brief
        .milestones
        .iter()
        .map(|m| {
            format!(
                "    - {} ({}) — Due: {}, ~{}h",
                m.title,
                m.status.as_str(),
                m.due_date,
                m.estimated_hours
            )
        })
        .collect();

    format!(
        "CURRENT PROJECT: \"{}\"\n\
         \x20 Problem: {}\n\
         \x20 Milestones:\n{}\n\
         \x20 Total estimated hours: {}h\n\
         \x20 Deliverables: {}",
        brief.title,
        brief.problem_statement,
        milestones.join("\n"),
        brief.total_estimated_hours,
        brief.deliverables.join(", "),
    )
}
