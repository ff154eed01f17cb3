//! Candidate brief generation: prompt assembly, one chat call per batch,
//! tolerant parsing and normalization.

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::brief::{CourseProgram, GenerationRequest, ProjectBrief};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::normalize::{normalize_brief, NormalizeBounds};
use crate::parse::extract_candidate_values;
use crate::prompts::generation_messages;

pub const GENERATION_TEMPERATURE: f32 = 0.6;
pub const GENERATION_MAX_TOKENS: u32 = 3000;

/// Request one batch of candidate briefs.
///
/// Provider failures propagate (the caller decides whether the run can
/// continue); unparsable output yields an empty batch per the degradation
/// policy — a failed batch, not a fatal error.
#[allow(clippy::too_many_arguments)]
pub async fn generate_batch(
    gateway: &dyn ChatGateway,
    model: &str,
    request: &GenerationRequest,
    courses: &[CourseProgram],
    batch_size: usize,
    avoid: &[ProjectBrief],
    run_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<ProjectBrief>, ProviderError> {
    let messages = generation_messages(request, courses, batch_size, avoid, today);

    let chat_req = ChatRequest::new(
        ChatModel::groq(model),
        messages,
        Attribution::new("generator::batch").with_run(run_id),
    )
    .temperature(GENERATION_TEMPERATURE)
    .max_tokens(GENERATION_MAX_TOKENS)
    .json();

    let response = gateway.chat(chat_req).await?;

    let values = match extract_candidate_values(&response.content) {
        Ok(values) => values,
        Err(err) => {
            warn!(error = %err, "failed to parse generation output; treating batch as empty");
            return Ok(Vec::new());
        }
    };

    let bounds = NormalizeBounds::new(request.difficulty_range);
    Ok(values
        .iter()
        .map(|v| normalize_brief(v, &bounds, today))
        .collect())
}
