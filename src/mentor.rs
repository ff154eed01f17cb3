//! Mentor chat: a Socratic conversational layer over the same gateway the
//! pipeline uses.

use chrono::NaiveDate;
use tracing::debug;

use crate::brief::{CourseProgram, ProjectBrief};
use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError, Role,
};
use crate::prompts::{render_course_context, render_project_context, MENTOR_SYSTEM_PROMPT};

pub const MENTOR_TEMPERATURE: f32 = 0.7;
pub const MENTOR_MAX_TOKENS: u32 = 1024;

/// Exchanges kept from the conversation history for the context window.
pub const HISTORY_WINDOW: usize = 20;

/// Build the mentor message list: system context, recent history, then the
/// student's message.
pub fn mentor_messages(
    courses: &[CourseProgram],
    active_brief: Option<&ProjectBrief>,
    history: &[Message],
    user_message: &str,
    today: NaiveDate,
) -> Vec<Message> {
    let system = format!(
        "{MENTOR_SYSTEM_PROMPT}\n\n{}\n\n{}\n\nToday's date: {}",
        render_course_context(courses),
        render_project_context(active_brief),
        today.format("%A, %B %-d, %Y"),
    );

    let filtered: Vec<&Message> = history
        .iter()
        .filter(|m| m.role != Role::System)
        .collect();
    let start = filtered.len().saturating_sub(HISTORY_WINDOW);
    let recent = filtered[start..].iter().map(|m| (*m).clone());

    let mut messages = vec![Message::system(system)];
    messages.extend(recent);
    messages.push(Message::user(user_message));
    messages
}

/// One mentor turn.
#[allow(clippy::too_many_arguments)]
pub async fn respond(
    gateway: &dyn ChatGateway,
    model: &str,
    courses: &[CourseProgram],
    active_brief: Option<&ProjectBrief>,
    history: &[Message],
    user_message: &str,
    today: NaiveDate,
) -> Result<String, ProviderError> {
    let messages = mentor_messages(courses, active_brief, history, user_message, today);
    debug!(history = history.len(), "sending mentor turn");

    let chat_req = ChatRequest::new(
        ChatModel::groq(model),
        messages,
        Attribution::new("mentor::respond"),
    )
    .temperature(MENTOR_TEMPERATURE)
    .max_tokens(MENTOR_MAX_TOKENS);

    let response = gateway.chat(chat_req).await?;
    Ok(response.content)
}
