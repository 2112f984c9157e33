//! Stage state machine: turns one user event into a session mutation and,
//! when the model must be consulted, an [`Effect`] for the caller to run.

use crate::catalog::{ANALYZE_NOW, FAQS};
use crate::error::{AssistantError, Result};
use crate::session::{
    FIRST_QUESTION_STAGE, LAST_QUESTION_STAGE, Profile, STAGE_COMPLAINT, STAGE_SUPPLEMENT,
    SessionState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Submission from the free-text input
    Text(String),
    /// Index into the current question's quick options
    QuickOption(usize),
    StartAnalysis,
    /// Index into the canned follow-up questions
    Faq(usize),
    Reset,
    UpdateProfile(Profile),
    SetApiKey(String),
}

/// Work that needs the chat-completion client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RunAnalysis,
    RunFollowup(String),
}

pub fn handle_event(state: &mut SessionState, event: Event) -> Result<Option<Effect>> {
    match event {
        Event::Text(raw) => handle_text(state, &raw),
        Event::QuickOption(index) => handle_quick_option(state, index),
        Event::StartAnalysis => {
            if !state.awaiting_analysis() {
                return Err(AssistantError::invalid_event(format!(
                    "analysis cannot start at stage {}",
                    state.stage()
                )));
            }
            Ok(Some(Effect::RunAnalysis))
        }
        Event::Faq(index) => {
            if !state.report_generated() {
                return Err(AssistantError::invalid_event(
                    "follow-up questions are available after the report",
                ));
            }
            let faq = FAQS
                .get(index)
                .ok_or_else(|| AssistantError::invalid_event(format!("no FAQ #{index}")))?;
            Ok(Some(Effect::RunFollowup(faq.question.to_string())))
        }
        Event::Reset => {
            tracing::info!("Resetting session at stage {}", state.stage());
            state.reset();
            Ok(None)
        }
        Event::UpdateProfile(profile) => {
            state.profile = profile;
            Ok(None)
        }
        Event::SetApiKey(key) => {
            state.api_key = key.trim().to_string();
            Ok(None)
        }
    }
}

fn handle_text(state: &mut SessionState, raw: &str) -> Result<Option<Effect>> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if state.stage() == STAGE_COMPLAINT {
        state.main_complaint = text.to_string();
        state.push_user(text);
        advance(state, FIRST_QUESTION_STAGE);
        return Ok(None);
    }

    if let Some(question) = state.current_question() {
        record_answer(state, question.id, text.to_string(), false);
        return Ok(None);
    }

    if state.awaiting_analysis() {
        state.supplement = text.to_string();
        state.push_user(text);
        return Ok(None);
    }

    if state.in_conversation() {
        return Ok(Some(Effect::RunFollowup(text.to_string())));
    }

    Err(AssistantError::invalid_event(format!(
        "no input expected at stage {}",
        state.stage()
    )))
}

fn handle_quick_option(state: &mut SessionState, index: usize) -> Result<Option<Effect>> {
    let question = state.current_question().ok_or_else(|| {
        AssistantError::invalid_event(format!("no question open at stage {}", state.stage()))
    })?;
    let option = question.quick_options.get(index).ok_or_else(|| {
        AssistantError::invalid_event(format!("question {} has no option #{index}", question.id))
    })?;

    record_answer(state, question.id, option.to_string(), *option == ANALYZE_NOW);
    Ok(None)
}

fn record_answer(state: &mut SessionState, question_id: &'static str, answer: String, skip: bool) {
    state.push_user(answer.as_str());
    state.answers.insert(question_id, answer);

    let next = if skip {
        STAGE_SUPPLEMENT
    } else {
        (state.stage() + 1).min(STAGE_SUPPLEMENT)
    };
    advance(state, next);
}

fn advance(state: &mut SessionState, next: u8) {
    debug_assert!(next >= state.stage(), "stage must not decrease");
    tracing::debug!("Stage {} -> {}", state.stage(), next);
    state.stage = next.max(state.stage());
    state.sync_prompts();
}

/// True while a quick option would still move the interview forward.
pub fn accepts_quick_option(state: &SessionState) -> bool {
    (FIRST_QUESTION_STAGE..=LAST_QUESTION_STAGE).contains(&state.stage())
}
