use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::catalog::{self, Question, QUESTIONS};

pub const STAGE_COMPLAINT: u8 = 0;
pub const FIRST_QUESTION_STAGE: u8 = 1;
pub const LAST_QUESTION_STAGE: u8 = QUESTIONS.len() as u8;
pub const STAGE_SUPPLEMENT: u8 = LAST_QUESTION_STAGE + 1;
pub const STAGE_CONVERSATION: u8 = STAGE_SUPPLEMENT + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// One completed post-analysis turn. Only stored once the answer has fully streamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupExchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("男"),
            Gender::Female => f.write_str("女"),
        }
    }
}

/// Basic information the user may edit at any point; survives reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub age: Option<u8>,
    pub gender: Gender,
    /// Menstrual status, only meaningful for `Gender::Female`
    pub menses: String,
}

impl Profile {
    /// Menstrual status if it applies to this profile.
    pub fn menses_if_applicable(&self) -> Option<&str> {
        match self.gender {
            Gender::Female => Some(self.menses.as_str()),
            Gender::Male => None,
        }
    }
}

/// All mutable state for one user session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub(crate) stage: u8,
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) asked_prompts: HashSet<&'static str>,
    pub(crate) main_complaint: String,
    pub(crate) supplement: String,
    pub(crate) answers: HashMap<&'static str, String>,
    pub(crate) report_generated: bool,
    pub(crate) report_text: String,
    pub(crate) followup_transcript: Vec<FollowupExchange>,
    pub profile: Profile,
    /// Key entered for this session; takes precedence over the configured one
    #[serde(skip)]
    pub(crate) api_key: String,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_profile(Profile::default())
    }

    pub fn with_profile(profile: Profile) -> Self {
        let mut state = Self {
            stage: STAGE_COMPLAINT,
            transcript: Vec::new(),
            asked_prompts: HashSet::new(),
            main_complaint: String::new(),
            supplement: String::new(),
            answers: HashMap::new(),
            report_generated: false,
            report_text: String::new(),
            followup_transcript: Vec::new(),
            profile,
            api_key: String::new(),
        };
        state.sync_prompts();
        state
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn main_complaint(&self) -> &str {
        &self.main_complaint
    }

    pub fn supplement(&self) -> &str {
        &self.supplement
    }

    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    pub fn report_generated(&self) -> bool {
        self.report_generated
    }

    pub fn report_text(&self) -> &str {
        &self.report_text
    }

    pub fn followup_transcript(&self) -> &[FollowupExchange] {
        &self.followup_transcript
    }

    pub fn session_api_key(&self) -> &str {
        &self.api_key
    }

    /// The question on screen for stages 1..=5.
    pub fn current_question(&self) -> Option<&'static Question> {
        if (FIRST_QUESTION_STAGE..=LAST_QUESTION_STAGE).contains(&self.stage) {
            QUESTIONS.get(usize::from(self.stage - FIRST_QUESTION_STAGE))
        } else {
            None
        }
    }

    /// Quick-choice buttons to offer right now; empty outside the question stages.
    pub fn quick_options(&self) -> &'static [&'static str] {
        self.current_question()
            .map(|q| &q.quick_options[..])
            .unwrap_or(&[])
    }

    pub fn awaiting_analysis(&self) -> bool {
        self.stage == STAGE_SUPPLEMENT && !self.report_generated
    }

    pub fn in_conversation(&self) -> bool {
        self.stage >= STAGE_CONVERSATION && self.report_generated
    }

    pub fn placeholder(&self) -> String {
        if self.stage == STAGE_COMPLAINT {
            catalog::COMPLAINT_PLACEHOLDER.to_string()
        } else if let Some(q) = self.current_question() {
            format!("若无合适选项，您也可以直接输入（如：{}）", q.placeholder_hint)
        } else if self.awaiting_analysis() {
            catalog::SUPPLEMENT_PLACEHOLDER.to_string()
        } else if self.in_conversation() {
            catalog::FOLLOWUP_PLACEHOLDER.to_string()
        } else {
            catalog::DEFAULT_PLACEHOLDER.to_string()
        }
    }

    pub(crate) fn push(&mut self, role: Role, text: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.push(Role::User, text);
    }

    pub(crate) fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Role::Assistant, text);
    }

    /// Appends `text` as an assistant prompt unless `prompt_id` was already shown.
    fn ensure_prompt(&mut self, prompt_id: &'static str, text: &str) -> bool {
        if !self.asked_prompts.insert(prompt_id) {
            return false;
        }
        self.push_assistant(text);
        true
    }

    /// Emits the entry prompt for the current stage if it has not been shown yet.
    pub(crate) fn sync_prompts(&mut self) -> bool {
        if self.stage == STAGE_COMPLAINT {
            return self.ensure_prompt(catalog::OPENING_ID, catalog::OPENING_PROMPT);
        }
        if let Some(q) = self.current_question() {
            return self.ensure_prompt(q.id, q.prompt);
        }
        if self.awaiting_analysis() {
            return self.ensure_prompt(catalog::SUPPLEMENT_ID, catalog::SUPPLEMENT_PROMPT);
        }
        if self.in_conversation() {
            return self.ensure_prompt(catalog::POSTCHAT_ID, catalog::POSTCHAT_GREETING);
        }
        false
    }

    /// Clears the interview and report; the profile and session key are kept.
    pub fn reset(&mut self) {
        let profile = std::mem::take(&mut self.profile);
        let api_key = std::mem::take(&mut self.api_key);
        *self = Self::with_profile(profile);
        self.api_key = api_key;
    }
}
