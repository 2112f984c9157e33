use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{MISSING_KEY_NOTICE, PROVIDER_ERROR_NOTICE};
use crate::config::Config;
use crate::context::{build_analysis_messages, build_followup_messages};
use crate::controller::{self, Effect, Event};
use crate::error::{AssistantError, Result};
use crate::models::{ChatCompletionRequest, ChatMessage};
use crate::red_flags::{detect_red_flags, warning_message};
use crate::session::{FollowupExchange, Profile, Role, STAGE_CONVERSATION, SessionState};
use crate::sessions::SessionStore;
use crate::summary::{red_flag_scan_text, summarize};
use crate::transport::{DeepSeekTransport, Transport, collect_fragments};

/// Runs session events end to end: state transition, then any model call
/// the transition asked for.
pub struct AssistantService {
    tx: Arc<dyn Transport>,
    config: Arc<Config>,
}

impl AssistantService {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let tx = Arc::new(DeepSeekTransport::new(&config.provider.base_url)?);
        Ok(Self::with_transport(tx, config))
    }

    pub fn with_transport(tx: Arc<dyn Transport>, config: Arc<Config>) -> Self {
        Self { tx, config }
    }

    pub fn new_session(&self) -> SessionState {
        SessionState::with_profile(Profile {
            age: self.config.session.default_age,
            ..Profile::default()
        })
    }

    pub fn api_key_for(&self, state: &SessionState) -> String {
        self.config.resolve_api_key(state.session_api_key())
    }

    /// Whether the "start analysis" trigger should be enabled.
    pub fn analysis_enabled(&self, state: &SessionState) -> bool {
        state.awaiting_analysis() && !self.api_key_for(state).is_empty()
    }

    fn require_api_key(&self, state: &SessionState) -> Result<String> {
        let api_key = self.api_key_for(state);
        if api_key.is_empty() {
            return Err(AssistantError::MissingApiKey);
        }
        Ok(api_key)
    }

    /// Applies one event. Model output is forwarded to `on_fragment` as it
    /// arrives and committed to the session once the stream has drained.
    pub async fn handle<F>(
        &self,
        state: &mut SessionState,
        event: Event,
        on_fragment: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        match controller::handle_event(state, event)? {
            None => {}
            Some(Effect::RunAnalysis) => self.run_analysis(state, on_fragment).await,
            Some(Effect::RunFollowup(question)) => {
                self.run_followup(state, question, on_fragment).await
            }
        }
        Ok(())
    }

    /// Same as [`handle`](Self::handle) for a stored session, holding its lock
    /// for the whole event.
    pub async fn handle_in_store<F>(
        &self,
        store: &SessionStore,
        id: &Uuid,
        event: Event,
        on_fragment: F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let session = store
            .get(id)
            .await
            .ok_or_else(|| AssistantError::SessionNotFound(id.to_string()))?;
        let mut state = session.lock().await;
        self.handle(&mut state, event, on_fragment).await
    }

    async fn run_analysis<F>(&self, state: &mut SessionState, on_fragment: F)
    where
        F: FnMut(&str),
    {
        let api_key = match self.require_api_key(state) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Analysis rejected: {}", e);
                state.push_assistant(error_notice(&e));
                return;
            }
        };

        let hits = detect_red_flags(&red_flag_scan_text(state));
        if !hits.is_empty() {
            tracing::warn!(hits = ?hits, "Red-flag keywords present before analysis");
            let warning = warning_message(&hits);
            // A retry after a failed analysis should not repeat the same warning
            let already_shown = state
                .transcript()
                .iter()
                .any(|e| e.role == Role::Assistant && e.text == warning);
            if !already_shown {
                state.push_assistant(warning);
            }
        }

        let summary = summarize(state);
        let request = self.request(build_analysis_messages(&summary));
        tracing::info!("Starting analysis");

        match self.complete(&api_key, &request, on_fragment).await {
            Ok(report) => {
                tracing::info!(chars = report.chars().count(), "Analysis complete");
                state.push_assistant(report.as_str());
                state.report_text = report;
                state.report_generated = true;
                state.followup_transcript.clear();
                state.stage = STAGE_CONVERSATION;
                state.sync_prompts();
            }
            Err(e) => {
                tracing::error!(retryable = e.is_retryable(), "Analysis failed: {}", e);
                state.push_assistant(error_notice(&e));
            }
        }
    }

    async fn run_followup<F>(&self, state: &mut SessionState, question: String, on_fragment: F)
    where
        F: FnMut(&str),
    {
        state.push_user(question.as_str());

        let api_key = match self.require_api_key(state) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Follow-up rejected: {}", e);
                state.push_assistant(error_notice(&e));
                return;
            }
        };

        let summary = summarize(state);
        let mut messages =
            build_followup_messages(&summary, state.report_text(), state.followup_transcript());
        messages.push(ChatMessage::user(question.as_str()));
        let request = self.request(messages);
        tracing::info!(
            turn = state.followup_transcript().len() + 1,
            "Starting follow-up"
        );

        match self.complete(&api_key, &request, on_fragment).await {
            Ok(answer) => {
                state.push_assistant(answer.as_str());
                state
                    .followup_transcript
                    .push(FollowupExchange { question, answer });
            }
            Err(e) => {
                tracing::error!(retryable = e.is_retryable(), "Follow-up failed: {}", e);
                state.push_assistant(error_notice(&e));
            }
        }
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.provider.model.clone(),
            messages,
            temperature: self.config.provider.temperature,
            stream: true,
        }
    }

    async fn complete<F>(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
        on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let fragments = self.tx.chat_stream(api_key, request).await?;
        let output = collect_fragments(fragments, on_fragment).await?;
        if output.trim().is_empty() {
            return Err(AssistantError::Stream("completion was empty".to_string()));
        }
        Ok(output)
    }
}

/// User-facing text for a failed model call.
pub fn error_notice(e: &AssistantError) -> String {
    match e {
        AssistantError::MissingApiKey => MISSING_KEY_NOTICE.to_string(),
        AssistantError::Provider { status: 401 | 403, .. } => {
            "API Key 无效或无访问权限，请检查后重试。".to_string()
        }
        AssistantError::Provider { status: 402 | 429, .. } => {
            "模型服务额度不足或请求过于频繁，请稍后重试。".to_string()
        }
        _ => PROVIDER_ERROR_NOTICE.to_string(),
    }
}
