//! One player-to-NPC exchange, end to end.
//!
//! A turn appends the player's text, sends the bounded history and the tool
//! schema to the backend, records the assistant message, and dispatches its
//! tool calls to the agent. Every failure becomes a short fallback line for
//! the player; nothing escapes as an error.

use super::backend::ChatBackend;
use super::conversation::{ConversationError, ConversationStore, MAX_HISTORY};
use super::dispatch::{DispatchOutcome, ToolDispatcher};
use super::tools::NpcTools;
use crate::agent::{AgentController, AgentId};
use crate::chat::{ChatSurface, SubmitError};
use crate::personality::PersonalityProfile;
use groq::{Groq, Message, Request, Role, ToolChoice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model: groq::DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 1024,
        }
    }
}

/// Conversation limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Messages kept per agent, system message included.
    pub max_history: usize,
    pub request_timeout_secs: u64,
    /// Answer each tool call with a tool-result message in the history.
    pub record_tool_results: bool,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_history: MAX_HISTORY,
            request_timeout_secs: 30,
            record_tool_results: false,
        }
    }
}

impl DialogueConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Why a turn produced no model reply.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Dialogue is disabled: no API key")]
    Disabled,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend error: {0}")]
    Backend(#[from] groq::Error),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// The fixed line shown to the player when a turn fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Disabled,
    Transport,
    ApiStatus,
    Malformed,
    Unreadable,
    Timeout,
}

impl Fallback {
    pub fn text(self) -> &'static str {
        match self {
            Fallback::Disabled => "I can't talk right now.",
            Fallback::Transport => "Sorry, I'm having trouble connecting right now.",
            Fallback::ApiStatus => "Sorry, I'm having trouble connecting to my brain.",
            Fallback::Malformed => "I didn't understand that.",
            Fallback::Unreadable => "Sorry, I'm having trouble responding right now.",
            Fallback::Timeout => "Sorry, I took too long to think. Try again?",
        }
    }
}

impl From<&SessionError> for Fallback {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Disabled => Fallback::Disabled,
            SessionError::Timeout(_) => Fallback::Timeout,
            SessionError::Conversation(_) => Fallback::Unreadable,
            SessionError::Backend(err) => match err {
                groq::Error::NoApiKey => Fallback::Disabled,
                groq::Error::Network(_) => Fallback::Transport,
                groq::Error::Timeout => Fallback::Timeout,
                groq::Error::Api { .. } => Fallback::ApiStatus,
                groq::Error::MalformedResponse(_) => Fallback::Malformed,
                groq::Error::Parse(_) | groq::Error::Config(_) => Fallback::Unreadable,
            },
        }
    }
}

/// Result of one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    /// Non-empty model text, if any.
    pub text: Option<String>,
    /// Set when the turn failed.
    pub fallback: Option<Fallback>,
    pub dispatch: DispatchOutcome,
}

impl Reply {
    fn failed(fallback: Fallback) -> Self {
        Self {
            fallback: Some(fallback),
            ..Self::default()
        }
    }

    /// The line to show the player: the fallback on failure, otherwise the
    /// model's text.
    pub fn display_text(&self) -> Option<&str> {
        match self.fallback {
            Some(fallback) => Some(fallback.text()),
            None => self.text.as_deref(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// A tool call asked for the chat input to close.
    pub fn close_chat(&self) -> bool {
        self.dispatch.close_chat
    }
}

/// Drives conversations between the player and any number of agents.
pub struct DialogueSession {
    backend: Option<Arc<dyn ChatBackend>>,
    store: ConversationStore,
    params: ModelParams,
    config: DialogueConfig,
}

impl DialogueSession {
    pub fn new(backend: Arc<dyn ChatBackend>, params: ModelParams, config: DialogueConfig) -> Self {
        Self {
            backend: Some(backend),
            store: ConversationStore::with_max_history(config.max_history),
            params,
            config,
        }
    }

    /// A session with no backend. Every turn answers with
    /// [`Fallback::Disabled`] and sends nothing.
    pub fn disabled(params: ModelParams, config: DialogueConfig) -> Self {
        Self {
            backend: None,
            store: ConversationStore::with_max_history(config.max_history),
            params,
            config,
        }
    }

    /// Connect to Groq using `GROQ_API_KEY`, or fall back to a disabled
    /// session when the key is missing.
    pub fn from_env(params: ModelParams, config: DialogueConfig) -> Self {
        match Groq::from_env() {
            Ok(client) => {
                let client = client
                    .with_model(params.model.clone())
                    .with_timeout(config.request_timeout());
                Self::new(Arc::new(client), params, config)
            }
            Err(err) => {
                warn!(error = %err, "{} not set, dialogue disabled", groq::API_KEY_VAR);
                Self::disabled(params, config)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// Run one turn: the player says `text` to `agent`. Tool calls in the
    /// reply act on `agent`; the reply text is returned, not displayed.
    pub async fn send(&mut self, agent: &mut AgentController, text: &str) -> Reply {
        if text.trim().is_empty() {
            return Reply::default();
        }

        let id = agent.id().clone();
        let message = match self.exchange(&id, agent.personality(), text).await {
            Ok(message) => message,
            Err(err) => {
                error!(agent = %id, error = %err, "dialogue turn failed");
                return Reply::failed(Fallback::from(&err));
            }
        };

        let dispatch = ToolDispatcher::dispatch(&message, agent);
        let reply_text = message.text().map(str::to_string);

        if let Err(err) = self.record(&id, message, &dispatch) {
            error!(agent = %id, error = %err, "failed to record assistant message");
        }

        Reply {
            text: reply_text,
            fallback: None,
            dispatch,
        }
    }

    /// Run one turn through the chat input, the way the player types it.
    ///
    /// Shows "You: ..." on the agent's bubble, runs the turn, and shows the
    /// reply only if the chat is still open on this agent. A follow toggle
    /// closes the chat.
    pub async fn converse(
        &mut self,
        chat: &mut ChatSurface,
        agent: &mut AgentController,
        text: &str,
    ) -> Result<Reply, SubmitError> {
        let target = chat.begin_submit(text)?;
        if &target != agent.id() {
            chat.finish_submit(&target);
            return Err(SubmitError::AgentMismatch(target));
        }

        agent.display_text(&format!("You: {text}"));
        let reply = self.send(agent, text).await;

        if chat.finish_submit(&target) {
            if let Some(line) = reply.display_text() {
                agent.display_text(line);
            }
        }
        if reply.close_chat() {
            chat.hide();
        }
        Ok(reply)
    }

    /// Forget everything said to `agent`, keeping its system message.
    pub fn reset(&mut self, agent: &AgentId, personality: &PersonalityProfile) {
        self.store.clear(agent, personality);
    }

    /// The last `count` non-system messages for `agent`.
    pub fn recent(&self, agent: &AgentId, count: usize) -> Vec<Message> {
        self.store.snapshot(agent, count)
    }

    async fn exchange(
        &mut self,
        agent: &AgentId,
        personality: &PersonalityProfile,
        text: &str,
    ) -> Result<Message, SessionError> {
        let backend = self.backend.clone().ok_or(SessionError::Disabled)?;

        self.store.initialize(agent, personality);
        self.store.append(agent, Message::user(text))?;
        self.store.trim(agent);

        let history = self
            .store
            .history(agent)
            .map(<[Message]>::to_vec)
            .ok_or_else(|| ConversationError::NotInitialized(agent.clone()))?;

        let request = Request::new(history)
            .with_model(self.params.model.clone())
            .with_tools(NpcTools::all())
            .with_tool_choice(ToolChoice::Auto)
            .with_temperature(self.params.temperature)
            .with_max_tokens(self.params.max_tokens);

        debug!(
            agent = %agent,
            backend = backend.name(),
            history = request.messages.len(),
            "requesting reply"
        );

        let timeout = self.config.request_timeout();
        let response = tokio::time::timeout(timeout, backend.complete(request))
            .await
            .map_err(|_| SessionError::Timeout(timeout))??;

        let mut message = response.message;
        message.role = Role::Assistant;
        Ok(message)
    }

    fn record(
        &mut self,
        agent: &AgentId,
        message: Message,
        dispatch: &DispatchOutcome,
    ) -> Result<(), ConversationError> {
        let results: Vec<Message> = if self.config.record_tool_results {
            message
                .tool_calls
                .iter()
                .filter_map(|call| {
                    dispatch
                        .result_for(&call.id)
                        .map(|result| Message::tool_result(&call.id, &call.name, result))
                })
                .collect()
        } else {
            Vec::new()
        };

        self.store.append(agent, message)?;
        for result in results {
            self.store.append(agent, result)?;
        }
        self.store.trim(agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_texts_are_distinct() {
        let all = [
            Fallback::Disabled,
            Fallback::Transport,
            Fallback::ApiStatus,
            Fallback::Malformed,
            Fallback::Unreadable,
            Fallback::Timeout,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.text(), b.text());
            }
        }
    }

    #[test]
    fn test_fallback_from_error() {
        let cases = [
            (SessionError::Disabled, Fallback::Disabled),
            (SessionError::Timeout(Duration::from_secs(30)), Fallback::Timeout),
            (groq::Error::Network("refused".into()).into(), Fallback::Transport),
            (groq::Error::Timeout.into(), Fallback::Timeout),
            (
                groq::Error::Api {
                    status: 500,
                    message: "boom".into(),
                }
                .into(),
                Fallback::ApiStatus,
            ),
            (groq::Error::MalformedResponse("no choices".into()).into(), Fallback::Malformed),
            (groq::Error::Parse("eof".into()).into(), Fallback::Unreadable),
        ];
        for (err, expected) in cases {
            assert_eq!(Fallback::from(&err), expected, "{err}");
        }
    }

    #[test]
    fn test_reply_display_text() {
        assert_eq!(Reply::default().display_text(), None);
        assert_eq!(
            Reply::failed(Fallback::Malformed).display_text(),
            Some("I didn't understand that.")
        );

        let reply = Reply {
            text: Some("Sure!".into()),
            ..Reply::default()
        };
        assert_eq!(reply.display_text(), Some("Sure!"));
        assert!(!reply.is_fallback());
    }

    #[test]
    fn test_config_defaults() {
        let params = ModelParams::default();
        assert_eq!(params.model, "llama-3.3-70b-versatile");
        assert_eq!(params.temperature, 1.0);
        assert_eq!(params.max_tokens, 1024);

        let config = DialogueConfig::default();
        assert_eq!(config.max_history, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.record_tool_results);
    }
}
