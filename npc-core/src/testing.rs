//! Testing utilities for NPC dialogue.
//!
//! This module provides tools for integration testing:
//! - `MockBackend` for deterministic testing without API calls
//! - `TestHarness` for scripted conversations with one agent
//! - Assertion helpers for verifying agent and history state

use crate::agent::{AgentConfig, AgentController, AgentId};
use crate::chat::{ChatSurface, SubmitError};
use crate::dialogue::{ChatBackend, DialogueConfig, DialogueSession, ModelParams, Reply};
use crate::personality::PersonalityProfile;
use crate::world::{Vec3, World, WorldObject};
use async_trait::async_trait;
use groq::{FinishReason, Message, Request, Response, ToolCall};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Build a plain text response.
pub fn text_response(text: impl Into<String>) -> Response {
    Response {
        id: None,
        model: None,
        message: Message::assistant(text),
        finish_reason: FinishReason::Stop,
        usage: None,
    }
}

/// Build a response carrying tool calls and optional text.
pub fn tool_response(content: Option<&str>, calls: Vec<ToolCall>) -> Response {
    let mut message = Message::assistant_tool_calls(calls);
    message.content = content.map(str::to_string);
    Response {
        id: None,
        model: None,
        message,
        finish_reason: FinishReason::ToolCalls,
        usage: None,
    }
}

/// A backend that returns scripted results in order and records every
/// request it receives.
///
/// Once the script runs out it answers with
/// [`groq::Error::MalformedResponse`].
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Result<Response, groq::Error>>>,
    requests: Mutex<Vec<Request>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue(&self, result: Result<Response, groq::Error>) {
        lock(&self.script).push_back(result);
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue(Ok(text_response(text)));
    }

    pub fn queue_tool_calls(&self, content: Option<&str>, calls: Vec<ToolCall>) {
        self.queue(Ok(tool_response(content, calls)));
    }

    pub fn queue_error(&self, error: groq::Error) {
        self.queue(Err(error));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn last_request(&self) -> Option<Request> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn complete(&self, request: Request) -> Result<Response, groq::Error> {
        lock(&self.requests).push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(groq::Error::MalformedResponse("no scripted response".into())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Test harness: one agent in a small scene, a chat surface, and a session
/// backed by a [`MockBackend`].
pub struct TestHarness {
    pub backend: Arc<MockBackend>,
    pub session: DialogueSession,
    pub agent: AgentController,
    pub chat: ChatSurface,
}

impl TestHarness {
    /// Agent "a1" with the default personality.
    pub fn new() -> Self {
        Self::with_personality(PersonalityProfile::default())
    }

    pub fn with_personality(personality: PersonalityProfile) -> Self {
        Self::with_backend(MockBackend::new(), personality)
    }

    pub fn with_backend(backend: MockBackend, personality: PersonalityProfile) -> Self {
        let backend = Arc::new(backend);
        let session = DialogueSession::new(
            backend.clone(),
            ModelParams::default(),
            DialogueConfig::default(),
        );
        Self {
            backend,
            session,
            agent: sample_agent(personality),
            chat: ChatSurface::default(),
        }
    }

    /// Replace the session, keeping the backend.
    pub fn with_config(mut self, config: DialogueConfig) -> Self {
        self.session = DialogueSession::new(self.backend.clone(), ModelParams::default(), config);
        self
    }

    /// Queue a text reply.
    pub fn expect_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.backend.queue_text(text);
        self
    }

    /// Queue a reply with tool calls.
    pub fn expect_tool_calls(&mut self, content: Option<&str>, calls: Vec<ToolCall>) -> &mut Self {
        self.backend.queue_tool_calls(content, calls);
        self
    }

    /// Queue a failure.
    pub fn expect_error(&mut self, error: groq::Error) -> &mut Self {
        self.backend.queue_error(error);
        self
    }

    /// Say something to the agent directly.
    pub async fn say(&mut self, text: &str) -> Reply {
        self.session.send(&mut self.agent, text).await
    }

    /// Say something through the chat input, opening it first if needed.
    pub async fn type_message(&mut self, text: &str) -> Result<Reply, SubmitError> {
        if !self.chat.is_open() {
            self.chat.show(self.agent.id());
        }
        self.session
            .converse(&mut self.chat, &mut self.agent, text)
            .await
    }

    pub fn agent_id(&self) -> &AgentId {
        self.agent.id()
    }

    pub fn history(&self) -> &[Message] {
        self.session
            .store()
            .history(self.agent.id())
            .unwrap_or_default()
    }

    pub fn history_len(&self) -> usize {
        self.history().len()
    }

    pub fn bubble_text(&self) -> &str {
        self.agent.bubble_text()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Agent "a1" at the origin, with a lamp and a crate nearby and a short
/// patrol route.
pub fn sample_agent(personality: PersonalityProfile) -> AgentController {
    let world = World::from_objects(vec![
        WorldObject::new("lamp01", Vec3::new(4.0, 0.0, 0.0)),
        WorldObject::new("Crate", Vec3::new(0.0, 0.0, 6.0)),
    ]);
    AgentController::new("a1", personality, AgentConfig::default(), world).with_waypoints(vec![
        Vec3::new(-5.0, 0.0, -5.0),
        Vec3::new(5.0, 0.0, -5.0),
    ])
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the agent is following the player.
#[track_caller]
pub fn assert_following(harness: &TestHarness) {
    assert!(harness.agent.is_following(), "Expected agent to be following");
}

/// Assert the agent is NOT following the player.
#[track_caller]
pub fn assert_not_following(harness: &TestHarness) {
    assert!(!harness.agent.is_following(), "Expected agent to NOT be following");
}

/// Assert the agent's bubble shows `text`.
#[track_caller]
pub fn assert_bubble(harness: &TestHarness, text: &str) {
    assert_eq!(
        harness.bubble_text(),
        text,
        "Expected bubble '{text}', got '{}'",
        harness.bubble_text()
    );
}

/// Assert the agent's history has `len` messages, system message included.
#[track_caller]
pub fn assert_history_len(harness: &TestHarness, len: usize) {
    assert_eq!(
        harness.history_len(),
        len,
        "Expected {len} messages in history, got {}",
        harness.history_len()
    );
}
