//! Chat input state.
//!
//! Tracks whether the player is typing, which agent the chat is attached to,
//! and whether a request is in flight. There is no global "is typing" flag;
//! callers ask the surface.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Player distance at which an open chat closes itself.
    pub hide_distance: f32,
    /// Seconds between accepted open/close toggles.
    pub toggle_cooldown_secs: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            hide_distance: 5.0,
            toggle_cooldown_secs: 4.0,
        }
    }
}

/// Why a message was not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("Chat is not open")]
    Closed,

    #[error("Message is empty")]
    Blank,

    #[error("A reply is still pending")]
    Pending,

    #[error("Chat is attached to agent {0}")]
    AgentMismatch(AgentId),
}

#[derive(Debug, Clone, Default)]
pub struct ChatSurface {
    config: ChatConfig,
    current_agent: Option<AgentId>,
    pending: bool,
    last_toggle: Option<f64>,
}

impl ChatSurface {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.current_agent.is_some()
    }

    /// True while the chat input has focus; movement input should be ignored.
    pub fn is_typing(&self) -> bool {
        self.is_open()
    }

    pub fn current_agent(&self) -> Option<&AgentId> {
        self.current_agent.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Open the chat on `agent`. An already open chat stays on its agent.
    /// Returns whether the chat was opened by this call.
    pub fn show(&mut self, agent: &AgentId) -> bool {
        if self.is_open() {
            return false;
        }
        debug!(agent = %agent, "opening chat");
        self.current_agent = Some(agent.clone());
        self.pending = false;
        true
    }

    /// Close the chat and drop any pending request's claim on it.
    pub fn hide(&mut self) {
        if let Some(agent) = self.current_agent.take() {
            debug!(agent = %agent, "closing chat");
        }
        self.pending = false;
    }

    /// Open or close in response to a key press at time `now` (seconds).
    /// Presses within the cooldown are ignored and return `None`; otherwise
    /// returns whether the chat is now open.
    pub fn toggle(&mut self, agent: &AgentId, now: f64) -> Option<bool> {
        if let Some(last) = self.last_toggle {
            if now - last < self.config.toggle_cooldown_secs {
                return None;
            }
        }
        self.last_toggle = Some(now);

        if self.is_open() {
            self.hide();
        } else {
            self.show(agent);
        }
        Some(self.is_open())
    }

    /// Whether an open chat should close because the player walked
    /// `distance` away from its agent.
    pub fn should_auto_close(&self, distance: f32) -> bool {
        self.is_open() && distance > self.config.hide_distance
    }

    /// Validate and claim a submission. Returns the agent to talk to.
    pub fn begin_submit(&mut self, text: &str) -> Result<AgentId, SubmitError> {
        let agent = self.current_agent.clone().ok_or(SubmitError::Closed)?;
        if text.trim().is_empty() {
            return Err(SubmitError::Blank);
        }
        if self.pending {
            return Err(SubmitError::Pending);
        }
        self.pending = true;
        Ok(agent)
    }

    /// Release the pending claim. Returns whether the reply should be shown,
    /// which is only when the chat is still open on the same agent.
    pub fn finish_submit(&mut self, agent: &AgentId) -> bool {
        self.pending = false;
        self.current_agent.as_ref() == Some(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a1() -> AgentId {
        AgentId::new("a1")
    }

    #[test]
    fn test_show_and_hide() {
        let mut chat = ChatSurface::default();
        assert!(!chat.is_open());
        assert!(!chat.is_typing());

        assert!(chat.show(&a1()));
        assert!(chat.is_typing());
        assert_eq!(chat.current_agent(), Some(&a1()));
        assert!(!chat.show(&AgentId::new("a2")));
        assert_eq!(chat.current_agent(), Some(&a1()));

        chat.hide();
        assert!(!chat.is_open());
        assert_eq!(chat.current_agent(), None);
    }

    #[test]
    fn test_toggle_cooldown() {
        let mut chat = ChatSurface::new(ChatConfig::default());
        assert_eq!(chat.toggle(&a1(), 0.5), Some(true));
        assert_eq!(chat.toggle(&a1(), 2.0), None);
        assert!(chat.is_open());
        assert_eq!(chat.toggle(&a1(), 4.5), Some(false));
        assert_eq!(chat.toggle(&a1(), 9.0), Some(true));
    }

    #[test]
    fn test_auto_close_distance() {
        let mut chat = ChatSurface::default();
        assert!(!chat.should_auto_close(10.0));
        chat.show(&a1());
        assert!(!chat.should_auto_close(5.0));
        assert!(chat.should_auto_close(5.1));
    }

    #[test]
    fn test_submit_rules() {
        let mut chat = ChatSurface::default();
        assert_eq!(chat.begin_submit("hi"), Err(SubmitError::Closed));

        chat.show(&a1());
        assert_eq!(chat.begin_submit("   "), Err(SubmitError::Blank));
        assert_eq!(chat.begin_submit("hi"), Ok(a1()));
        assert!(chat.is_pending());
        assert_eq!(chat.begin_submit("again"), Err(SubmitError::Pending));

        assert!(chat.finish_submit(&a1()));
        assert!(!chat.is_pending());
    }

    #[test]
    fn test_reply_after_close_is_not_shown() {
        let mut chat = ChatSurface::default();
        chat.show(&a1());
        let agent = chat.begin_submit("hello").unwrap();

        chat.hide();
        assert!(!chat.is_pending());
        assert!(!chat.finish_submit(&agent));
    }
}
