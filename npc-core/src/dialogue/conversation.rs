//! Per-agent conversation history.
//!
//! Each agent gets its own message list, seeded with a system message built
//! from its personality. The list is bounded: once it grows past the limit,
//! the oldest non-system messages are dropped. The system message at index 0
//! is never dropped.

use crate::agent::AgentId;
use crate::personality::PersonalityProfile;
use groq::{Message, Role};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Default maximum number of messages kept per agent, system message included.
pub const MAX_HISTORY: usize = 10;

/// Smallest usable bound: the system message plus the latest user message.
pub const MIN_HISTORY: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("No conversation initialized for agent {0}")]
    NotInitialized(AgentId),
}

/// Conversation histories keyed by agent.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    histories: HashMap<AgentId, Vec<Message>>,
    max_history: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_max_history(MAX_HISTORY)
    }

    /// Create a store with a custom history bound. A bound below
    /// [`MIN_HISTORY`] is raised to it, so the latest user message always
    /// survives a trim.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            histories: HashMap::new(),
            max_history: max_history.max(MIN_HISTORY),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Seed a history with the personality's system prompt. Does nothing if
    /// the agent already has one. Returns whether a history was created.
    pub fn initialize(&mut self, agent: &AgentId, personality: &PersonalityProfile) -> bool {
        if self.histories.contains_key(agent) {
            return false;
        }
        debug!(agent = %agent, "initializing conversation");
        self.histories
            .insert(agent.clone(), vec![Message::system(personality.system_prompt())]);
        true
    }

    /// Append a message to an initialized history. The history is not
    /// trimmed here; call [`ConversationStore::trim`] afterwards.
    pub fn append(&mut self, agent: &AgentId, message: Message) -> Result<(), ConversationError> {
        let history = self
            .histories
            .get_mut(agent)
            .ok_or_else(|| ConversationError::NotInitialized(agent.clone()))?;
        history.push(message);
        Ok(())
    }

    /// Drop the oldest non-system messages until the history fits. Tool
    /// results answering a dropped assistant message go with it. Returns the
    /// number of messages removed; unknown agents are left alone.
    pub fn trim(&mut self, agent: &AgentId) -> usize {
        let max = self.max_history;
        let Some(history) = self.histories.get_mut(agent) else {
            return 0;
        };

        let mut removed = 0;
        while history.len() > max {
            let Some(offset) = history
                .iter()
                .skip(1)
                .position(|m| m.role != Role::System)
            else {
                break;
            };

            let index = offset + 1;
            let dropped = history.remove(index);
            removed += 1;

            if dropped.has_tool_calls() {
                while history.get(index).is_some_and(|m| {
                    m.role == Role::Tool
                        && dropped
                            .tool_calls
                            .iter()
                            .any(|call| m.tool_call_id.as_deref() == Some(call.id.as_str()))
                }) {
                    history.remove(index);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(agent = %agent, removed, remaining = history.len(), "trimmed conversation");
        }
        removed
    }

    /// Reset a history to just the system message. Works for agents that
    /// were never initialized too.
    pub fn clear(&mut self, agent: &AgentId, personality: &PersonalityProfile) {
        debug!(agent = %agent, "clearing conversation");
        self.histories
            .insert(agent.clone(), vec![Message::system(personality.system_prompt())]);
    }

    /// The last `count` non-system messages, oldest first. Empty for unknown
    /// agents.
    pub fn snapshot(&self, agent: &AgentId, count: usize) -> Vec<Message> {
        let Some(history) = self.histories.get(agent) else {
            return Vec::new();
        };
        let start = history.len().saturating_sub(count).max(1);
        history
            .iter()
            .skip(start)
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect()
    }

    pub fn history(&self, agent: &AgentId) -> Option<&[Message]> {
        self.histories.get(agent).map(Vec::as_slice)
    }

    pub fn len(&self, agent: &AgentId) -> usize {
        self.histories.get(agent).map_or(0, Vec::len)
    }

    pub fn contains(&self, agent: &AgentId) -> bool {
        self.histories.contains_key(agent)
    }

    /// Number of agents with a history.
    pub fn agent_count(&self) -> usize {
        self.histories.len()
    }
}
