//! Conversational NPC companions with tool-calling dialogue.
//!
//! This crate provides:
//! - Per-agent conversation history bounded to a sliding window
//! - A Groq-backed dialogue session that maps every failure to a fallback line
//! - Tool dispatch that lets the model make an NPC follow the player or walk
//!   to a named object
//! - A tick-driven agent controller (patrol, follow, interact, move-to)
//!
//! # Quick Start
//!
//! ```ignore
//! use npc_core::{AgentController, DialogueSession, NpcConfig, World};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NpcConfig::load("npc.toml")?;
//!     let mut session = DialogueSession::from_env(config.model.clone(), config.conversation.clone());
//!
//!     let world = World::from_objects(config.world.objects.clone());
//!     let mut agent = AgentController::new("guide", config.personality.clone(), config.agent.clone(), world);
//!
//!     let reply = session.send(&mut agent, "Follow me!").await;
//!     if let Some(text) = reply.display_text() {
//!         agent.display_text(text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod config;
pub mod dialogue;
pub mod personality;
pub mod testing;
pub mod world;

// Re-export for convenience
pub use npc_macros::Tool;

// Primary public API
pub use agent::{AgentConfig, AgentController, AgentId, BehaviorState};
pub use chat::{ChatConfig, ChatSurface, SubmitError};
pub use config::{ConfigError, NpcConfig};
pub use dialogue::{
    ChatBackend, ConversationStore, DialogueConfig, DialogueSession, Fallback, ModelParams, Reply,
};
pub use personality::{Color, PersonalityProfile};
pub use testing::{MockBackend, TestHarness};
pub use world::{Vec3, World, WorldObject};
