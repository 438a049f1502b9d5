//! NPC dialogue module.
//!
//! Contains the per-agent conversation store, the tool schema offered to
//! the model, the dispatcher that turns tool calls into agent actions, and
//! the session that runs one exchange end to end.

mod backend;
pub mod conversation;
mod dispatch;
mod session;
mod tools;

pub use backend::ChatBackend;
pub use conversation::{ConversationError, ConversationStore, MAX_HISTORY, MIN_HISTORY};
pub use dispatch::{DispatchError, DispatchOutcome, InvokedTool, SkippedTool, ToolDispatcher, ToolTarget};
pub use session::{DialogueConfig, DialogueSession, Fallback, ModelParams, Reply, SessionError};
pub use tools::{normalize_tool_name, parse_tool_call, MoveToObject, NpcTools, ToggleFollow, ToolIntent};
