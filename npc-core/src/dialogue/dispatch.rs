//! Tool-call dispatch.
//!
//! Turns the tool calls on an assistant message into actions on whatever
//! implements [`ToolTarget`]. A bad call is skipped and logged; the rest of
//! the batch still runs.

use super::tools::{parse_tool_call, ToolIntent};
use groq::Message;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from decoding a single tool call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    ArgumentParse { tool: &'static str, reason: String },

    #[error("Missing argument {argument} for {tool}")]
    MissingArgument {
        tool: &'static str,
        argument: &'static str,
    },
}

/// The agent-side surface that tool calls act on.
pub trait ToolTarget {
    /// Flip follow mode. Returns the new state.
    fn toggle_follow(&mut self) -> bool;

    /// Start walking to a named object. Returns whether one was found.
    fn move_to_object(&mut self, object_name: &str) -> bool;
}

/// A call that decoded and ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokedTool {
    pub call_id: String,
    pub intent: ToolIntent,
    /// New follow state for `toggle_follow`, target found for `move_to_object`.
    pub result: bool,
}

/// A call that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTool {
    pub call_id: String,
    pub name: String,
    pub error: DispatchError,
}

/// What happened to each call on one assistant message, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub invoked: Vec<InvokedTool>,
    pub skipped: Vec<SkippedTool>,
    /// A follow toggle ran, so the chat input should close.
    pub close_chat: bool,
}

impl DispatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.invoked.is_empty() && self.skipped.is_empty()
    }

    /// Short text describing how the call with `call_id` went, suitable as
    /// a tool-result message.
    pub fn result_for(&self, call_id: &str) -> Option<String> {
        if let Some(invoked) = self.invoked.iter().find(|t| t.call_id == call_id) {
            let text = match (&invoked.intent, invoked.result) {
                (ToolIntent::ToggleFollow, true) => "following".to_string(),
                (ToolIntent::ToggleFollow, false) => "not following".to_string(),
                (ToolIntent::MoveToObject { object_name }, true) => {
                    format!("moving to {object_name}")
                }
                (ToolIntent::MoveToObject { object_name }, false) => {
                    format!("could not find {object_name}")
                }
            };
            return Some(text);
        }
        self.skipped
            .iter()
            .find(|t| t.call_id == call_id)
            .map(|t| format!("error: {}", t.error))
    }
}

/// Runs the tool calls of an assistant message.
pub struct ToolDispatcher;

impl ToolDispatcher {
    /// Execute every tool call on `message`, in order, against `target`.
    pub fn dispatch<T: ToolTarget + ?Sized>(message: &Message, target: &mut T) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for call in &message.tool_calls {
            let intent = match parse_tool_call(call) {
                Ok(intent) => intent,
                Err(error) => {
                    warn!(tool = %call.name, call_id = %call.id, error = %error, "skipping tool call");
                    outcome.skipped.push(SkippedTool {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        error,
                    });
                    continue;
                }
            };

            let result = match &intent {
                ToolIntent::ToggleFollow => {
                    outcome.close_chat = true;
                    target.toggle_follow()
                }
                ToolIntent::MoveToObject { object_name } => target.move_to_object(object_name),
            };
            info!(tool = intent.tool_name(), call_id = %call.id, result, "tool call executed");

            outcome.invoked.push(InvokedTool {
                call_id: call.id.clone(),
                intent,
                result,
            });
        }

        outcome
    }
}
