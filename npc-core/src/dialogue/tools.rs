//! Tools offered to the model.
//!
//! The schema is built once from the argument structs and reused for every
//! request. Incoming calls are normalized and decoded into a [`ToolIntent`].

use super::dispatch::DispatchError;
use groq::{Tool, ToolCall};
use npc_macros::Tool;
use once_cell::sync::Lazy;
use serde::Deserialize;

/// Toggle the AI's follow mode on/off
#[derive(Debug, Clone, Default, Tool, Deserialize)]
#[tool(name = "toggle_follow")]
pub struct ToggleFollow {}

/// Make the AI move to a specific object in the game
#[derive(Debug, Clone, Tool, Deserialize)]
#[tool(name = "move_to_object")]
pub struct MoveToObject {
    /// The name of the object to move to
    #[serde(rename = "objectName")]
    #[serde(default)]
    pub object_name: String,
}

static TOOL_SCHEMA: Lazy<Vec<Tool>> =
    Lazy::new(|| vec![ToggleFollow::as_tool(), MoveToObject::as_tool()]);

/// Collection of NPC tools.
pub struct NpcTools;

impl NpcTools {
    /// Get all tool definitions for the Groq API.
    pub fn all() -> Vec<Tool> {
        TOOL_SCHEMA.clone()
    }

    /// The shared schema, without cloning.
    pub fn schema() -> &'static [Tool] {
        &TOOL_SCHEMA
    }
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolIntent {
    ToggleFollow,
    MoveToObject { object_name: String },
}

impl ToolIntent {
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolIntent::ToggleFollow => ToggleFollow::tool_name(),
            ToolIntent::MoveToObject { .. } => MoveToObject::tool_name(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extract the bare function name from what the model sent.
///
/// Some models wrap the name, e.g. `<function=toggle_follow>` or
/// `function=move_to_object{...`. Text after the first `=` is used when one is
/// present, then the leading run of identifier characters is kept.
pub fn normalize_tool_name(raw: &str) -> &str {
    let tail = match raw.find('=') {
        Some(index) => &raw[index + 1..],
        None => raw,
    };
    let tail = tail.trim_start_matches(|c: char| !is_ident_char(c));
    let end = tail.find(|c: char| !is_ident_char(c)).unwrap_or(tail.len());
    &tail[..end]
}

/// Decode one tool call into an intent.
pub fn parse_tool_call(call: &ToolCall) -> Result<ToolIntent, DispatchError> {
    let name = normalize_tool_name(&call.name);

    if name == ToggleFollow::tool_name() {
        return Ok(ToolIntent::ToggleFollow);
    }

    if name == MoveToObject::tool_name() {
        let args: MoveToObject =
            serde_json::from_str(&call.arguments).map_err(|e| DispatchError::ArgumentParse {
                tool: MoveToObject::tool_name(),
                reason: e.to_string(),
            })?;

        let object_name = args.object_name.trim();
        if object_name.is_empty() {
            return Err(DispatchError::MissingArgument {
                tool: MoveToObject::tool_name(),
                argument: "objectName",
            });
        }
        return Ok(ToolIntent::MoveToObject {
            object_name: object_name.to_string(),
        });
    }

    Err(DispatchError::UnknownTool(call.name.clone()))
}
