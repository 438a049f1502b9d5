//! Minimal Groq chat-completions client.
//!
//! This crate provides a focused client for Groq's OpenAI-compatible
//! `/chat/completions` endpoint with:
//! - Non-streaming completions
//! - Function-style tool calls
//! - Distinct errors for transport, status, and body failures

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace};

pub const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable holding the bearer credential.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Errors that can occur when using the Groq client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Groq API client.
#[derive(Clone)]
pub struct Groq {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl std::fmt::Debug for Groq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groq")
            .field("model", &self.model)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Groq {
    /// Create a new Groq client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(DEFAULT_TIMEOUT),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            url: API_URL.to_string(),
        }
    }

    /// Create a Groq client from the GROQ_API_KEY environment variable.
    ///
    /// An empty variable counts as missing.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| Error::NoApiKey)?;
        if api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }
        Ok(Self::new(api_key))
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different chat-completions URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request and return the first choice.
    pub async fn complete(&self, request: Request) -> Result<Response, Error> {
        let api_request = self.build_api_request(&request);
        let headers = self.build_headers()?;

        debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            tools = api_request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string(&api_request)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full request payload");
        }

        let response = self
            .client
            .post(&self.url)
            .headers(headers)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.url, error = %e, "chat completion transport failure");
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e.to_string())
            }
        })?;
        trace!(%status, body = %body, "received response body");

        if !status.is_success() {
            let message = api_error_message(&body);
            error!(%status, %message, "chat completion returned HTTP error");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        parse_response_body(&body)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?,
        );
        Ok(headers)
    }

    fn build_api_request(&self, request: &Request) -> ApiRequest {
        let tools: Option<Vec<ApiTool>> = request.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| ApiTool {
                    kind: "function".to_string(),
                    function: ApiFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect()
        });

        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            tools,
            tool_choice: request.tool_choice.as_ref().map(ToolChoice::to_value),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(15))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Parse a successful response body into the first choice.
///
/// A body that decodes but carries no choices is a
/// [`Error::MalformedResponse`]; a body that does not decode is a
/// [`Error::Parse`].
pub fn parse_response_body(body: &str) -> Result<Response, Error> {
    let api_response: ApiResponse =
        serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;

    let choice = api_response
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| Error::MalformedResponse("no choices in response".to_string()))?;

    let message = choice
        .message
        .ok_or_else(|| Error::MalformedResponse("choice has no message".to_string()))?;

    debug!(
        finish_reason = ?choice.finish_reason,
        tool_calls = message.tool_calls.as_ref().map_or(0, Vec::len),
        "parsed chat completion"
    );

    Ok(Response {
        id: api_response.id,
        model: api_response.model,
        message: message.into(),
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
        usage: api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        }),
    })
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.is_empty() => "<empty body>".to_string(),
        Err(_) => body.to_string(),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request to send to Groq.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sampling temperature, clamped into `[0, 2]`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
    pub name: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(text.into()))
    }

    /// Create a user message with text content.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(text.into()))
    }

    /// Create an assistant message with text content.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(text.into()))
    }

    /// Create an assistant message that only carries tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, None)
        }
    }

    /// Create a tool-result message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::with_role(Role::Tool, Some(content.into()))
        }
    }

    /// Text content, if any and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw argument text; expected to be a JSON object.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A tool definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Tool choice configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    Function { name: String },
}

impl ToolChoice {
    fn to_value(&self) -> serde_json::Value {
        match self {
            ToolChoice::Auto => serde_json::Value::from("auto"),
            ToolChoice::None => serde_json::Value::from("none"),
            ToolChoice::Required => serde_json::Value::from("required"),
            ToolChoice::Function { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        }
    }
}

/// A completion response from Groq, reduced to its first choice.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: Option<String>,
    pub model: Option<String>,
    pub message: Message,
    pub finish_reason: FinishReason,
    pub usage: Option<Usage>,
}

impl Response {
    /// Non-empty text content of the selected message.
    pub fn text(&self) -> Option<&str> {
        self.message.text()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.message.tool_calls
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    fn parse(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => FinishReason::Length,
            Some("tool_calls") | Some("function_call") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    #[serde(default = "assistant_role")]
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

fn assistant_role() -> Role {
    Role::Assistant
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|c| ApiToolCall {
                        id: c.id.clone(),
                        kind: "function".to_string(),
                        function: ApiFunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };

        ApiMessage {
            role: message.role,
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        }
    }
}

impl From<ApiMessage> for Message {
    fn from(message: ApiMessage) -> Self {
        Message {
            role: message.role,
            content: message.content,
            tool_calls: message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    name: c.function.name,
                    arguments: c.function.arguments,
                })
                .collect(),
            tool_call_id: message.tool_call_id,
            name: message.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Option<Vec<ApiChoice>>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// Error envelope used by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
