//! The seam between the dialogue session and the completion endpoint.

use async_trait::async_trait;
use groq::{Groq, Request, Response};

/// Anything that can answer a chat-completion request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a completion request.
    async fn complete(&self, request: Request) -> Result<Response, groq::Error>;

    /// Get the backend name, for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl ChatBackend for Groq {
    async fn complete(&self, request: Request) -> Result<Response, groq::Error> {
        Groq::complete(self, request).await
    }

    fn name(&self) -> &str {
        "groq"
    }
}
