//! Completion service abstraction.
//!
//! The agent only needs freeform text back from the model, so the client
//! surface is a single `complete` call over a list of chat messages. The
//! wire format of the provider stays inside the concrete client.

mod openai_compat;
pub mod scripted;

pub use openai_compat::OpenAiCompatClient;
pub use scripted::{ScriptStep, ScriptedClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A text completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Sequences at which the provider should stop generating.
    pub stop: Vec<String>,
}

/// Errors returned by completion clients.
///
/// Every variant is treated as an unrecoverable external service failure by
/// the agent loop.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion service rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("completion service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("completion request timed out")]
    Timeout,

    #[error("completion service unreachable: {0}")]
    Transport(String),

    #[error("completion service returned an empty response")]
    EmptyResponse,

    #[error("failed to decode completion response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider label used in logs.
    fn provider(&self) -> &str;

    /// Request a completion and return the text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
