//! Wire types and client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible endpoint
pub const DEFAULT_API_URL: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

/// Default model name
pub const DEFAULT_MODEL: &str = "qwen-turbo";

/// Connection and generation settings for [`crate::HttpCompletionClient`]
///
/// Generation parameters are opaque to the caller: they are forwarded as-is
/// on every request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full chat-completions URL
    pub api_url: String,
    /// Bearer token, omitted from the request when `None`
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Extended reasoning toggle (sent as `enable_thinking`)
    pub enable_thinking: Option<bool>,
    /// Per-request timeout; transport default when `None`
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.3),
            enable_thinking: None,
            timeout: None,
        }
    }
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
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
}

/// Request body for a chat-completions call
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_thinking: Option<bool>,
}

impl ChatRequest {
    /// Build a stateless system + user exchange from the client settings
    pub fn exchange(config: &ClientConfig, system: &str, user: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: config.temperature,
            enable_thinking: config.enable_thinking,
        }
    }
}

/// Response body; only the fields the client reads are modelled
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Primary text of the first choice
    pub fn primary_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}
