//! Completion client for single chat exchanges
//!
//! This module provides the [`CompletionClient`] seam and its HTTP
//! implementation. One call to [`CompletionClient::complete`] is one attempt:
//!
//! ```text
//! ┌──────────────┐   system + user    ┌────────────────────┐
//! │    caller    │ ─────────────────→ │ chat-completions   │
//! │ (retry loop) │ ←───────────────── │      service       │
//! └──────────────┘  text | classified └────────────────────┘
//!                        error
//! ```
//!
//! **Key Design Points:**
//! - The service is treated as stateless: every call carries the full system context
//! - Rate limiting (429) is surfaced as its own variant so callers can back off
//! - No retries, no sleeping: a failed call returns immediately
//!
//! # Example: Custom endpoint
//!
//! ```no_run
//! use completion_client::{ClientConfig, CompletionClient, HttpCompletionClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     api_url: "http://localhost:8000/v1/chat/completions".to_string(),
//!     model: "local-model".to_string(),
//!     timeout: Some(Duration::from_secs(120)),
//!     ..Default::default()
//! };
//! let client = HttpCompletionClient::new(config)?;
//! let answer = client.complete("context", "question").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use std::time::Duration;

use crate::error::{CompletionError, Result};
use crate::types::{ChatRequest, ChatResponse, ClientConfig};

/// One request/response exchange with a text-generation service
///
/// Implementations must not retry internally. Tests substitute scripted
/// implementations of this trait for the HTTP client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `system` as the system context and `user` as the single user
    /// message, returning the primary text of the reply.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// reqwest-backed client for OpenAI-compatible chat-completions endpoints
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpCompletionClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Config`] if the URL or model is empty, or if
    /// the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_url.trim().is_empty() {
            return Err(CompletionError::Config {
                message: "api_url must not be empty".to_string(),
            });
        }
        if config.model.trim().is_empty() {
            return Err(CompletionError::Config {
                message: "model must not be empty".to_string(),
            });
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| CompletionError::Config {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        Ok(Self { client, config })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_once(&self, body: &ChatRequest) -> Result<String> {
        let mut request = self
            .client
            .post(&self.config.api_url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);

        if let Some(key) = &self.config.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => {
                let raw = response.text().await?;
                let parsed: ChatResponse =
                    serde_json::from_str(&raw).map_err(|e| CompletionError::MalformedResponse {
                        message: format!("invalid JSON body: {}", e),
                    })?;
                parsed
                    .primary_text()
                    .map(str::to_string)
                    .ok_or_else(|| CompletionError::MalformedResponse {
                        message: "missing choices[0].message.content".to_string(),
                    })
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(CompletionError::RateLimited { retry_after })
            }

            code => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| status.to_string());
                Err(CompletionError::Status {
                    status: code,
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest::exchange(&self.config, system, user);

        #[cfg(feature = "tracing-support")]
        tracing::trace!(model = %body.model, user_len = user.len(), "sending completion request");

        let result = self.send_once(&body).await;

        if let Err(ref _e) = result {
            #[cfg(feature = "tracing-support")]
            tracing::debug!(error = %_e, "completion request failed");
        }

        result
    }
}
