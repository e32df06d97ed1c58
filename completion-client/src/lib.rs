//! Chat-completion client for questionnaire administration
//!
//! This crate performs exactly one request/response exchange against an
//! OpenAI-compatible chat-completions endpoint and reports every failure as a
//! classified [`CompletionError`]. Retry policy lives with the caller.
//!
//! # Example
//!
//! ```no_run
//! use completion_client::{ClientConfig, CompletionClient, HttpCompletionClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpCompletionClient::new(ClientConfig {
//!     api_key: Some("sk-...".to_string()),
//!     ..Default::default()
//! })?;
//!
//! let text = client
//!     .complete("You are a careful survey respondent.", "Question: I enjoy parties.")
//!     .await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{CompletionClient, HttpCompletionClient};
pub use error::{CompletionError, Result};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, ClientConfig, Role, DEFAULT_API_URL, DEFAULT_MODEL,
};

// Re-export async trait so implementors don't need their own dependency
pub use async_trait::async_trait;
