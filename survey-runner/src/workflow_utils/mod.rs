//! Workflow utilities for concurrent, bounded, retried survey calls
//!
//! This module provides reusable components for a survey run:
//! - **batch**: Worker pool with concurrency control and panic isolation
//! - **task**: Respondent-level logging and execution
//! - **gate**: Shared bound on in-flight service calls
//! - **retry**: Bounded retry with rate-limit backoff
//! - **answer**: Integer extraction and range validation

pub mod answer;
pub mod batch;
pub mod gate;
pub mod retry;
pub mod task;

// Re-export commonly used types and functions
pub use answer::{extract_answer, AnswerError, ScanDirection};
pub use batch::{spawn_pool, TaskContext, TaskOutcome, TaskPanic};
pub use gate::{CallGate, GateClosed, GatePermit, SemaphoreGate};
pub use retry::{ask_with_retry, QuestionError, QuestionKey, RetryPolicy};
pub use task::execute_task;
