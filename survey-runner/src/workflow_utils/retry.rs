//! Bounded retry for one question of one repetition
//!
//! Each attempt acquires the shared [`CallGate`], performs one stateless
//! exchange, releases the gate and then classifies the outcome:
//!
//! ```text
//! attempt ──→ Ok(text) ──→ extract ──→ in range ──→ Answer
//!    │                        │
//!    │                        └──→ no integer / out of range ──→ retry now
//!    ├──→ RateLimited ──→ sleep random [backoff_min, backoff_max] ──→ retry
//!    ├──→ Transport / Status / Malformed ──→ retry now
//!    └──→ Config ──→ give up
//! ```
//!
//! Every attempt counts toward `max_retry`. Per-attempt errors never escape:
//! when the budget is spent the caller gets [`QuestionError::RetryExhausted`].

use completion_client::{CompletionClient, CompletionError};
use rand::Rng;
use std::time::Duration;
use survey_sdk::log_attempt_failed;

use crate::survey::types::Answer;
use crate::workflow_utils::answer::{extract_answer, AnswerError, ScanDirection};
use crate::workflow_utils::gate::CallGate;

/// Retry budget and backoff window
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts allowed per question per repetition
    pub max_retry: u32,
    /// Lower bound of the rate-limit backoff
    pub backoff_min: Duration,
    /// Upper bound of the rate-limit backoff
    pub backoff_max: Duration,
    /// Digit run selection for answer extraction
    pub scan: ScanDirection,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 5,
            backoff_min: Duration::from_secs(3),
            backoff_max: Duration::from_secs(20),
            scan: ScanDirection::default(),
        }
    }
}

impl RetryPolicy {
    /// Uniformly random delay in `[backoff_min, backoff_max]`
    pub fn rate_limit_delay(&self) -> Duration {
        let min = self.backoff_min.as_millis() as u64;
        let max = (self.backoff_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn backoff_for(&self, retry_after: Option<Duration>) -> Duration {
        let delay = self.rate_limit_delay();
        match retry_after {
            Some(hint) => delay.max(hint.min(self.backoff_max)),
            None => delay,
        }
    }
}

/// Which question of which repetition is being asked
#[derive(Debug, Clone, Copy)]
pub struct QuestionKey<'a> {
    pub user: &'a str,
    pub question_id: u32,
    pub repetition: usize,
}

/// Why a single attempt was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Call(#[from] CompletionError),

    #[error("{error} (response: {text:?})")]
    Answer { error: AnswerError, text: String },
}

impl AttemptError {
    /// Whether another attempt could produce a valid answer
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Call(e) => e.is_retryable(),
            Self::Answer { .. } => true,
        }
    }
}

/// Failures that end a question
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuestionError {
    #[error(
        "question {question_id} (repetition {repetition}) for '{user}' failed after {attempts} attempts: {last_error}"
    )]
    RetryExhausted {
        user: String,
        question_id: u32,
        repetition: usize,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    GateClosed(#[from] crate::workflow_utils::gate::GateClosed),
}

async fn attempt_once(
    client: &dyn CompletionClient,
    gate: &dyn CallGate,
    scan: ScanDirection,
    system: &str,
    user_prompt: &str,
) -> Result<Result<Answer, AttemptError>, QuestionError> {
    let permit = gate.acquire().await?;
    let reply = client.complete(system, user_prompt).await;
    drop(permit);

    Ok(reply.map_err(AttemptError::from).and_then(|text| {
        match extract_answer(&text, scan) {
            Ok(answer) => Ok(Answer { answer, text }),
            Err(error) => Err(AttemptError::Answer { error, text }),
        }
    }))
}

/// Ask one question until a valid answer arrives or the budget is spent
pub async fn ask_with_retry(
    client: &dyn CompletionClient,
    gate: &dyn CallGate,
    policy: &RetryPolicy,
    key: QuestionKey<'_>,
    system: &str,
    user_prompt: &str,
) -> Result<Answer, QuestionError> {
    let mut last_error = String::from("no attempts allowed");
    let mut attempts = 0;

    for attempt in 1..=policy.max_retry {
        attempts = attempt;
        let error = match attempt_once(client, gate, policy.scan, system, user_prompt).await? {
            Ok(answer) => {
                tracing::info!(
                    user = key.user,
                    question_id = key.question_id,
                    repetition = key.repetition,
                    attempt,
                    answer = answer.answer,
                    text = %answer.text,
                    "answer accepted"
                );
                return Ok(answer);
            }
            Err(error) => error,
        };

        tracing::warn!(
            user = key.user,
            question_id = key.question_id,
            repetition = key.repetition,
            attempt,
            max_attempts = policy.max_retry,
            error = %error,
            "attempt failed"
        );
        log_attempt_failed!(
            key.user,
            key.question_id,
            key.repetition,
            attempt,
            policy.max_retry,
            error
        );
        last_error = error.to_string();

        if attempt == policy.max_retry || !error.is_retryable() {
            break;
        }

        if let AttemptError::Call(CompletionError::RateLimited { retry_after }) = error {
            let backoff = policy.backoff_for(retry_after);
            tracing::info!(
                user = key.user,
                backoff_ms = backoff.as_millis() as u64,
                "rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    Err(QuestionError::RetryExhausted {
        user: key.user.to_string(),
        question_id: key.question_id,
        repetition: key.repetition,
        attempts,
        last_error,
    })
}
