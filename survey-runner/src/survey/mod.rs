//! Survey administration module
//!
//! This module administers a Likert-scale personality questionnaire to
//! synthetic respondents through a chat-completions service. It covers input
//! loading, system-context assembly, per-respondent processing with bounded
//! retries, score aggregation and a resumable JSON result store.

pub mod cli;
pub mod context;
pub mod input;
pub mod processor;
pub mod store;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use context::PromptTemplate;
pub use input::{ContextSource, QuestionSet};
pub use store::ResultStore;
pub use types::{Answer, Dimension, EvaluationContext, Question, Record, Respondent};
pub use workflow::{run_survey, run_survey_with, FailedRespondent, SurveyConfig, SurveySummary};
