//! Administering the questionnaire to one respondent
//!
//! Repetitions run in order, questions run in questionnaire order within a
//! repetition. The first question that exhausts its retries aborts the whole
//! respondent: a partial record is never produced.

use chrono::Utc;
use completion_client::CompletionClient;
use std::sync::Arc;

use crate::survey::context::{ContextBuilder, PromptTemplate};
use crate::survey::input::QuestionSet;
use crate::survey::types::{AnswerTrace, Record, Respondent, ScoreError, ScoreTable};
use crate::workflow_utils::{ask_with_retry, CallGate, QuestionError, QuestionKey, RetryPolicy};

/// Shared, read-only state for processing respondents
pub struct SurveyContext {
    pub client: Arc<dyn CompletionClient>,
    pub gate: Arc<dyn CallGate>,
    pub questions: QuestionSet,
    pub template: PromptTemplate,
    pub policy: RetryPolicy,
    pub repeat: usize,
    pub seed: u64,
}

/// Why a respondent produced no record
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RespondentError {
    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

/// Run every repetition of the questionnaire for one respondent
pub async fn process_respondent(
    respondent: &Respondent,
    survey: &SurveyContext,
) -> Result<Record, RespondentError> {
    let questions = &survey.questions;
    let mut scores = ScoreTable::new(questions.dimensions(), survey.repeat);
    let mut answers = AnswerTrace::new();
    let mut contexts = ContextBuilder::new(respondent, &survey.template, survey.seed);

    for repetition in 0..survey.repeat {
        let system = contexts.next_context();

        for question in questions.questions() {
            let key = QuestionKey {
                user: &respondent.user,
                question_id: question.id,
                repetition,
            };
            let prompt = survey.template.question_prompt(question);

            let answer = ask_with_retry(
                survey.client.as_ref(),
                survey.gate.as_ref(),
                &survey.policy,
                key,
                &system,
                &prompt,
            )
            .await?;

            scores.add(
                question.dimension,
                repetition,
                question.contribution(answer.answer),
            )?;
            answers
                .entry(question.id)
                .or_default()
                .insert(repetition, answer);
        }

        tracing::debug!(user = %respondent.user, repetition, "repetition complete");
    }

    Ok(Record {
        user: respondent.user.clone(),
        uid: respondent.uid,
        result: scores.into_scores(),
        answer: answers,
        completed_at: Some(Utc::now()),
    })
}
