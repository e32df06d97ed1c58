//! Tests for per-respondent processing
//!
//! Tests scoring, reverse items, repetitions, context reuse and fail-fast abort

use super::common::*;
use completion_client::CompletionClient;
use std::sync::Arc;
use std::time::Duration;
use survey_runner::survey::processor::{process_respondent, RespondentError, SurveyContext};
use survey_runner::survey::types::{Dimension, EvaluationContext, Question, Respondent};
use survey_runner::survey::{PromptTemplate, QuestionSet};
use survey_runner::workflow_utils::{QuestionError, RetryPolicy, SemaphoreGate};

fn questions() -> QuestionSet {
    serde_json::from_value::<Vec<Question>>(openness_questions())
        .map(|q| QuestionSet::new(q).unwrap())
        .unwrap()
}

fn respondent(fragments: &[&str]) -> Respondent {
    Respondent {
        user: "alice".to_string(),
        uid: 11,
        context: EvaluationContext::Fragments(fragments.iter().map(|s| s.to_string()).collect()),
    }
}

fn survey(client: Arc<ScriptedClient>, questions: QuestionSet, repeat: usize) -> SurveyContext {
    SurveyContext {
        client: client as Arc<dyn CompletionClient>,
        gate: Arc::new(SemaphoreGate::new(2)),
        questions,
        template: PromptTemplate {
            system_prefix: "Memories:\n    ".to_string(),
            empty_context: "No memories.".to_string(),
            question_prefix: "Rate 1-6: ".to_string(),
            ..Default::default()
        },
        policy: RetryPolicy {
            max_retry: 3,
            backoff_min: Duration::from_millis(1),
            backoff_max: Duration::from_millis(2),
            ..Default::default()
        },
        repeat,
        seed: 42,
    }
}

// ============================================================================
// Scoring Tests
// ============================================================================

#[tokio::test]
async fn test_reverse_item_scoring() {
    let client = shared(ScriptedClient::constant("answer: 4"));
    let survey = survey(client.clone(), questions(), 1);

    let record = process_respondent(&respondent(&["likes art"]), &survey)
        .await
        .unwrap();

    // 4 + (7 - 4)
    assert_eq!(record.result[&Dimension::O][&0], 7);
    assert_eq!(record.user, "alice");
    assert_eq!(record.uid, 11);
    assert!(record.completed_at.is_some());
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_every_answer_in_range_and_traced() {
    let client = shared(ScriptedClient::new(|_, user| {
        if user.contains("vivid") {
            Ok("I'd say 6".to_string())
        } else {
            Ok("Probably 2, final answer 1".to_string())
        }
    }));
    let survey = survey(client, questions(), 2);

    let record = process_respondent(&respondent(&["a", "b", "c"]), &survey)
        .await
        .unwrap();

    for per_repetition in record.answer.values() {
        assert_eq!(per_repetition.len(), 2);
        for answer in per_repetition.values() {
            assert!((1..=6).contains(&answer.answer));
        }
    }
    assert_eq!(record.answer[&1][&0].answer, 6);
    assert_eq!(record.answer[&2][&1].answer, 1);
    assert_eq!(record.answer[&2][&1].text, "Probably 2, final answer 1");
    // 6 + (7 - 1) in both repetitions
    assert_eq!(record.result[&Dimension::O][&0], 12);
    assert_eq!(record.result[&Dimension::O][&1], 12);
}

#[tokio::test]
async fn test_dimensions_zero_filled_for_every_repetition() {
    let set: Vec<Question> = serde_json::from_value(mixed_questions()).unwrap();
    let client = shared(ScriptedClient::constant("3"));
    let survey = survey(client, QuestionSet::new(set).unwrap(), 3);

    let record = process_respondent(&respondent(&["x"]), &survey)
        .await
        .unwrap();

    assert_eq!(record.result.len(), 2);
    for dimension in [Dimension::E, Dimension::N] {
        assert_eq!(record.result[&dimension].len(), 3);
    }
    // E: 3 + (7 - 3); N: 3
    assert_eq!(record.result[&Dimension::E][&2], 7);
    assert_eq!(record.result[&Dimension::N][&2], 3);
}

// ============================================================================
// Context Tests
// ============================================================================

#[tokio::test]
async fn test_context_resent_and_fixed_within_repetition() {
    let client = shared(ScriptedClient::constant("5"));
    let survey = survey(client.clone(), questions(), 2);

    process_respondent(&respondent(&["one", "two", "three", "four"]), &survey)
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].0, calls[1].0);
    assert_eq!(calls[2].0, calls[3].0);
    assert!(calls.iter().all(|(system, _)| system.starts_with("Memories:\n    ")));
    assert_eq!(calls[0].1, "Rate 1-6: I have a vivid imagination.");
    assert_eq!(calls[1].1, "Rate 1-6: I avoid abstract ideas.");
}

#[tokio::test]
async fn test_empty_context_uses_fallback() {
    let client = shared(ScriptedClient::constant("2"));
    let survey = survey(client.clone(), questions(), 1);

    process_respondent(&Respondent::baseline(), &survey)
        .await
        .unwrap();

    assert!(client
        .calls()
        .iter()
        .all(|(system, _)| system == "No memories."));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_exhausted_question_aborts_respondent() {
    let client = shared(ScriptedClient::new(|_, user| {
        if user.contains("vivid") {
            Ok("no comment".to_string())
        } else {
            Ok("4".to_string())
        }
    }));
    let survey = survey(client.clone(), questions(), 2);

    let err = process_respondent(&respondent(&["x"]), &survey)
        .await
        .unwrap_err();

    match err {
        RespondentError::Question(QuestionError::RetryExhausted {
            question_id,
            repetition,
            attempts,
            ..
        }) => {
            assert_eq!(question_id, 1);
            assert_eq!(repetition, 0);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
    // No call is made after the abort
    assert_eq!(client.call_count(), 3);
}
