//! Tests for run orchestration
//!
//! Tests end-to-end runs, respondent isolation, resume, baseline and
//! concurrency bounds using a scripted completion client

use super::common::*;
use completion_client::{CompletionClient, CompletionError};
use std::sync::Arc;
use std::time::Duration;
use survey_runner::survey::{run_survey_with, ContextSource, PromptTemplate};
use survey_runner::workflow_utils::{CallGate, SemaphoreGate};

fn gate(capacity: usize) -> Arc<dyn CallGate> {
    Arc::new(SemaphoreGate::new(capacity))
}

fn dyn_client(client: &Arc<ScriptedClient>) -> Arc<dyn CompletionClient> {
    client.clone()
}

// ============================================================================
// End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_all_respondents_scored_and_stored() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &openness_questions(), &["ann", "ben", "cat"]);
    let client = shared(ScriptedClient::constant("answer: 4"));

    let summary = run_survey_with(&config, dyn_client(&client), gate(6))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.failed.is_empty());
    assert_eq!(client.call_count(), 6);

    let stored = read_store(&config.output_path());
    assert_eq!(stored.len(), 3);
    for record in &stored {
        assert_eq!(record["result"]["O"]["0"], 7);
        assert_eq!(record["answer"]["1"]["0"]["answer"], 4);
        assert_eq!(record["answer"]["2"]["0"]["text"], "answer: 4");
    }
}

#[tokio::test]
async fn test_accepted_answers_logged_at_default_level() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &openness_questions(), &["ann"]);
    let (logs, _guard) = LogCapture::install();

    let client = shared(ScriptedClient::constant("My answer is 4"));
    run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap();

    assert_eq!(logs.count(&["INFO", "answer accepted", "user=\"ann\""]), 2);
    assert_eq!(logs.count(&["answer accepted", "My answer is 4"]), 2);
}

#[tokio::test]
async fn test_nothing_pending_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &openness_questions(), &["ann", "ben"]);

    let first = shared(ScriptedClient::constant("3"));
    run_survey_with(&config, dyn_client(&first), gate(2))
        .await
        .unwrap();
    let before = std::fs::read_to_string(config.output_path()).unwrap();

    let second = shared(ScriptedClient::constant("3"));
    let summary = run_survey_with(&config, dyn_client(&second), gate(2))
        .await
        .unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(second.call_count(), 0);
    assert_eq!(std::fs::read_to_string(config.output_path()).unwrap(), before);
}

// ============================================================================
// Failure Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_exhausted_respondent_absent_others_stored() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann", "ben", "cat"]);
    config.max_retry = 3;
    let (logs, _guard) = LogCapture::install();

    let client = shared(ScriptedClient::new(|system, _| {
        if system.contains("I am ben") {
            Ok("I cannot answer that".to_string())
        } else {
            Ok("5".to_string())
        }
    }));

    let summary = run_survey_with(&config, dyn_client(&client), gate(4))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].user, "ben");
    assert!(summary.failed[0].error.contains("after 3 attempts"));

    // Exactly three attempts on the first question, then abort
    assert_eq!(client.calls_mentioning("I am ben"), 3);
    assert_eq!(logs.count(&["attempt failed", "user=\"ben\""]), 3);
    for attempt in 1..=3 {
        assert_eq!(
            logs.count(&["attempt failed", "user=\"ben\"", &format!("attempt={}", attempt)]),
            1
        );
    }

    let users: Vec<String> = read_store(&config.output_path())
        .iter()
        .map(|r| r["user"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(users.len(), 2);
    assert!(!users.contains(&"ben".to_string()));
}

#[tokio::test]
async fn test_rerun_only_retries_failed_respondent() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann", "ben"]);
    config.max_retry = 2;

    let flaky = shared(ScriptedClient::new(|system, _| {
        if system.contains("I am ben") {
            Err(CompletionError::Status {
                status: 503,
                message: "unavailable".to_string(),
            })
        } else {
            Ok("2".to_string())
        }
    }));
    let first = run_survey_with(&config, dyn_client(&flaky), gate(2))
        .await
        .unwrap();
    assert_eq!(first.failed.len(), 1);

    let healthy = shared(ScriptedClient::constant("6"));
    let second = run_survey_with(&config, dyn_client(&healthy), gate(2))
        .await
        .unwrap();

    assert_eq!(second.skipped, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(healthy.calls_mentioning("I am ann"), 0);
    assert_eq!(healthy.calls_mentioning("I am ben"), 2);

    let stored = read_store(&config.output_path());
    assert_eq!(stored.len(), 2);
    // Earlier record is untouched
    assert_eq!(stored[0]["user"], "ann");
    assert_eq!(stored[0]["answer"]["1"]["0"]["answer"], 2);
}

#[tokio::test]
async fn test_rate_limited_calls_recover() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &openness_questions(), &["ann"]);

    let throttled = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = throttled.clone();
    let client = shared(ScriptedClient::new(move |_, _| {
        if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) % 2 == 0 {
            Err(CompletionError::RateLimited { retry_after: None })
        } else {
            Ok("3".to_string())
        }
    }));

    let summary = run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(client.call_count(), 4);
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_gate_bounds_calls_across_workers() {
    let dir = tempfile::tempdir().unwrap();
    let users = ["a", "b", "c", "d", "e", "f"];
    let mut config = test_config(dir.path(), &mixed_questions(), &users);
    config.workers = 6;
    config.max_concurrent_calls = 2;

    let client = shared(ScriptedClient::constant("4").with_delay(Duration::from_millis(5)));

    let summary = run_survey_with(&config, dyn_client(&client), gate(2))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 6);
    assert!(client.peak_in_flight() <= 2);
    assert_eq!(client.call_count(), 18);
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[tokio::test]
async fn test_baseline_respondent_uses_fallback_context() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann"]);
    config.include_baseline = true;
    config.context_source = ContextSource::Story;

    let template = PromptTemplate {
        system_prefix: "Your story: ".to_string(),
        empty_context: "You are an ordinary person.".to_string(),
        ..Default::default()
    };
    let template_path = dir.path().join("prompts.yaml");
    std::fs::write(&template_path, serde_yaml::to_string(&template).unwrap()).unwrap();
    config.prompts_file = Some(template_path);

    let client = shared(ScriptedClient::constant("1"));
    let summary = run_survey_with(&config, dyn_client(&client), gate(2))
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(client.calls_mentioning("You are an ordinary person."), 2);
    assert_eq!(client.calls_mentioning("Your story: The story of ann"), 2);

    let stored = read_store(&config.output_path());
    let baseline = stored.iter().find(|r| r["user"] == "baseline").unwrap();
    assert_eq!(baseline["uid"], -1);
}

#[tokio::test]
async fn test_baseline_without_fallback_text_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann"]);
    config.include_baseline = true;

    let client = shared(ScriptedClient::constant("3"));
    let err = run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("empty_context"));
    assert!(err.to_string().contains("baseline"));
    assert_eq!(client.call_count(), 0);
    assert!(!config.output_path().exists());
}

#[tokio::test]
async fn test_contextful_respondents_need_no_fallback_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), &openness_questions(), &["ann"]);

    let client = shared(ScriptedClient::constant("3"));
    let summary = run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(client.calls().iter().all(|(system, _)| !system.is_empty()));
}

#[tokio::test]
async fn test_invalid_questionnaire_aborts_before_calls() {
    let dir = tempfile::tempdir().unwrap();
    let questions = serde_json::json!([
        {"id": 1, "text": "x", "dimension": "O"},
        {"id": 1, "text": "y", "dimension": "C"}
    ]);
    let config = test_config(dir.path(), &questions, &["ann"]);
    let client = shared(ScriptedClient::constant("3"));

    let err = run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("question id 1 appears more than once"));
    assert_eq!(client.call_count(), 0);
    assert!(!config.output_path().exists());
}

#[tokio::test]
async fn test_zero_workers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann"]);
    config.workers = 0;

    let client = shared(ScriptedClient::constant("3"));
    let err = run_survey_with(&config, dyn_client(&client), gate(1))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("workers"));
}

#[tokio::test]
async fn test_store_write_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path(), &openness_questions(), &["ann"]);
    let parent = dir.path().join("not_a_dir");
    config.output = Some(parent.join("store.json"));

    let client = shared(ScriptedClient::new({
        let parent = parent.clone();
        move |_, _| {
            // Block the store directory once the run is underway
            let _ = std::fs::write(&parent, "");
            Ok("3".to_string())
        }
    }));

    let result = run_survey_with(&config, dyn_client(&client), gate(1)).await;
    assert!(result.is_err());
}
