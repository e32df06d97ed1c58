//! Run orchestration
//!
//! The primary entry point is [`run_survey`], which loads inputs, resumes
//! from the result store and administers the questionnaire to every pending
//! respondent on a bounded worker pool, according to a [`SurveyConfig`].
//!
//! Workers never touch the store. Finished records flow back to this module,
//! which appends them one at a time, so the store is rewritten after every
//! success and an interrupted run loses at most the respondents in flight.

use anyhow::{Context, Result};
use completion_client::{ClientConfig, CompletionClient, HttpCompletionClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use survey_sdk::{
    log_file_saved, log_info, log_progress, log_record_saved, log_respondent_failed,
    log_run_complete, log_run_start, log_warning,
};

use crate::survey::{
    context::PromptTemplate,
    input::{load_questions, load_respondents, ContextSource},
    processor::{process_respondent, SurveyContext},
    store::ResultStore,
    types::Respondent,
};
use crate::workflow_utils::{
    execute_task, spawn_pool, CallGate, RetryPolicy, ScanDirection, SemaphoreGate,
};

/// Configuration for a survey run
///
/// Built once at startup and read-only afterwards.
///
/// # Examples
///
/// ```no_run
/// use survey_runner::survey::SurveyConfig;
///
/// let config = SurveyConfig {
///     respondents_file: "data/personas.json".into(),
///     questions_file: "data/bigfive.json".into(),
///     repeat: 3,
///     workers: 4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    /// Respondent file (JSON array)
    pub respondents_file: PathBuf,
    /// Questionnaire file (JSON array)
    pub questions_file: PathBuf,
    /// Result store path; derived from the run settings when `None`
    pub output: Option<PathBuf>,
    /// Prompt template (YAML); empty wording when `None`, which is only
    /// accepted if every pending respondent has context
    pub prompts_file: Option<PathBuf>,
    /// Field respondents draw their context from
    pub context_source: ContextSource,
    /// Respondents processed concurrently
    pub workers: usize,
    /// Service calls in flight across all workers
    pub max_concurrent_calls: usize,
    /// Attempts per question per repetition
    pub max_retry: u32,
    /// Repetitions per respondent
    pub repeat: usize,
    /// Seed for fragment shuffling
    pub seed: u64,
    /// Digit run selection for answer extraction
    pub scan: ScanDirection,
    /// Lower bound of the rate-limit backoff
    pub backoff_min: Duration,
    /// Upper bound of the rate-limit backoff
    pub backoff_max: Duration,
    /// Append the empty-context baseline respondent
    pub include_baseline: bool,
    /// Service connection and generation settings
    pub client: ClientConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            respondents_file: PathBuf::new(),
            questions_file: PathBuf::new(),
            output: None,
            prompts_file: None,
            context_source: ContextSource::Memory,
            workers: 8,
            max_concurrent_calls: 6,
            max_retry: 5,
            repeat: 1,
            seed: 42,
            scan: ScanDirection::Backward,
            backoff_min: Duration::from_secs(3),
            backoff_max: Duration::from_secs(20),
            include_baseline: false,
            client: ClientConfig::default(),
        }
    }
}

impl SurveyConfig {
    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("workers must be at least 1");
        }
        if self.max_concurrent_calls == 0 {
            anyhow::bail!("max concurrent calls must be at least 1");
        }
        if self.max_retry == 0 {
            anyhow::bail!("max retry must be at least 1");
        }
        if self.repeat == 0 {
            anyhow::bail!("repeat must be at least 1");
        }
        if self.backoff_min > self.backoff_max {
            anyhow::bail!(
                "backoff window is empty: min {:?} > max {:?}",
                self.backoff_min,
                self.backoff_max
            );
        }
        Ok(())
    }

    /// Result store path
    ///
    /// Defaults to `results/survey_result_<source>[_reasoning]_repeat<N>.json`.
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let reasoning = if self.client.enable_thinking == Some(true) {
                "_reasoning"
            } else {
                ""
            };
            PathBuf::from("results").join(format!(
                "survey_result_{}{}_repeat{}.json",
                self.context_source.as_str(),
                reasoning,
                self.repeat
            ))
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retry: self.max_retry,
            backoff_min: self.backoff_min,
            backoff_max: self.backoff_max,
            scan: self.scan,
        }
    }
}

/// A respondent that produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRespondent {
    pub user: String,
    pub error: String,
}

/// What a run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySummary {
    /// Respondents in the input (including the baseline, if any)
    pub total: usize,
    /// Already complete in the store at startup
    pub skipped: usize,
    /// Newly stored this run
    pub succeeded: usize,
    /// Aborted this run; retried on the next run
    pub failed: Vec<FailedRespondent>,
    /// Result store path
    pub output: PathBuf,
}

/// Run a survey against the configured HTTP service
///
/// # Errors
///
/// Returns an error if the configuration or inputs are invalid, or if the
/// result store cannot be read or written. Individual respondent failures are
/// not errors; they are reported in [`SurveySummary::failed`].
pub async fn run_survey(config: &SurveyConfig) -> Result<SurveySummary> {
    let client = HttpCompletionClient::new(config.client.clone())
        .context("Failed to create completion client")?;
    let gate = SemaphoreGate::new(config.max_concurrent_calls);

    run_survey_with(config, Arc::new(client), Arc::new(gate)).await
}

/// Run a survey with an injected client and call gate
pub async fn run_survey_with(
    config: &SurveyConfig,
    client: Arc<dyn CompletionClient>,
    gate: Arc<dyn CallGate>,
) -> Result<SurveySummary> {
    config.validate()?;

    let questions = load_questions(&config.questions_file).await?;
    let mut respondents = load_respondents(&config.respondents_file, config.context_source).await?;
    if config.include_baseline {
        let baseline = Respondent::baseline();
        if respondents.iter().any(|r| r.user == baseline.user) {
            anyhow::bail!("respondent file already contains the baseline user '{}'", baseline.user);
        }
        respondents.push(baseline);
    }
    let template = match &config.prompts_file {
        Some(path) => PromptTemplate::load(path).await?,
        None => PromptTemplate::default(),
    };

    let output = config.output_path();
    let mut store = ResultStore::open(&output).await?;

    let total = respondents.len();
    let (pending, skipped) = store.pending(respondents);
    let pending_count = pending.len();

    let contextless: Vec<&str> = pending
        .iter()
        .filter(|r| r.context.is_empty())
        .map(|r| r.user.as_str())
        .collect();
    if !contextless.is_empty() {
        if template.empty_context.trim().is_empty() {
            anyhow::bail!(
                "respondents without context ({}) need a prompt template with `empty_context` set",
                contextless.join(", ")
            );
        }
        for user in &contextless {
            log_warning!("respondent '{}' has no context, using the empty-context fallback", user);
        }
    }

    log_run_start!(total, pending_count, skipped);
    tracing::info!(
        total,
        pending = pending_count,
        skipped,
        questions = questions.len(),
        repeat = config.repeat,
        output = %output.display(),
        "survey run starting"
    );

    let mut summary = SurveySummary {
        total,
        skipped,
        succeeded: 0,
        failed: Vec::new(),
        output: output.clone(),
    };

    if pending.is_empty() {
        log_info!("All {} respondents already complete in {}", total, output.display());
        log_run_complete!(0, 0);
        return Ok(summary);
    }


    let users: Vec<String> = pending.iter().map(|r| r.user.clone()).collect();
    let survey = Arc::new(SurveyContext {
        client,
        gate,
        questions,
        template,
        policy: config.retry_policy(),
        repeat: config.repeat,
        seed: config.seed,
    });

    let mut pool = spawn_pool(pending, config.workers, move |respondent: Respondent, ctx| {
        let survey = survey.clone();
        async move {
            execute_task(&respondent.user, ctx, || {
                process_respondent(&respondent, &survey)
            })
            .await
        }
    });

    let mut finished = 0;
    while let Some(joined) = pool.join_next().await {
        let (ctx, outcome) = joined.context("Worker task was cancelled")?;
        finished += 1;

        match outcome {
            Ok(Ok(record)) => {
                let user = record.user.clone();
                if store.append(record).await? {
                    summary.succeeded += 1;
                    log_record_saved!(user, output.display(), store.len());
                }
            }
            Ok(Err(e)) => {
                tracing::error!(user = %users[ctx.task_number - 1], error = %e, "respondent failed");
                summary.failed.push(FailedRespondent {
                    user: users[ctx.task_number - 1].clone(),
                    error: e.to_string(),
                });
            }
            Err(panic) => {
                let user = &users[ctx.task_number - 1];
                tracing::error!(user = %user, error = %panic, "respondent worker panicked");
                log_respondent_failed!(user, panic);
                summary.failed.push(FailedRespondent {
                    user: user.clone(),
                    error: panic.to_string(),
                });
            }
        }

        log_progress!(finished, pending_count, "respondents");
    }

    if summary.succeeded > 0 {
        log_file_saved!(output.display());
    }
    log_run_complete!(summary.succeeded, summary.failed.len());
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed.len(),
        "survey run finished"
    );

    Ok(summary)
}
