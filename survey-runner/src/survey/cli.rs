//! CLI argument parsing for survey runs

use clap::Parser;
use completion_client::{ClientConfig, DEFAULT_API_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use std::time::Duration;

use crate::survey::input::ContextSource;
use crate::survey::workflow::SurveyConfig;
use crate::workflow_utils::ScanDirection;

/// Environment variables consulted for the API key, in order
pub const API_KEY_VARS: [&str; 2] = ["SURVEY_API_KEY", "DASHSCOPE_API_KEY"];

/// Survey Runner CLI Arguments
#[derive(Parser, Debug, Clone)]
#[command(
    name = "survey-runner",
    about = "Administer a Likert questionnaire to synthetic respondents through a chat-completions service"
)]
pub struct Args {
    /// Respondent file (JSON array of {user, uid, keywords, story})
    #[arg(short, long)]
    pub respondents: PathBuf,

    /// Questionnaire file (JSON array of {id, text, dimension, reverse})
    #[arg(short, long)]
    pub questions: PathBuf,

    /// Result store path (default: results/survey_result_<source>[_reasoning]_repeat<N>.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Prompt template (YAML)
    #[arg(short, long)]
    pub prompts: Option<PathBuf>,

    /// Which respondent field supplies the context
    #[arg(long, value_enum, default_value_t = ContextSource::Memory)]
    pub context_source: ContextSource,

    /// Respondents processed in parallel
    #[arg(short, long, default_value = "8")]
    pub workers: usize,

    /// Service calls in flight across all workers
    #[arg(long, default_value = "6")]
    pub max_concurrent_calls: usize,

    /// Attempts per question per repetition
    #[arg(long, default_value = "5")]
    pub max_retry: u32,

    /// Repetitions of the questionnaire per respondent
    #[arg(long, default_value = "1")]
    pub repeat: usize,

    /// Seed for fragment shuffling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Which digit run in a response is taken as the answer
    #[arg(long, value_enum, default_value_t = ScanDirection::Backward)]
    pub scan: ScanDirection,

    /// Model identifier
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completions endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Sampling temperature
    #[arg(long, default_value = "0.3")]
    pub temperature: f32,

    /// Enable extended reasoning on the service
    #[arg(long)]
    pub enable_thinking: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Lower bound of the rate-limit backoff, in seconds
    #[arg(long, default_value = "3")]
    pub backoff_min_secs: u64,

    /// Upper bound of the rate-limit backoff, in seconds
    #[arg(long, default_value = "20")]
    pub backoff_max_secs: u64,

    /// Also survey an empty-context baseline respondent
    #[arg(long)]
    pub baseline: bool,
}

/// First non-empty API key from [`API_KEY_VARS`]
pub fn api_key_from_env() -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|key| !key.trim().is_empty())
}

impl From<Args> for SurveyConfig {
    fn from(args: Args) -> Self {
        SurveyConfig {
            respondents_file: args.respondents,
            questions_file: args.questions,
            output: args.output,
            prompts_file: args.prompts,
            context_source: args.context_source,
            workers: args.workers,
            max_concurrent_calls: args.max_concurrent_calls,
            max_retry: args.max_retry,
            repeat: args.repeat,
            seed: args.seed,
            scan: args.scan,
            backoff_min: Duration::from_secs(args.backoff_min_secs),
            backoff_max: Duration::from_secs(args.backoff_max_secs),
            include_baseline: args.baseline,
            client: ClientConfig {
                api_url: args.api_url,
                api_key: api_key_from_env(),
                model: args.model,
                temperature: Some(args.temperature),
                enable_thinking: Some(args.enable_thinking),
                timeout: args.timeout_secs.map(Duration::from_secs),
            },
        }
    }
}
