/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                              SURVEY RUNNER                                   │
└─────────────────────────────────────────────────────────────────────────────┘

  LOAD
    │
    ├─> Respondents (memory fragments or story) + optional baseline
    ├─> Questionnaire (id, text, dimension, reverse)
    ├─> Prompt template (YAML)
    └─> Result store: users already present are skipped

         ↓

  ADMINISTER (worker pool, --workers N)
    │
    ├─> For each repetition:
    │   ├─> Reshuffle fragments (seeded) and build the system context
    │   └─> For each question, in order:
    │       ├─> Acquire call gate (--max-concurrent-calls M)
    │       ├─> One stateless exchange with the service
    │       ├─> Extract integer, validate 1..=6
    │       └─> Retry up to --max-retry; back off on rate limits
    └─> Sum per dimension (reverse items score 7 - x)

         ↓

  PERSIST
    │
    └─> Rewrite the store after every finished respondent

EXAMPLE COMMANDS:

  # Memory fragments, three repetitions
  cargo run -- \
    --respondents data/personas.json \
    --questions data/bigfive.json \
    --prompts prompts/memory.yaml \
    --repeat 3

  # Story context with reasoning enabled and a baseline respondent
  cargo run -- \
    --respondents data/personas.json \
    --questions data/bigfive.json \
    --prompts prompts/story.yaml \
    --context-source story \
    --enable-thinking \
    --baseline

  # Re-run the same command to resume: completed respondents are skipped
*/

use clap::Parser;
use survey_runner::survey::{cli::Args, run_survey, SurveyConfig};
use survey_sdk::{log_info, log_summary, log_warning};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config: SurveyConfig = args.into();

    if config.client.api_key.is_none() {
        log_warning!("no API key found in SURVEY_API_KEY or DASHSCOPE_API_KEY");
    }
    log_info!(
        "Surveying {} with model {} → {}",
        config.respondents_file.display(),
        config.client.model,
        config.output_path().display()
    );

    let summary = run_survey(&config).await?;

    for failed in &summary.failed {
        log_warning!("{} failed: {}", failed.user, failed.error);
    }
    log_summary!(
        summary.succeeded,
        summary.failed.len(),
        summary.output.display()
    );

    Ok(())
}
