//! Task execution utilities with automatic logging

use std::fmt::Display;
use std::future::Future;
use survey_sdk::{log_respondent_complete, log_respondent_failed, log_respondent_start};

use crate::workflow_utils::batch::TaskContext;

/// Execute one respondent task with automatic logging
///
/// Wraps task execution with:
/// - `log_respondent_start` before execution
/// - `log_respondent_complete` on success
/// - `log_respondent_failed` on error
///
/// # Example
/// ```no_run
/// # use survey_runner::workflow_utils::{execute_task, TaskContext};
/// # async fn example(ctx: TaskContext) -> Result<u32, std::io::Error> {
/// let sum = execute_task("alice", ctx, || async { Ok::<_, std::io::Error>(42) }).await?;
/// # Ok(sum)
/// # }
/// ```
pub async fn execute_task<F, Fut, R, E>(user: &str, ctx: TaskContext, executor: F) -> Result<R, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, E>>,
    E: Display,
{
    log_respondent_start!(user);
    tracing::info!(
        user,
        task = ctx.task_number,
        total = ctx.total_tasks,
        "respondent started"
    );

    match executor().await {
        Ok(result) => {
            log_respondent_complete!(user);
            Ok(result)
        }
        Err(e) => {
            log_respondent_failed!(user, e);
            Err(e)
        }
    }
}
