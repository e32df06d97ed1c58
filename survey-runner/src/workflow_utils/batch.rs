//! Worker pool for parallel respondent processing

use futures::{Future, FutureExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Context provided to each task in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    /// Task number (1-indexed for display)
    pub task_number: usize,
    /// Total number of tasks submitted
    pub total_tasks: usize,
}

/// A task panicked instead of returning
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task panicked: {message}")]
pub struct TaskPanic {
    pub message: String,
}

impl TaskPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self { message }
    }
}

/// Outcome of one pool task, tagged with its context
pub type TaskOutcome<R> = (TaskContext, Result<R, TaskPanic>);

/// Spawn every item onto a pool of at most `pool_size` concurrent workers
///
/// # Arguments
/// - `items`: Items to process
/// - `pool_size`: Maximum concurrent tasks
/// - `task_executor`: Function that processes each item, receives (item, context)
///
/// # Returns
/// A [`JoinSet`] yielding outcomes in order of completion (not input order).
/// The caller drains it and is the only place results are funneled to.
///
/// # Error Handling
/// Never fails fast: every item runs to completion. A panicking task is
/// caught and reported as [`TaskPanic`] without affecting its siblings.
///
/// # Example
/// ```no_run
/// # use survey_runner::workflow_utils::spawn_pool;
/// # async fn example() {
/// let mut pool = spawn_pool(vec![1, 2, 3], 2, |item, _ctx| async move { item * 2 });
/// while let Some(Ok((ctx, outcome))) = pool.join_next().await {
///     println!("task {} → {:?}", ctx.task_number, outcome);
/// }
/// # }
/// ```
pub fn spawn_pool<T, F, Fut, R>(
    items: Vec<T>,
    pool_size: usize,
    task_executor: F,
) -> JoinSet<TaskOutcome<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, TaskContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let sem = Arc::new(Semaphore::new(pool_size.max(1)));
    let executor = Arc::new(task_executor);
    let mut tasks = JoinSet::new();

    for (idx, item) in items.into_iter().enumerate() {
        let sem = sem.clone();
        let executor = executor.clone();

        let ctx = TaskContext {
            task_number: idx + 1,
            total_tasks: total,
        };

        tasks.spawn(async move {
            // Blocks while pool_size tasks are running
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        ctx,
                        Err(TaskPanic {
                            message: "worker pool closed".to_string(),
                        }),
                    )
                }
            };

            let outcome = AssertUnwindSafe(executor(item, ctx))
                .catch_unwind()
                .await
                .map_err(TaskPanic::from_payload);

            (ctx, outcome)
        });
    }

    tasks
}
