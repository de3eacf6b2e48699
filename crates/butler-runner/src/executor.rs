//! Bounded-parallel task execution.
//!
//! A semaphore caps concurrency at the worker count; the dispatcher admits
//! tasks in queue order and blocks while every slot is busy. Completion
//! order is unconstrained — results are slotted back by queue index so the
//! final list always matches enqueue order.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use butler_core::{split_command, Host};

use crate::queue::TaskQueue;
use crate::task::Task;

/// Per-attempt wall-clock limit.
pub const MAX_TASK_DURATION: Duration = Duration::from_secs(10 * 60);

/// Pause between a failed attempt and its retry.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Tuning knobs for the executor pool.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Concurrent worker slots.
    pub workers: usize,
    /// Per-attempt deadline.
    pub task_timeout: Duration,
    /// Delay before each retry.
    pub retry_backoff: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            task_timeout: MAX_TASK_DURATION,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

/// Runs the task queue across a bounded worker pool.
pub struct TaskExecutor {
    host: Arc<dyn Host>,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(host: Arc<dyn Host>, config: ExecutorConfig) -> Self {
        Self { host, config }
    }

    /// Drain the queue. The returned list preserves enqueue order; each task
    /// carries its own terminal state.
    pub async fn execute(&self, queue: TaskQueue) -> Vec<Task> {
        let total = queue.len();
        if total == 0 {
            return Vec::new();
        }
        info!(tasks = total, workers = self.config.workers, "executing task queue");

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut join_set: JoinSet<(usize, Task)> = JoinSet::new();
        let mut slots: Vec<Option<Task>> = std::iter::repeat_with(|| None).take(total).collect();

        for (index, task) in queue.into_iter().enumerate() {
            // Dispatch in queue order: wait for a free slot before admitting
            // the next task.
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("semaphore never closes");

            let host = Arc::clone(&self.host);
            let config = self.config.clone();
            join_set.spawn(async move {
                let finished = run_task(host.as_ref(), &config, task).await;
                drop(permit);
                (index, finished)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, task)) => slots[index] = Some(task),
                Err(err) => warn!(error = %err, "task worker panicked"),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// One task's full lifecycle: attempts, backoff, log capture, duration.
async fn run_task(host: &dyn Host, config: &ExecutorConfig, mut task: Task) -> Task {
    let started = Instant::now();
    let argv = split_command(&task.command);
    let mut retries_left = task.retries;

    loop {
        task.attempts += 1;
        info!(task = %task, attempt = task.attempts, "running");

        let failure = match host
            .run_combined(&argv, Some(Path::new(&task.path)), config.task_timeout)
            .await
        {
            Ok(capture) => {
                task.logs.push_str(&capture.output);
                if capture.success {
                    task.error = None;
                    break;
                }
                format!("exit code {}", capture.exit_code)
            }
            Err(err) => err.to_string(),
        };

        if retries_left == 0 {
            task.error = Some(failure);
            break;
        }
        retries_left -= 1;
        warn!(task = %task, error = %failure, "attempt failed, retrying");
        tokio::time::sleep(config.retry_backoff).await;
    }

    task.duration = started.elapsed();
    task
}
