// ==========================================
// School Import - background job scheduling
// ==========================================
// Bounded worker pool over tokio: a semaphore caps concurrency, every
// attempt runs under a timeout, failed attempts are retried with a fixed
// backoff, and a unit whose attempt budget is exhausted gets exactly one
// terminal-failure callback.
// ==========================================

use crate::importer::error::{ImportError, ImportPipelineResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::warn;

// ==========================================
// JobSpec / JobUnit
// ==========================================

/// Retry policy for one unit of work.
#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    /// Total attempts (first run included). Treated as at least 1.
    pub attempts: u32,
    /// Per-attempt timeout; an elapsed attempt counts as a failed one.
    pub timeout: Duration,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

#[async_trait]
pub trait JobUnit: Send + Sync {
    /// Short label used in log lines.
    fn describe(&self) -> String;

    /// One processing attempt. Must be safe to re-run after a failure.
    async fn run(&self) -> ImportPipelineResult<()>;

    /// Invoked exactly once, after the last attempt has failed, with the
    /// error and wall-clock duration of that last attempt.
    async fn on_terminal_failure(&self, err: &ImportError, elapsed: Duration);
}

// ==========================================
// JobScheduler trait + tokio implementation
// ==========================================

#[async_trait]
pub trait JobScheduler: Send + Sync {
    async fn enqueue(&self, unit: Arc<dyn JobUnit>, spec: JobSpec);

    /// Wait for every enqueued unit to finish (success or terminal failure).
    async fn join(&self);
}

pub struct TokioJobScheduler {
    semaphore: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
}

impl TokioJobScheduler {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    async fn run_with_retries(unit: Arc<dyn JobUnit>, spec: JobSpec) {
        let attempts = spec.attempts.max(1);
        let mut last_failure: Option<(ImportError, Duration)> = None;

        for attempt in 1..=attempts {
            let attempt_started = Instant::now();
            let err = match tokio::time::timeout(spec.timeout, unit.run()).await {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(_) => ImportError::Timeout(spec.timeout),
            };
            warn!(
                job = %unit.describe(),
                attempt,
                attempts,
                error = %err,
                "job attempt failed"
            );
            last_failure = Some((err, attempt_started.elapsed()));
            if attempt < attempts {
                tokio::time::sleep(spec.backoff).await;
            }
        }

        if let Some((err, elapsed)) = last_failure {
            unit.on_terminal_failure(&err, elapsed).await;
        }
    }
}

#[async_trait]
impl JobScheduler for TokioJobScheduler {
    async fn enqueue(&self, unit: Arc<dyn JobUnit>, spec: JobSpec) {
        let semaphore = self.semaphore.clone();
        self.tasks.lock().await.spawn(async move {
            // The semaphore is never closed, so acquisition only fails on
            // shutdown races; the unit is simply skipped then.
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            Self::run_with_retries(unit, spec).await;
        });
    }

    async fn join(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }
}
