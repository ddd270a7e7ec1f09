//! Concurrent evaluation of many answers with caller-side retries.
//!
//! The evaluator itself never retries its judge call. This module is the
//! caller that does: a whole evaluation is re-run on transient judge
//! failures, with exponential backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::EvalError;
use crate::evaluator::Evaluator;
use crate::model::{EvaluationRequest, EvaluationResult};

/// Upper bound for the backoff between attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Configuration for batch evaluation.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum concurrent evaluations.
    pub parallelism: usize,
    /// Retries after the first attempt, on retryable errors only.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// One answer to grade, tagged with a caller-chosen id.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: String,
    pub request: EvaluationRequest,
}

/// What happened to one batch item.
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: String,
    /// Attempts made, including the first.
    pub attempts: u32,
    pub result: Result<EvaluationResult, EvalError>,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_attempt(&self, id: &str, attempt: u32);
    fn on_complete(&self, id: &str, result: &EvaluationResult);
    fn on_error(&self, id: &str, error: &EvalError);
    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_attempt(&self, _: &str, _: u32) {}
    fn on_complete(&self, _: &str, _: &EvaluationResult) {}
    fn on_error(&self, _: &str, _: &EvalError) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Evaluate one request, retrying transient failures.
///
/// Returns the number of attempts made alongside the final outcome.
pub async fn evaluate_with_retry(
    evaluator: &Evaluator,
    id: &str,
    request: &EvaluationRequest,
    config: &BatchConfig,
    progress: &dyn ProgressReporter,
) -> (u32, Result<EvaluationResult, EvalError>) {
    let mut retry_delay = config.retry_delay;
    let mut attempt = 1;
    loop {
        progress.on_attempt(id, attempt);
        match evaluator.evaluate(request).await {
            Ok(result) => return (attempt, Ok(result)),
            Err(e) if !e.is_retryable() || attempt > config.max_retries => {
                return (attempt, Err(e));
            }
            Err(e) => {
                // Use the judge's retry-after hint if it gave one
                if let Some(ms) = e.retry_after_ms() {
                    retry_delay = Duration::from_millis(ms);
                }
                tracing::warn!(
                    "evaluation {id} attempt {attempt} failed, retrying in {}ms: {e}",
                    retry_delay.as_millis()
                );
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Evaluate independent answers concurrently.
///
/// Outcomes are returned in input order. A failed item carries its error
/// and never a score.
pub async fn evaluate_batch(
    evaluator: &Evaluator,
    items: Vec<BatchItem>,
    config: &BatchConfig,
    progress: &dyn ProgressReporter,
) -> Vec<BatchOutcome> {
    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
    let total = items.len();

    let mut futures = FuturesUnordered::new();
    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        futures.push(async move {
            let (attempts, result) = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    evaluate_with_retry(evaluator, &item.id, &item.request, config, progress)
                        .await
                }
                Err(_) => (
                    0,
                    Err(EvalError::Judge(anyhow::anyhow!("semaphore closed"))),
                ),
            };
            (
                index,
                BatchOutcome {
                    id: item.id,
                    attempts,
                    result,
                },
            )
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    let mut completed = 0usize;
    let mut failed = 0usize;

    while let Some((index, outcome)) = futures.next().await {
        match &outcome.result {
            Ok(result) => {
                progress.on_complete(&outcome.id, result);
                completed += 1;
            }
            Err(e) => {
                tracing::error!("evaluation failed for {}: {e}", outcome.id);
                progress.on_error(&outcome.id, e);
                failed += 1;
            }
        }
        outcomes.push((index, outcome));
    }

    progress.on_batch_complete(total, completed, failed, start.elapsed());

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
