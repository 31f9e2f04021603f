//! Batch-barrier scheduling.
//!
//! A scheduled run is split into batches of at most `concurrency` requests. Every request of a
//! batch is spawned at once, and the next batch is only started once every request of the
//! current one has produced an [`Outcome`]. Peak in-flight concurrency is therefore exactly
//! bounded, and an inter-batch delay is a true pause in traffic.
use crate::executor::Execute;
use crate::scenario::PayloadSource;
use futures_util::future::join_all;
use qrload_core::{ConfigError, FailureKind, Outcome};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Partition of `total` request indices into consecutive batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    concurrency: NonZeroUsize,
}

impl BatchPlan {
    pub fn new(total: usize, concurrency: usize) -> Result<Self, ConfigError> {
        let concurrency =
            NonZeroUsize::new(concurrency).ok_or(ConfigError::InvalidConcurrency(concurrency))?;
        Ok(Self { total, concurrency })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Number of batches, `ceil(total / concurrency)`.
    pub fn len(&self) -> usize {
        self.total.div_ceil(self.concurrency.get())
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Index ranges of each batch, in order. Only the last one may be short.
    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> {
        let total = self.total;
        let concurrency = self.concurrency.get();
        (0..total)
            .step_by(concurrency)
            .map(move |start| start..(start + concurrency).min(total))
    }
}

/// Outcomes of one batch, in request-index order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub index: usize,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledRun {
    pub batches: Vec<BatchResult>,
    /// From the first request being issued until the last batch completed.
    pub elapsed: Duration,
}

impl ScheduledRun {
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.batches.iter().flat_map(|batch| batch.outcomes.iter())
    }

    pub fn into_outcomes(self) -> Vec<Outcome> {
        self.batches
            .into_iter()
            .flat_map(|batch| batch.outcomes)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(|batch| batch.outcomes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ConcurrencyScheduler {
    plan: BatchPlan,
    delay: Option<Duration>,
}

impl ConcurrencyScheduler {
    pub fn new(plan: BatchPlan) -> Self {
        Self { plan, delay: None }
    }

    /// Pause between consecutive batches, e.g. to stay under a rate limit.
    pub fn delay(mut self, delay: Option<Duration>) -> Self {
        self.delay = delay.filter(|delay| !delay.is_zero());
        self
    }

    pub fn plan(&self) -> &BatchPlan {
        &self.plan
    }

    pub async fn run<E>(&self, executor: &Arc<E>, source: &dyn PayloadSource) -> ScheduledRun
    where
        E: Execute + 'static,
    {
        let batch_count = self.plan.len();
        let mut batches = Vec::with_capacity(batch_count);
        let start = Instant::now();

        for (index, range) in self.plan.batches().enumerate() {
            if index > 0 {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
            }

            let size = range.len();
            let outcomes = run_batch(executor, source, range).await;
            debug_assert_eq!(outcomes.len(), size);

            let failed = outcomes.iter().filter(|o| !o.success).count();
            debug!(
                "Batch {}/{} complete: {} requests, {} failed",
                index + 1,
                batch_count,
                size,
                failed
            );

            batches.push(BatchResult { index, outcomes });
        }

        ScheduledRun {
            batches,
            elapsed: start.elapsed(),
        }
    }
}

async fn run_batch<E>(
    executor: &Arc<E>,
    source: &dyn PayloadSource,
    range: Range<usize>,
) -> Vec<Outcome>
where
    E: Execute + 'static,
{
    let handles: Vec<_> = range
        .map(|idx| {
            let request = source.request(idx);
            let executor = executor.clone();
            tokio::spawn(async move { executor.execute(request).await }.in_current_span())
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|res| {
            res.unwrap_or_else(|err| {
                error!("Request task failed: {err}");
                Outcome::failure(
                    Duration::ZERO,
                    0,
                    FailureKind::Aborted,
                    format!("Request task failed: {err}"),
                )
            })
        })
        .collect()
}
