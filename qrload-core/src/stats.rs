use crate::{Outcome, P95, P99};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Latency distribution of a non-empty sample, in milliseconds.
///
/// Percentiles use the nearest-rank method without interpolation: the sample is sorted ascending
/// and `pN` is the element at index `floor(N/100 * len)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencySummary {
    /// Returns `None` for an empty sample rather than a summary full of NaNs.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: statistical::mean(&sorted),
            median: statistical::median(&sorted),
            p95: nearest_rank(&sorted, P95)?,
            p99: nearest_rank(&sorted, P99)?,
        })
    }
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:.2}ms, mean={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
            self.min, self.mean, self.median, self.p95, self.p99, self.max,
        )
    }
}

/// Nearest-rank quantile over an ascending slice; `None` when it is empty.
pub fn nearest_rank(sorted: &[f64], quantile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let idx = (quantile * sorted.len() as f64).floor() as usize;
    sorted.get(idx.min(last)).copied()
}

/// Aggregates over a set of [`Outcome`]s.
///
/// Always recomputable from the outcomes it was built from. Latency figures only consider
/// successful requests; every latency field is `None` when there are none.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// Percent of all requests.
    pub success_rate: f64,
    /// Percent of successful requests.
    pub cache_hit_rate: f64,
    pub latency: Option<LatencySummary>,
    /// Successful requests served without the cache.
    pub cold: Option<LatencySummary>,
    /// Successful requests served from the cache.
    pub warm: Option<LatencySummary>,
    /// `mean(cold) / mean(warm)`, when both are present.
    pub speedup: Option<f64>,
    pub throughput_rps: Option<f64>,
    #[serde_as(as = "Option<DurationMilliSecondsWithFrac<f64>>")]
    pub elapsed: Option<Duration>,
    pub bytes: u64,
    /// Failure cause to number of occurrences.
    pub errors: BTreeMap<String, usize>,
}

impl AggregateStats {
    /// Reduce outcomes into aggregates.
    ///
    /// `elapsed` is the wall-clock span the outcomes were produced in; throughput is left empty
    /// when it is missing or zero.
    pub fn reduce<'a, I>(outcomes: I, elapsed: Option<Duration>) -> Self
    where
        I: IntoIterator<Item = &'a Outcome>,
    {
        let mut total = 0;
        let mut bytes = 0;
        let mut all = vec![];
        let mut cold = vec![];
        let mut warm = vec![];
        let mut errors = BTreeMap::new();

        for outcome in outcomes {
            total += 1;
            if outcome.success {
                all.push(outcome.latency_ms);
                bytes += outcome.response_size_bytes;
                if outcome.cached {
                    warm.push(outcome.latency_ms);
                } else {
                    cold.push(outcome.latency_ms);
                }
            } else if let Some(cause) = outcome.error_cause() {
                *errors.entry(cause.to_string()).or_insert(0) += 1;
            }
        }

        let successful = all.len();
        let cache_hits = warm.len();
        let cold = LatencySummary::from_samples(&cold);
        let warm = LatencySummary::from_samples(&warm);

        let speedup = match (&cold, &warm) {
            (Some(cold), Some(warm)) if warm.mean > 0. => Some(cold.mean / warm.mean),
            _ => None,
        };

        let throughput_rps = elapsed
            .filter(|elapsed| !elapsed.is_zero())
            .map(|elapsed| successful as f64 / elapsed.as_secs_f64());

        Self {
            total,
            successful,
            failed: total - successful,
            cache_hits,
            success_rate: percent(successful, total),
            cache_hit_rate: percent(cache_hits, successful),
            latency: LatencySummary::from_samples(&all),
            cold,
            warm,
            speedup,
            throughput_rps,
            elapsed,
            bytes,
            errors,
        }
    }

    pub fn empty() -> Self {
        Self::reduce(std::iter::empty(), None)
    }

    /// Failure causes, most frequent first.
    pub fn top_errors(&self) -> Vec<(&str, usize)> {
        let mut errors: Vec<_> = self
            .errors
            .iter()
            .map(|(cause, count)| (cause.as_str(), *count))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        errors
    }
}

impl fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ok ({:.1}%), {:.1}% cached",
            self.successful, self.total, self.success_rate, self.cache_hit_rate
        )?;
        if let Some(latency) = &self.latency {
            write!(f, ", mean={:.2}ms, p95={:.2}ms", latency.mean, latency.p95)?;
        }
        if let Some(rps) = self.throughput_rps {
            write!(f, ", {rps:.1} req/s")?;
        }
        Ok(())
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.
    } else {
        part as f64 / whole as f64 * 100.
    }
}
