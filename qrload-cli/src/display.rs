//! Console rendering of a [`RunReport`].
use qrload::core::{AggregateStats, CacheSnapshot, ProbeSnapshot, RunReport, ScenarioReport};
use std::fmt;

/// Full results of one scenario.
pub struct ScenarioBlock<'a>(pub &'a ScenarioReport);

/// One line per scenario plus the overall row.
pub struct SummaryTable<'a>(pub &'a RunReport);

/// Failure causes, most frequent first.
pub struct ErrorBreakdown<'a>(pub &'a AggregateStats);

pub struct CacheBlock<'a>(pub &'a CacheSnapshot);

pub struct ProbeBlock<'a>(pub &'a str, pub &'a ProbeSnapshot);

impl fmt::Display for ScenarioBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ScenarioReport {
            config,
            stats,
            cache_after,
            ..
        } = self.0;

        writeln!(f, "=== {} ===", config)?;
        write_stats(f, stats)?;
        if let Some(cache) = cache_after {
            write!(f, "{}", CacheBlock(cache))?;
        }
        Ok(())
    }
}

fn write_stats(f: &mut fmt::Formatter<'_>, stats: &AggregateStats) -> fmt::Result {
    writeln!(f, "Total requests:      {}", stats.total)?;
    writeln!(
        f,
        "Successful:          {} ({:.1}%)",
        stats.successful, stats.success_rate
    )?;
    writeln!(f, "Failed:              {}", stats.failed)?;
    writeln!(
        f,
        "Cache hits:          {} ({:.1}%)",
        stats.cache_hits, stats.cache_hit_rate
    )?;

    match &stats.latency {
        Some(latency) => {
            writeln!(f, "Response times (ms):")?;
            writeln!(f, "  Average:           {:.2}", latency.mean)?;
            writeln!(f, "  Median:            {:.2}", latency.median)?;
            writeln!(f, "  Min:               {:.2}", latency.min)?;
            writeln!(f, "  Max:               {:.2}", latency.max)?;
            writeln!(f, "  95th percentile:   {:.2}", latency.p95)?;
            writeln!(f, "  99th percentile:   {:.2}", latency.p99)?;
        }
        None => writeln!(f, "No successful requests")?,
    }

    if let (Some(cold), Some(warm)) = (&stats.cold, &stats.warm) {
        writeln!(f, "Cold cache:          mean {:.2}ms, median {:.2}ms", cold.mean, cold.median)?;
        writeln!(f, "Warm cache:          mean {:.2}ms, median {:.2}ms", warm.mean, warm.median)?;
    }
    if let Some(speedup) = stats.speedup {
        writeln!(f, "Speedup:             {speedup:.2}x")?;
    }

    match stats.throughput_rps {
        Some(rps) => writeln!(f, "Throughput:          {rps:.2} req/s")?,
        None => writeln!(f, "Throughput:          n/a")?,
    }
    writeln!(
        f,
        "Data received:       {:.2} MB",
        stats.bytes as f64 / (1024. * 1024.)
    )?;

    if !stats.errors.is_empty() {
        write!(f, "{}", ErrorBreakdown(stats))?;
    }
    Ok(())
}

impl fmt::Display for ErrorBreakdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Errors:")?;
        for (cause, count) in self.0.top_errors() {
            writeln!(f, "  {count:>6}  {cause}")?;
        }
        Ok(())
    }
}

impl fmt::Display for CacheBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.0;
        writeln!(f, "Cache statistics:")?;
        if let Some(size) = cache.size {
            writeln!(f, "  Total keys:        {size}")?;
        }
        if let (Some(hits), Some(misses)) = (cache.hits, cache.misses) {
            writeln!(f, "  Hits / misses:     {hits} / {misses}")?;
        }
        if let Some(memory) = cache.memory_mb {
            writeln!(f, "  Memory usage:      {memory:.2} MB")?;
        }
        if let Some(rate) = cache.hit_rate {
            writeln!(f, "  Hit rate:          {rate:.1}%")?;
        }
        if let Some(mode) = &cache.mode {
            writeln!(f, "  Mode:              {mode}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProbeBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ProbeBlock(label, snapshot) = self;
        if snapshot.is_empty() {
            return writeln!(f, "Service ({label}): unavailable");
        }
        writeln!(
            f,
            "Service ({label}): {} {}",
            snapshot.health.as_deref().unwrap_or("unknown"),
            snapshot.version.as_deref().unwrap_or(""),
        )?;
        if let Some(cache) = &snapshot.cache {
            write!(f, "{}", CacheBlock(cache))?;
        }
        Ok(())
    }
}

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "=== Summary ===")?;
        writeln!(
            f,
            "{:<24} {:>9} {:>9} {:>11} {:>11} {:>12}",
            "Scenario", "Success", "Cached", "Mean (ms)", "P95 (ms)", "Req/s"
        )?;
        writeln!(f, "{}", "-".repeat(81))?;

        for scenario in &report.scenarios {
            row(f, &scenario.config.name, &scenario.stats)?;
        }
        writeln!(f, "{}", "-".repeat(81))?;
        row(f, "overall", &report.overall)?;

        if let Some(warmup) = &report.warmup {
            writeln!(f, "(warm-up: {warmup})")?;
        }
        Ok(())
    }
}

fn row(f: &mut fmt::Formatter<'_>, name: &str, stats: &AggregateStats) -> fmt::Result {
    let ms = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
    writeln!(
        f,
        "{:<24} {:>8.1}% {:>8.1}% {:>11} {:>11} {:>12}",
        name,
        stats.success_rate,
        stats.cache_hit_rate,
        ms(stats.latency.map(|l| l.mean)),
        ms(stats.latency.map(|l| l.p95)),
        ms(stats.throughput_rps),
    )
}
