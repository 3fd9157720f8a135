//! Rolling-window latency statistics for LLM calls.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

struct Sample {
    taken_at: Instant,
    duration_ms: u64,
}

/// Point-in-time aggregate of recent call latencies.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub count: usize,
    pub min_ms: u64,
    pub max_ms: u64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

/// Tracks LLM call latencies within a rolling window.
///
/// Both `record` and `snapshot` prune expired samples in place; one mutex
/// serialises all access.
pub struct LlmStats {
    samples: Mutex<Vec<Sample>>,
    max_age: Duration,
}

impl LlmStats {
    pub fn new(max_age: Duration) -> Self {
        let max_age = if max_age.is_zero() {
            Duration::from_secs(3600)
        } else {
            max_age
        };
        Self {
            samples: Mutex::new(Vec::with_capacity(256)),
            max_age,
        }
    }

    /// Records one call duration.
    pub fn record(&self, duration: Duration) {
        let now = Instant::now();
        let mut samples = self.samples.lock();
        Self::prune(&mut samples, now, self.max_age);
        samples.push(Sample {
            taken_at: now,
            duration_ms: duration.as_millis() as u64,
        });
    }

    /// Prunes expired samples and aggregates the rest.
    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let mut samples = self.samples.lock();
        Self::prune(&mut samples, now, self.max_age);
        if samples.is_empty() {
            return StatsSnapshot::default();
        }

        let mut values: Vec<u64> = samples.iter().map(|s| s.duration_ms).collect();
        values.sort_unstable();
        let sum: u64 = values.iter().sum();

        StatsSnapshot {
            count: values.len(),
            min_ms: values[0],
            max_ms: values[values.len() - 1],
            avg_ms: sum as f64 / values.len() as f64,
            p50_ms: percentile(&values, 50.0),
            p95_ms: percentile(&values, 95.0),
            p99_ms: percentile(&values, 99.0),
        }
    }

    fn prune(samples: &mut Vec<Sample>, now: Instant, max_age: Duration) {
        samples.retain(|s| now.duration_since(s.taken_at) <= max_age);
    }
}

/// Linear-interpolated percentile over sorted values.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if pct <= 0.0 {
        return sorted[0] as f64;
    }
    if pct >= 100.0 {
        return sorted[sorted.len() - 1] as f64;
    }

    let index = (sorted.len() - 1) as f64 * pct / 100.0;
    let lower = index.floor() as usize;
    let upper = lower + 1;
    if upper >= sorted.len() {
        return sorted[lower] as f64;
    }
    let weight = index - lower as f64;
    let lo = sorted[lower] as f64;
    let hi = sorted[upper] as f64;
    lo + (hi - lo) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let stats = LlmStats::new(Duration::from_secs(60));
        let snap = stats.snapshot();
        assert_eq!(snap.count, 0);
        assert_eq!(snap.min_ms, 0);
        assert_eq!(snap.p99_ms, 0.0);
    }

    #[test]
    fn test_single_sample() {
        let stats = LlmStats::new(Duration::from_secs(60));
        stats.record(Duration::from_millis(120));
        let snap = stats.snapshot();
        assert_eq!(snap.count, 1);
        assert_eq!(snap.min_ms, 120);
        assert_eq!(snap.max_ms, 120);
        assert_eq!(snap.avg_ms, 120.0);
        assert_eq!(snap.p50_ms, 120.0);
        assert_eq!(snap.p99_ms, 120.0);
    }

    #[test]
    fn test_percentile_interpolation() {
        let stats = LlmStats::new(Duration::from_secs(60));
        for ms in [10u64, 20, 30, 40] {
            stats.record(Duration::from_millis(ms));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.count, 4);
        assert_eq!(snap.min_ms, 10);
        assert_eq!(snap.max_ms, 40);
        assert_eq!(snap.avg_ms, 25.0);
        // index = 3 * 0.5 = 1.5 -> 20 + (30 - 20) * 0.5
        assert_eq!(snap.p50_ms, 25.0);
        // index = 3 * 0.95 = 2.85 -> 30 + 10 * 0.85
        assert!((snap.p95_ms - 38.5).abs() < 1e-9);
    }

    #[test]
    fn test_window_expiry() {
        let stats = LlmStats::new(Duration::from_millis(50));
        stats.record(Duration::from_millis(5));
        assert_eq!(stats.snapshot().count, 1);

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(stats.snapshot().count, 0);
    }

    #[test]
    fn test_percentile_bounds() {
        let values = vec![1u64, 2, 3];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, -5.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 3.0);
        assert_eq!(percentile(&values, 150.0), 3.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
