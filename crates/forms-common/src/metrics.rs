//! Lock-free latency tracking for compile and validation calls

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const BUCKETS: usize = 8;

/// Upper bound (inclusive, microseconds) of each bucket; the last is open-ended
const BUCKET_LIMITS_US: [u64; BUCKETS] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 100_000];

/// Lock-free histogram for latency tracking
#[derive(Debug)]
pub struct LatencyHistogram {
    /// Buckets: 0-10μs, 10-50μs, 50-100μs, 100-500μs, 500μs-1ms, 1-5ms, 5-10ms, >10ms
    buckets: [AtomicU64; BUCKETS],
    count: AtomicU64,
    sum_us: AtomicU64,
    min_us: AtomicU64,
    max_us: AtomicU64,
}

impl LatencyHistogram {
    /// Create new histogram
    pub const fn new() -> Self {
        Self {
            buckets: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
            count: AtomicU64::new(0),
            sum_us: AtomicU64::new(0),
            min_us: AtomicU64::new(u64::MAX),
            max_us: AtomicU64::new(0),
        }
    }

    /// Record a duration
    #[inline]
    pub fn record(&self, elapsed: Duration) {
        self.record_micros(elapsed.as_micros().min(u64::MAX as u128) as u64);
    }

    /// Record a latency value in microseconds
    #[inline(always)]
    pub fn record_micros(&self, latency_us: u64) {
        let bucket = BUCKET_LIMITS_US
            .iter()
            .position(|limit| latency_us <= *limit)
            .unwrap_or(BUCKETS - 1);

        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Number of recorded samples
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all samples in microseconds
    pub fn sum_micros(&self) -> u64 {
        self.sum_us.load(Ordering::Relaxed)
    }

    /// Get average latency in microseconds
    pub fn average(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum_micros() as f64 / count as f64
    }

    /// Get percentile (approximate, bucket upper bound)
    pub fn percentile(&self, p: f64) -> u64 {
        let count = self.count();
        if count == 0 {
            return 0;
        }
        let target = ((count as f64) * p).ceil() as u64;
        let mut cumulative = 0u64;

        for (i, bucket) in self.buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            if cumulative >= target {
                return BUCKET_LIMITS_US[i];
            }
        }

        BUCKET_LIMITS_US[BUCKETS - 1]
    }

    /// Get P99 latency
    pub fn p99(&self) -> u64 {
        self.percentile(0.99)
    }

    /// Zero every bucket and aggregate
    pub fn reset(&self) {
        for bucket in &self.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
        self.count.store(0, Ordering::Relaxed);
        self.sum_us.store(0, Ordering::Relaxed);
        self.min_us.store(u64::MAX, Ordering::Relaxed);
        self.max_us.store(0, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> HistogramSnapshot {
        let count = self.count();
        HistogramSnapshot {
            count,
            sum_us: self.sum_micros(),
            min_us: if count == 0 { 0 } else { self.min_us.load(Ordering::Relaxed) },
            max_us: self.max_us.load(Ordering::Relaxed),
            avg_us: self.average(),
            p50: self.percentile(0.50),
            p90: self.percentile(0.90),
            p99: self.percentile(0.99),
        }
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Histogram snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    /// Samples recorded
    pub count: u64,
    /// Sum of all samples, microseconds
    pub sum_us: u64,
    /// Smallest sample, 0 when empty
    pub min_us: u64,
    /// Largest sample
    pub max_us: u64,
    /// Mean sample, microseconds
    pub avg_us: f64,
    /// Median, as a bucket upper bound
    pub p50: u64,
    /// 90th percentile, as a bucket upper bound
    pub p90: u64,
    /// 99th percentile, as a bucket upper bound
    pub p99: u64,
}
