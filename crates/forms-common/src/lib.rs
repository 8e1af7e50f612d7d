//! OpenSASE Forms Common - shared primitives for the forms compiler
//!
//! This crate provides the small, lock-free building blocks that the schema
//! compiler and its tooling share:
//! - Wall-clock timestamps for cache bookkeeping
//! - Atomic counters for hit/miss accounting
//! - Latency histograms for compile and validation timings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod metrics;

pub use metrics::{HistogramSnapshot, LatencyHistogram};

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Nanosecond wall-clock timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Get current timestamp (nanoseconds since epoch)
    #[inline(always)]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Get nanoseconds value
    #[inline(always)]
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get milliseconds value
    #[inline(always)]
    pub fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Duration since this timestamp in microseconds.
    ///
    /// Saturates at zero if the clock went backwards.
    #[inline(always)]
    pub fn elapsed_micros(&self) -> u64 {
        Self::now().0.saturating_sub(self.0) / 1000
    }
}

/// Counter for lock-free metrics
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create new counter
    pub const fn new(value: u64) -> Self {
        Self(AtomicU64::new(value))
    }

    /// Increment and return previous value
    #[inline(always)]
    pub fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Add value and return previous
    #[inline(always)]
    pub fn add(&self, val: u64) -> u64 {
        self.0.fetch_add(val, Ordering::Relaxed)
    }

    /// Get current value
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Overwrite the current value
    #[inline(always)]
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed)
    }

    /// Reset to zero
    pub fn reset(&self) {
        self.set(0)
    }
}

/// Ratio of `hits` to `total`, 0.0 when nothing was recorded
#[inline]
pub fn ratio(hits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_micros(100));
        let t2 = Timestamp::now();

        assert!(t2 > t1);
        assert!(t2.as_nanos() - t1.as_nanos() >= 100_000);
    }

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new(0);
        assert_eq!(counter.inc(), 0);
        assert_eq!(counter.inc(), 1);
        assert_eq!(counter.add(3), 2);
        assert_eq!(counter.get(), 5);

        counter.reset();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }
}
