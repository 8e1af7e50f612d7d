//! Compile and validation performance bookkeeping

use forms_common::{ratio, AtomicCounter, HistogramSnapshot, LatencyHistogram};
use serde::Serialize;
use std::time::Duration;

/// Accumulating timing and cache-efficiency counters.
///
/// Every counter is atomic so the monitor can be shared across threads
/// behind an `Arc`. Counters only grow until [`reset_metrics`](Self::reset_metrics).
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    compilation: LatencyHistogram,
    validation: LatencyHistogram,
    cache_lookups: AtomicCounter,
    cache_hits: AtomicCounter,
    /// Gauge, not a counter: last reported cache footprint
    memory_usage: AtomicCounter,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_compilation(&self, elapsed: Duration) {
        self.compilation.record(elapsed);
    }

    pub fn record_validation(&self, elapsed: Duration) {
        self.validation.record(elapsed);
    }

    pub fn record_cache_access(&self, hit: bool) {
        self.cache_lookups.inc();
        if hit {
            self.cache_hits.inc();
        }
    }

    pub fn record_memory_usage(&self, bytes: u64) {
        self.memory_usage.set(bytes);
    }

    pub fn get_metrics(&self) -> PerformanceSnapshot {
        let compilation = self.compilation.snapshot();
        let validation = self.validation.snapshot();
        PerformanceSnapshot {
            compilation_time_ms: micros_to_ms(compilation.sum_us),
            validation_time_ms: micros_to_ms(validation.sum_us),
            total_compilations: compilation.count,
            total_validations: validation.count,
            cache_hit_rate: ratio(self.cache_hits.get(), self.cache_lookups.get()),
            memory_usage: self.memory_usage.get(),
            compilation,
            validation,
        }
    }

    /// Zero timings and hit counters. The memory gauge keeps tracking the live cache.
    pub fn reset_metrics(&self) {
        self.compilation.reset();
        self.validation.reset();
        self.cache_lookups.reset();
        self.cache_hits.reset();
    }
}

/// Point-in-time view of [`PerformanceMonitor`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    /// Total time spent compiling, including cache hits
    pub compilation_time_ms: f64,
    pub validation_time_ms: f64,
    pub total_compilations: u64,
    pub total_validations: u64,
    pub cache_hit_rate: f64,
    /// Estimated bytes held by the compilation cache
    pub memory_usage: u64,
    pub compilation: HistogramSnapshot,
    pub validation: HistogramSnapshot,
}

fn micros_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}
