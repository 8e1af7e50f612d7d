//! Compiler facade tying validation, caching and metrics together

use crate::cache::{CacheStats, CompilationCache};
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::metadata::{FieldType, FormField, FormMetadata};
use crate::monitor::{PerformanceMonitor, PerformanceSnapshot};
use crate::schema::{CompiledSchema, ValidationResult, Values};
use crate::visibility;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metadata schema compiler
///
/// # Pipeline
///
/// ```text
/// FormMetadata ──► content hash ──► LRU cache ──hit──► Arc<CompiledSchema>
///                                       │
///                                      miss
///                                       ▼
///                        MetadataValidator ──► SchemaBuilder ──► insert
/// ```
///
/// Visibility is evaluated directly against the metadata and never cached.
pub struct SchemaCompiler {
    config: CompilerConfig,
    cache: CompilationCache,
    monitor: Arc<PerformanceMonitor>,
}

impl SchemaCompiler {
    /// Create compiler with its own monitor
    pub fn new(config: CompilerConfig) -> Self {
        Self::with_monitor(config, Arc::new(PerformanceMonitor::new()))
    }

    /// Create compiler reporting into a shared monitor
    pub fn with_monitor(config: CompilerConfig, monitor: Arc<PerformanceMonitor>) -> Self {
        Self {
            cache: CompilationCache::new(config.cache_capacity),
            config,
            monitor,
        }
    }

    /// Validate and compile metadata, reusing a cached schema when the content matches
    pub fn compile(&self, metadata: &FormMetadata) -> Result<Arc<CompiledSchema>> {
        let start = Instant::now();
        let lookup = match self.cache.get_or_compile(metadata) {
            Ok(lookup) => lookup,
            Err(errors) => {
                tracing::warn!(
                    version = %metadata.version,
                    errors = errors.len(),
                    "Rejected form metadata: {}",
                    errors
                );
                return Err(errors);
            }
        };
        let elapsed = start.elapsed();

        self.monitor.record_compilation(elapsed);
        self.monitor.record_cache_access(lookup.is_hit());

        if !lookup.is_hit() {
            self.monitor.record_memory_usage(self.cache.memory_usage());
            tracing::info!(
                version = %metadata.version,
                fields = metadata.fields.len(),
                time_us = elapsed.as_micros() as u64,
                "Compiled form schema"
            );
        }
        if elapsed > self.config.slow_compile_threshold() {
            tracing::warn!(
                version = %metadata.version,
                time_ms = elapsed.as_millis() as u64,
                "Slow schema compilation"
            );
        }

        Ok(lookup.into_schema())
    }

    /// Validate a submission, recording its duration
    pub fn validate(&self, schema: &CompiledSchema, data: &Values) -> ValidationResult {
        self.timed_validation(|| schema.validate(data))
    }

    /// Validate only the fields visible under this submission
    pub fn validate_visible(&self, schema: &CompiledSchema, data: &Values) -> ValidationResult {
        self.timed_validation(|| schema.validate_visible(data))
    }

    fn timed_validation(&self, f: impl FnOnce() -> ValidationResult) -> ValidationResult {
        let start = Instant::now();
        let result = f();
        self.monitor.record_validation(start.elapsed());
        result
    }

    /// Field visibility keyed by field id
    pub fn compute_visibility(&self, fields: &[FormField], values: &Values) -> HashMap<String, bool> {
        visibility::compute_visibility(fields, values)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.monitor.record_memory_usage(0);
        tracing::info!("Schema cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &CompilationCache {
        &self.cache
    }

    pub fn metrics(&self) -> PerformanceSnapshot {
        self.monitor.get_metrics()
    }

    pub fn reset_metrics(&self) {
        self.monitor.reset_metrics();
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Repeatedly compile and validate a representative payload.
    ///
    /// Goes through the cache like any caller would, so after the first
    /// iteration compilations are hits. Samples accumulate in the shared
    /// monitor.
    pub fn run_benchmark(&self, metadata: &FormMetadata, iterations: usize) -> Result<BenchmarkReport> {
        let before = self.cache.memory_usage();
        if iterations == 0 {
            return Ok(BenchmarkReport {
                iterations,
                memory: MemoryReport { before, after: before },
                ..Default::default()
            });
        }

        let payload = representative_payload(metadata);
        let mut compile_samples = Vec::with_capacity(iterations);
        let mut validate_samples = Vec::with_capacity(iterations);
        let mut payload_rejections = 0;

        for _ in 0..iterations {
            let start = Instant::now();
            let schema = self.compile(metadata)?;
            compile_samples.push(start.elapsed());

            let start = Instant::now();
            let result = self.validate(&schema, &payload);
            validate_samples.push(start.elapsed());

            if let ValidationResult::Invalid(issues) = &result {
                if payload_rejections == 0 {
                    tracing::debug!(
                        version = %metadata.version,
                        issues = ?issues,
                        "Benchmark payload rejected, validation timings cover the error path"
                    );
                }
                payload_rejections += 1;
            }
        }

        let report = BenchmarkReport {
            iterations,
            payload_rejections,
            compilation: TimingStats::from_samples(&compile_samples),
            validation: TimingStats::from_samples(&validate_samples),
            memory: MemoryReport { before, after: self.cache.memory_usage() },
        };

        tracing::info!(
            iterations,
            compile_avg_ms = report.compilation.avg,
            validate_avg_ms = report.validation.avg,
            "Benchmark complete"
        );

        Ok(report)
    }
}

impl Default for SchemaCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimingStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl TimingStats {
    fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        Self {
            avg: ms.iter().sum::<f64>() / ms.len() as f64,
            min: ms.iter().copied().fold(f64::INFINITY, f64::min),
            max: ms.iter().copied().fold(0.0, f64::max),
        }
    }
}

/// Cache footprint in bytes around a benchmark run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryReport {
    pub before: u64,
    pub after: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub iterations: usize,
    /// Iterations whose sample payload failed validation
    pub payload_rejections: usize,
    pub compilation: TimingStats,
    pub validation: TimingStats,
    pub memory: MemoryReport,
}

/// A submission that should pass validation: defaults first, otherwise a
/// type-appropriate sample
pub fn representative_payload(metadata: &FormMetadata) -> Values {
    metadata
        .fields
        .iter()
        .filter_map(|field| sample_value(field).map(|v| (field.name.clone(), v)))
        .collect()
}

fn sample_value(field: &FormField) -> Option<Value> {
    if let Some(default) = &field.default_value {
        return Some(default.clone());
    }
    let first_option = field.options().first().map(|o| o.value.clone());
    match &field.field_type {
        FieldType::Text | FieldType::Textarea => Some(json!("sample")),
        FieldType::Number => Some(json!(42)),
        FieldType::Date => Some(json!("2024-01-01")),
        FieldType::Checkbox | FieldType::Select if field.is_multi_value() => {
            Some(Value::Array(first_option.into_iter().collect()))
        }
        FieldType::Checkbox => Some(json!(true)),
        FieldType::Select => first_option,
        FieldType::Unknown(_) => None,
    }
}
