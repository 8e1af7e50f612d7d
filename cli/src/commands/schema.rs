//! Metadata commands: check, hash, bench, stats

use super::{compiler, load_metadata};
use crate::output::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use forms_schema::{CacheStats, CompilerConfig, MetadataError, MetadataValidator, PerformanceSnapshot};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;

#[derive(Serialize)]
struct CheckReport {
    valid: bool,
    version: String,
    fields: usize,
    hash: String,
    errors: Vec<String>,
    cycles: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct StatsReport {
    cache: CacheStats,
    metrics: PerformanceSnapshot,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl StatsReport {
    fn rows(&self) -> Vec<MetricRow> {
        let row = |metric, value: String| MetricRow { metric, value };
        vec![
            row("cache size", format!("{}/{}", self.cache.size, self.cache.max_size)),
            row("cache hits", self.cache.hits.to_string()),
            row("cache misses", self.cache.misses.to_string()),
            row("cache evictions", self.cache.evictions.to_string()),
            row("cache hit rate", format!("{:.1}%", self.cache.hit_rate * 100.0)),
            row("cache memory (bytes)", self.cache.memory_usage.to_string()),
            row("compilations", self.metrics.total_compilations.to_string()),
            row("compilation time (ms)", format!("{:.4}", self.metrics.compilation_time_ms)),
            row("compilation p99 (us)", self.metrics.compilation.p99.to_string()),
            row("validations", self.metrics.total_validations.to_string()),
            row("validation time (ms)", format!("{:.4}", self.metrics.validation_time_ms)),
        ]
    }
}

#[derive(Tabled)]
struct ProblemRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Problem")]
    problem: String,
}

#[derive(Tabled)]
struct TimingRow {
    #[tabled(rename = "Phase")]
    phase: &'static str,
    #[tabled(rename = "Avg (ms)")]
    avg: String,
    #[tabled(rename = "Min (ms)")]
    min: String,
    #[tabled(rename = "Max (ms)")]
    max: String,
}

fn kind(error: &MetadataError) -> &'static str {
    match error {
        MetadataError::DuplicateFieldId(_) => "duplicate id",
        MetadataError::UnknownFieldType { .. } => "unknown type",
        MetadataError::MissingOptions(_) => "missing options",
        MetadataError::DuplicateOptionValue { .. } => "duplicate option",
        MetadataError::DanglingCondition { .. } => "dangling condition",
        MetadataError::CircularReference(_) => "cycle",
    }
}

pub fn check(path: &Path, format: OutputFormat) -> Result<bool> {
    let metadata = load_metadata(path)?;
    let outcome = MetadataValidator::validate(&metadata);

    let mut report = CheckReport {
        valid: outcome.is_ok(),
        version: metadata.version.clone(),
        fields: metadata.fields.len(),
        hash: metadata.content_hash(),
        errors: Vec::new(),
        cycles: Vec::new(),
    };
    let mut rows = Vec::new();
    if let Err(errors) = &outcome {
        report.errors = errors.errors().iter().map(|e| e.to_string()).collect();
        report.cycles = errors.cycles().map(|c| c.cycle.clone()).collect();
        rows = errors
            .errors()
            .iter()
            .map(|e| ProblemRow { kind: kind(e), problem: e.to_string() })
            .collect();
    }

    if format.is_table() {
        if report.valid {
            println!(
                "{} version {} ({} fields)",
                "✓ valid".green(),
                report.version,
                report.fields
            );
        } else {
            println!("{} {} problem(s)", "✗ invalid".red(), rows.len());
            format.print_rows(&report, rows);
        }
    } else {
        format.print(&report);
    }

    Ok(report.valid)
}

pub fn hash(path: &Path) -> Result<bool> {
    let metadata = load_metadata(path)?;
    println!("{}", metadata.content_hash());
    Ok(true)
}

pub fn bench(
    path: &Path,
    iterations: Option<usize>,
    config: CompilerConfig,
    format: OutputFormat,
) -> Result<bool> {
    let metadata = load_metadata(path)?;
    let iterations = iterations.unwrap_or(config.benchmark_iterations);
    let compiler = compiler(config);

    let report = match compiler.run_benchmark(&metadata, iterations) {
        Ok(report) => report,
        Err(errors) => {
            eprintln!("{} {}", "✗ invalid metadata:".red(), errors);
            return Ok(false);
        }
    };

    if format.is_table() {
        let rows = vec![
            TimingRow {
                phase: "compile",
                avg: format!("{:.4}", report.compilation.avg),
                min: format!("{:.4}", report.compilation.min),
                max: format!("{:.4}", report.compilation.max),
            },
            TimingRow {
                phase: "validate",
                avg: format!("{:.4}", report.validation.avg),
                min: format!("{:.4}", report.validation.min),
                max: format!("{:.4}", report.validation.max),
            },
        ];
        println!("{} iterations", report.iterations);
        if report.payload_rejections > 0 {
            println!(
                "{} sample payload rejected in {} iterations; validation timings cover the error path",
                "!".yellow(),
                report.payload_rejections
            );
        }
        format.print_rows(&report, rows);
        println!(
            "cache memory: {} -> {} bytes, hit rate {:.1}%",
            report.memory.before,
            report.memory.after,
            compiler.metrics().cache_hit_rate * 100.0
        );
    } else {
        format.print(&report);
    }

    Ok(true)
}

/// Compile each file through one compiler and report cache and timing statistics
pub fn stats(paths: &[PathBuf], config: CompilerConfig, format: OutputFormat) -> Result<bool> {
    let compiler = compiler(config);
    let mut all_valid = true;

    for path in paths {
        let metadata = load_metadata(path)?;
        if let Err(errors) = compiler.compile(&metadata) {
            eprintln!("{} {}: {}", "✗ invalid metadata".red(), path.display(), errors);
            all_valid = false;
        }
    }

    let report = StatsReport { cache: compiler.cache_stats(), metrics: compiler.metrics() };
    let rows = report.rows();
    format.print_rows(&report, rows);

    Ok(all_valid)
}
