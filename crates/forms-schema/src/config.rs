//! Compiler configuration

use crate::cache::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for [`crate::SchemaCompiler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Maximum number of cached schemas
    pub cache_capacity: usize,
    /// Iterations used when a benchmark run does not specify any
    pub benchmark_iterations: usize,
    /// Compilations slower than this are logged as warnings
    pub slow_compile_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            benchmark_iterations: 100,
            slow_compile_ms: 50,
        }
    }
}

impl CompilerConfig {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn slow_compile_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_compile_ms)
    }
}
