//! LRU cache of compiled schemas keyed by metadata content hash

use crate::builder::SchemaBuilder;
use crate::error::Result;
use crate::metadata::FormMetadata;
use crate::schema::CompiledSchema;
use crate::validator::MetadataValidator;
use forms_common::{ratio, AtomicCounter, Timestamp};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of cached schemas
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Cached compilation
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub schema: Arc<CompiledSchema>,
    pub created_at: Timestamp,
    pub last_accessed: Timestamp,
    pub hits: u64,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Arc<CompiledSchema>),
    Miss(Arc<CompiledSchema>),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn schema(&self) -> &Arc<CompiledSchema> {
        match self {
            Lookup::Hit(s) | Lookup::Miss(s) => s,
        }
    }

    pub fn into_schema(self) -> Arc<CompiledSchema> {
        match self {
            Lookup::Hit(s) | Lookup::Miss(s) => s,
        }
    }
}

/// Compilation cache with LRU eviction.
///
/// Lookups and inserts are serialized by one mutex; the validate-and-build
/// step on a miss runs outside it. Two callers missing on the same key may
/// both build, and the first insert wins.
pub struct CompilationCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    max_size: usize,
    hits: AtomicCounter,
    misses: AtomicCounter,
    evictions: AtomicCounter,
}

impl CompilationCache {
    /// Create cache with capacity (at least one entry)
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            max_size: capacity.get(),
            hits: AtomicCounter::new(0),
            misses: AtomicCounter::new(0),
            evictions: AtomicCounter::new(0),
        }
    }

    /// Return the cached schema for this metadata, validating and building it on a miss.
    ///
    /// Metadata that fails validation is never cached.
    pub fn get_or_compile(&self, metadata: &FormMetadata) -> Result<Lookup> {
        let key = metadata.content_hash();

        if let Some(schema) = self.touch(&key) {
            self.hits.inc();
            tracing::debug!(key = %short(&key), "Schema cache hit");
            return Ok(Lookup::Hit(schema));
        }

        self.misses.inc();
        tracing::debug!(key = %short(&key), "Schema cache miss");

        MetadataValidator::validate(metadata)?;
        let built = Arc::new(SchemaBuilder::build_with_hash(metadata, key.clone())?);

        Ok(Lookup::Miss(self.insert(key, built)))
    }

    /// Look up by content hash without compiling, refreshing recency on hit
    pub fn get(&self, key: &str) -> Option<Arc<CompiledSchema>> {
        self.touch(key)
    }

    fn touch(&self, key: &str) -> Option<Arc<CompiledSchema>> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;
        entry.last_accessed = Timestamp::now();
        entry.hits += 1;
        Some(entry.schema.clone())
    }

    fn insert(&self, key: String, schema: Arc<CompiledSchema>) -> Arc<CompiledSchema> {
        let mut entries = self.entries.lock();

        // Lost a race with another builder of the same key
        if let Some(existing) = entries.get_mut(&key) {
            existing.last_accessed = Timestamp::now();
            return existing.schema.clone();
        }

        let now = Timestamp::now();
        let entry = CacheEntry {
            key: key.clone(),
            schema: schema.clone(),
            created_at: now,
            last_accessed: now,
            hits: 0,
        };

        if let Some((evicted, _)) = entries.push(key, entry) {
            self.evictions.inc();
            tracing::debug!(key = %short(&evicted), "Evicted least recently used schema");
        }
        schema
    }

    /// Whether a key is cached, without touching recency
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    /// Drop every entry and zero the counters
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.reset();
        self.misses.reset();
        self.evictions.reset();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Estimated bytes held by cached schemas
    pub fn memory_usage(&self) -> u64 {
        self.entries
            .lock()
            .iter()
            .map(|(key, entry)| (key.len() + entry.schema.estimated_size()) as u64)
            .sum()
    }

    /// Cached entries, most recently used first
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.entries.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.get();
        let misses = self.misses.get();
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            hits,
            misses,
            evictions: self.evictions.get(),
            hit_rate: ratio(hits, hits + misses),
            memory_usage: self.memory_usage(),
        }
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
    pub memory_usage: u64,
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}
