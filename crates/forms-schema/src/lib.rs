//! OpenSASE Forms Schema Compiler
//!
//! Turns a declarative form definition into a cached submission validator
//! and a live visibility engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SchemaCompiler                          │
//! │                                                              │
//! │  FormMetadata ─► MetadataValidator ─► SchemaBuilder          │
//! │       │               (on miss)          │                   │
//! │       └──── content hash ──► CompilationCache (LRU) ◄──┘     │
//! │                                   │                          │
//! │                       Arc<CompiledSchema>.validate(data)     │
//! │                                                              │
//! │  compute_visibility(fields, values)   (pure, uncached)       │
//! │  PerformanceMonitor                   (atomic counters)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use forms_schema::{FieldCondition, FieldType, FormField, FormMetadata, SchemaCompiler};
//! use serde_json::json;
//!
//! let metadata = FormMetadata::new("1", vec![
//!     FormField::new("subscribe", FieldType::Checkbox),
//!     FormField::new("email", FieldType::Text)
//!         .required()
//!         .with_condition(FieldCondition::equals("subscribe", true)),
//! ]);
//!
//! let compiler = SchemaCompiler::default();
//! let schema = compiler.compile(&metadata).unwrap();
//!
//! let data = json!({"subscribe": "yes", "email": "a@example.com"});
//! let result = compiler.validate(&schema, data.as_object().unwrap());
//! assert!(result.is_valid());
//!
//! let visible = compiler.compute_visibility(&metadata.fields, &Default::default());
//! assert_eq!(visible["email"], false);
//! ```

#![warn(clippy::all)]

pub mod builder;
pub mod cache;
pub mod coerce;
pub mod compiler;
pub mod config;
pub mod error;
pub mod metadata;
pub mod monitor;
pub mod schema;
pub mod validator;
pub mod visibility;

pub use builder::SchemaBuilder;
pub use cache::{CacheEntry, CacheStats, CompilationCache, Lookup, DEFAULT_CACHE_CAPACITY};
pub use coerce::CoercionError;
pub use compiler::{representative_payload, BenchmarkReport, MemoryReport, SchemaCompiler, TimingStats};
pub use config::CompilerConfig;
pub use error::{CircularReferenceError, MetadataError, MetadataErrors, Result};
pub use metadata::{
    ConditionOperator, FieldCondition, FieldOption, FieldType, FormField, FormMetadata, LogicalOp,
};
pub use monitor::{PerformanceMonitor, PerformanceSnapshot};
pub use schema::{CompiledSchema, FieldIssue, ValidationResult, Values};
pub use validator::MetadataValidator;
pub use visibility::{compute_visibility, is_visible};
