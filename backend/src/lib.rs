//! # aqtrends - air-quality workbook normalization and calendar aggregation
//!
//! aqtrends reads California air-quality workbooks (one workbook per year,
//! one sheet per pollutant), normalizes their columns, and turns them into
//! chart-ready series grouped by year, month or ISO week.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Workbook   │────▶│   Loader    │────▶│   Cleaner   │────▶│ Aggregator  │────▶│   Series    │
//! │ (xlsx/csv)  │     │  (schema)   │     │ (+ tagger)  │     │ (mean/sum)  │     │ (x, y, lbl) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aqtrends::{run, PipelineConfig, SourceSpec, TableCache};
//!
//! let config = PipelineConfig::new("PM2.5", vec![SourceSpec::new("data/2019.xlsx")]);
//! let output = run(&config, &mut TableCache::new()).unwrap();
//! println!("{} series", output.series.series.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, schema, records and datasets
//! - [`dates`] - Primary and fallback date parsing
//! - [`loader`] - Workbook readers and column resolution
//! - [`transform`] - Cleaning, tagging, aggregation, projection, pipeline
//! - [`cache`] - In-memory table cache
//! - [`config`] - Pipeline configuration
//! - [`logs`] - Run diagnostics

// Core modules
pub mod error;
pub mod models;

// Loading
pub mod dates;
pub mod loader;

// Transformation
pub mod transform;

// Caching
pub mod cache;

// Configuration and diagnostics
pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, LoadError, PipelineError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CanonicalField,
    CellValue,
    Dataset,
    Observation,
    RawRow,
    Record,
    Schema,
    ValueField,
};

// =============================================================================
// Re-exports - Loader
// =============================================================================

pub use loader::{
    list_sheets,
    load,
    load_from,
    open_workbook,
    source_label,
    MemoryWorkbook,
    RawTable,
    Workbook,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    aggregate,
    aggregate_by,
    bundle,
    clean,
    clean_with,
    project,
    resample,
    tag,
    AggregatedSeries,
    Bucket,
    CleanOptions,
    CleanReport,
    GroupKey,
    GroupKeys,
    Grouping,
    Reducer,
    Series,
    SeriesBundle,
    SplitBy,
    XValue,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    available_columns,
    build_dataset,
    run,
    run_logged,
    PipelineOutput,
    SourceSummary,
};

// =============================================================================
// Re-exports - Cache, config, logs
// =============================================================================

pub use cache::{CacheStats, TableCache};
pub use config::{PipelineConfig, SourceSpec};
pub use logs::{LogEntry, LogLevel, RunLog};
