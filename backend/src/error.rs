//! Error types for the aqtrends pipeline.
//!
//! This module defines one error type per layer:
//!
//! - [`LoadError`] - Opening sources and resolving their schema
//! - [`ConfigError`] - Reading and validating a [`crate::config::PipelineConfig`]
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::logs::LogEntry;

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors while loading one (source, sheet) pair.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source path does not exist.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    /// The workbook has no sheet with this name.
    #[error("Sheet '{sheet}' not found in {source_name} (available: {available})")]
    SheetNotFound {
        source_name: String,
        sheet: String,
        available: String,
    },

    /// A canonical column could not be resolved.
    #[error("Missing required column '{column}' in {source_name}")]
    MissingRequiredColumn { source_name: String, column: String },

    /// The source exists but its content cannot be decoded.
    #[error("Cannot read {source_name}: {message}")]
    Unreadable { source_name: String, message: String },

    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn unreadable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreadable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn missing_column(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingRequiredColumn {
            source_name: source_name.into(),
            column: column.into(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for this schema.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config parsed but is not usable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading a source failed.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Every value of the selected field was absent after cleaning.
    #[error("No numeric data for '{field}' in {context}")]
    NoNumericData { field: String, context: String },

    /// Loading succeeded but nothing survived cleaning or aggregation.
    #[error("No rows left after filtering {0}")]
    EmptyResultAfterFilter(String),

    /// The selected value column does not exist for the current sheet.
    #[error("Column '{column}' is not available for sheet '{sheet}'")]
    ColumnUnavailable { column: String, sheet: String },
}

impl PipelineError {
    /// User-facing log entry describing this error.
    pub fn diagnostic(&self) -> LogEntry {
        match self {
            PipelineError::EmptyResultAfterFilter(_) | PipelineError::NoNumericData { .. } => {
                LogEntry::warning(self.to_string())
            }
            _ => LogEntry::error(self.to_string()),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::LogLevel;

    #[test]
    fn test_error_conversion_chain() {
        let load_err = LoadError::SourceNotFound("2019.xlsx".into());
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("2019.xlsx"));

        let config_err = ConfigError::Invalid("no sources".into());
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("no sources"));
    }

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = LoadError::SheetNotFound {
            source_name: "2020.xlsx".into(),
            sheet: "NO2".into(),
            available: "PM2.5, Ozone".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("NO2"));
        assert!(msg.contains("PM2.5, Ozone"));
    }

    #[test]
    fn test_diagnostic_levels() {
        let empty = PipelineError::EmptyResultAfterFilter("2019".into());
        assert!(matches!(empty.diagnostic().level, LogLevel::Warning));

        let missing: PipelineError = LoadError::missing_column("a.csv", "Date").into();
        let entry = missing.diagnostic();
        assert!(matches!(entry.level, LogLevel::Error));
        assert!(entry.message.contains("Date"));
    }
}
