//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is the whole input of one pipeline run: which
//! sources and sheet to read, which field to aggregate and how. It can be
//! built in code, parsed from JSON, or assembled by the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::models::ValueField;
use crate::transform::aggregate::{Grouping, Reducer};
use crate::transform::clean::CleanOptions;
use crate::transform::select::SplitBy;

/// Environment variable holding the base directory for relative source paths.
pub const DATA_DIR_ENV: &str = "AQTRENDS_DATA_DIR";

/// One workbook to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,

    /// Series label; defaults to the year found in the file name.
    #[serde(default)]
    pub label: Option<String>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), label: None }
    }

    pub fn labelled(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: Some(label.into()),
        }
    }
}

/// Options for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Workbooks to combine, in output order
    pub sources: Vec<SourceSpec>,

    /// Sheet (pollutant) to read from every source
    pub sheet: String,

    /// Field on the y axis
    pub value_field: ValueField,

    /// Calendar grouping or resampling
    pub grouping: Grouping,

    pub reducer: Reducer,

    pub split_by: SplitBy,

    /// Order aggregated rows by key instead of first occurrence
    pub sorted: bool,

    /// Drop rows without an AQI value
    pub require_aqi: bool,

    /// Base directory for relative source paths (falls back to `AQTRENDS_DATA_DIR`)
    pub data_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            sheet: String::new(),
            value_field: ValueField::Measurement,
            grouping: Grouping::default(),
            reducer: Reducer::Mean,
            split_by: SplitBy::Year,
            sorted: true,
            require_aqi: false,
            data_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn new(sheet: impl Into<String>, sources: Vec<SourceSpec>) -> Self {
        Self {
            sheet: sheet.into(),
            sources,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it, so callers can fill in
    /// missing fields before calling [`PipelineConfig::validate`].
    pub fn read_json_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one source is required".into()));
        }
        if self.sheet.trim().is_empty() {
            return Err(ConfigError::Invalid("sheet name is empty".into()));
        }
        if let Some(empty) = self.sources.iter().find(|s| s.path.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "source path is empty (label {:?})",
                empty.label
            )));
        }
        Ok(())
    }

    /// Base directory for relative paths, if any.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
    }

    /// Absolute or data-dir-relative path of a source.
    pub fn resolve_path(&self, source: &SourceSpec) -> PathBuf {
        match self.data_dir() {
            Some(dir) if source.path.is_relative() => dir.join(&source.path),
            _ => source.path.clone(),
        }
    }

    pub fn clean_options(&self, label: &str) -> CleanOptions {
        CleanOptions {
            require_aqi: self.require_aqi,
            label: Some(label.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::aggregate::GroupKeys;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.value_field, ValueField::Measurement);
        assert_eq!(config.grouping, Grouping::Calendar(GroupKeys::YearMonth));
        assert_eq!(config.reducer, Reducer::Mean);
        assert!(config.sorted);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_with_defaults() {
        let json = r#"{
            "sources": [{"path": "2019.xlsx"}, {"path": "2020.xlsx", "label": "COVID year"}],
            "sheet": "PM2.5",
            "valueField": "aqi",
            "grouping": {"mode": "resample", "by": "week"},
            "dataDir": "/data/carb"
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();

        assert_eq!(config.value_field, ValueField::Aqi);
        assert_eq!(config.reducer, Reducer::Mean);
        assert_eq!(config.sources[1].label.as_deref(), Some("COVID year"));
        assert_eq!(
            config.resolve_path(&config.sources[0]),
            PathBuf::from("/data/carb/2019.xlsx")
        );
    }

    #[test]
    fn test_absolute_paths_not_rebased() {
        let config = PipelineConfig {
            data_dir: Some(PathBuf::from("/data")),
            ..PipelineConfig::new("CO", vec![SourceSpec::new("/tmp/2019.csv")])
        };
        assert_eq!(
            config.resolve_path(&config.sources[0]),
            PathBuf::from("/tmp/2019.csv")
        );
    }

    #[test]
    fn test_invalid_configs() {
        let err = PipelineConfig::from_json_str(r#"{"sources": [{"path": "a.csv"}]}"#).unwrap_err();
        assert!(err.to_string().contains("sheet"));

        let err = PipelineConfig::from_json_str(r#"{"sheet": "NO2", "sources": "x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_read_json_file_defers_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, r#"{"valueField": "aqi", "sorted": false}"#).unwrap();

        let mut config = PipelineConfig::read_json_file(&path).unwrap();
        assert_eq!(config.value_field, ValueField::Aqi);
        assert!(!config.sorted);
        assert!(config.validate().is_err());

        config.sheet = "Ozone".into();
        config.sources.push(SourceSpec::new("2021.xlsx"));
        assert!(config.validate().is_ok());

        let missing = PipelineConfig::read_json_file(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }

    #[test]
    fn test_json_roundtrip_keeps_grouping() {
        let config = PipelineConfig {
            grouping: Grouping::Calendar(GroupKeys::YearWeek),
            ..PipelineConfig::new("Ozone", vec![SourceSpec::labelled("2021.xlsx", "2021")])
        };
        let back = PipelineConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
