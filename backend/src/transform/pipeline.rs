//! High-level pipeline: config in, series out.
//!
//! One run is load → clean → tag for every source, then concatenate,
//! aggregate and project. A failing source is reported and skipped; the
//! run only fails when nothing usable is left.
//!
//! # Example
//!
//! ```rust,ignore
//! use aqtrends::{run, PipelineConfig, SourceSpec, TableCache};
//!
//! let config = PipelineConfig::new(
//!     "PM2.5",
//!     vec![SourceSpec::new("2019.xlsx"), SourceSpec::new("2020.xlsx")],
//! );
//! let mut cache = TableCache::new();
//! let output = run(&config, &mut cache)?;
//! for series in &output.series.series {
//!     println!("{}: {} points", series.label, series.points.len());
//! }
//! ```

use serde::Serialize;
use std::path::Path;

use super::aggregate::aggregate_by;
use super::clean::{clean_with, CleanOptions, CleanReport};
use super::period::tag;
use super::select::{bundle, SeriesBundle};
use crate::cache::TableCache;
use crate::config::PipelineConfig;
use crate::error::{LoadResult, PipelineError, PipelineResult};
use crate::loader::{source_label, RawTable};
use crate::logs::{LogEntry, RunLog};
use crate::models::{Dataset, ValueField};

/// Outcome for one configured source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: String,
    pub label: String,
    pub sheet: String,
    /// Rows read from the sheet (header excluded), 0 if loading failed
    pub rows_loaded: usize,
    pub report: Option<CleanReport>,
    pub error: Option<String>,
}

impl SourceSummary {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub series: SeriesBundle,

    /// Numeric fields offered by the loaded sources
    pub available_y_columns: Vec<ValueField>,

    pub sources: Vec<SourceSummary>,

    /// Rows in the combined dataset
    pub dataset_rows: usize,

    pub diagnostics: Vec<LogEntry>,
}

/// Combined dataset of all usable sources
#[derive(Debug, Clone)]
pub struct LoadedSources {
    pub dataset: Dataset,
    pub available_y_columns: Vec<ValueField>,
    pub sources: Vec<SourceSummary>,
}

/// Run the pipeline, recording diagnostics silently.
pub fn run(config: &PipelineConfig, cache: &mut TableCache) -> PipelineResult<PipelineOutput> {
    run_logged(config, cache, RunLog::new())
}

/// Run the pipeline with a caller-provided log (e.g. one that echoes to stderr).
pub fn run_logged(
    config: &PipelineConfig,
    cache: &mut TableCache,
    mut log: RunLog,
) -> PipelineResult<PipelineOutput> {
    let loaded = build_dataset(config, cache, &mut log)?;
    let field = config.value_field;

    if loaded.dataset.count_values(field) == 0 {
        return Err(PipelineError::NoNumericData {
            field: field.display_name().to_string(),
            context: format!("sheet '{}'", config.sheet),
        });
    }

    log.info(format!(
        "Aggregating {} rows: {} of {} by {:?}",
        loaded.dataset.len(),
        config.reducer,
        field,
        config.grouping
    ));
    let aggregated = aggregate_by(&loaded.dataset, config.grouping, field, config.reducer);
    let aggregated = if config.sorted { aggregated.sorted() } else { aggregated };

    if aggregated.is_empty() {
        return Err(PipelineError::EmptyResultAfterFilter(format!(
            "sheet '{}': no groups after aggregation",
            config.sheet
        )));
    }

    let series = bundle(&aggregated, config.split_by);
    log.success(format!(
        "{} groups in {} series",
        aggregated.len(),
        series.series.len()
    ));

    Ok(PipelineOutput {
        series,
        available_y_columns: loaded.available_y_columns,
        sources: loaded.sources,
        dataset_rows: loaded.dataset.len(),
        diagnostics: log.into_entries(),
    })
}

/// Load, clean and tag every configured source and concatenate the survivors.
pub fn build_dataset(
    config: &PipelineConfig,
    cache: &mut TableCache,
    log: &mut RunLog,
) -> PipelineResult<LoadedSources> {
    config.validate()?;

    let mut parts = Vec::new();
    let mut summaries = Vec::new();
    let mut failures: Vec<(String, PipelineError)> = Vec::new();
    let mut available: Vec<ValueField> = Vec::new();

    for spec in &config.sources {
        let path = config.resolve_path(spec);
        let label = spec.label.clone().unwrap_or_else(|| source_label(&path));
        log.info(format!("📖 {} [{}]", path.display(), config.sheet));

        let mut summary = SourceSummary {
            source: path.display().to_string(),
            label: label.clone(),
            sheet: config.sheet.clone(),
            rows_loaded: 0,
            report: None,
            error: None,
        };

        let table = match cache.get_or_load(&path, &config.sheet) {
            Ok(table) => table,
            Err(e) => {
                let err = PipelineError::from(e);
                log.log(err.diagnostic().with_indent(1));
                summary.error = Some(err.to_string());
                failures.push((summary.source.clone(), err));
                summaries.push(summary);
                continue;
            }
        };

        summary.rows_loaded = table.rows.len();
        log.info_indent(
            format!("{} rows, {:?} columns", table.rows.len(), table.schema.strategy),
            1,
        );
        for field in table.available_value_fields() {
            if !available.contains(&field) {
                available.push(field);
            }
        }

        match process_table(&table, config.value_field, &config.clean_options(&label)) {
            Ok((dataset, report)) => {
                log.success(format!(
                    "{}: kept {} of {} rows ({} bad dates, {} without measurement)",
                    label,
                    report.kept,
                    report.total_rows,
                    report.invalid_dates,
                    report.missing_measurement
                ));
                if report.dropped() > 0 {
                    log.warning_indent(
                        format!("{}: dropped {} incomplete rows", label, report.dropped()),
                        1,
                    );
                }
                summary.report = Some(report);
                parts.push(dataset);
            }
            Err((err, report)) => {
                log.log(err.diagnostic().with_indent(1));
                summary.report = report;
                summary.error = Some(err.to_string());
                failures.push((summary.source.clone(), err));
            }
        }
        summaries.push(summary);
    }

    available.sort_by_key(|f| ValueField::ALL.iter().position(|x| x == f));

    if parts.is_empty() {
        return Err(all_sources_failed(config, failures));
    }

    Ok(LoadedSources {
        dataset: Dataset::concat(parts),
        available_y_columns: available,
        sources: summaries,
    })
}

/// Clean and tag one loaded table for the given value field.
///
/// On failure the clean report is returned alongside the error when
/// cleaning ran.
pub fn process_table(
    table: &RawTable,
    field: ValueField,
    options: &CleanOptions,
) -> Result<(Dataset, CleanReport), (PipelineError, Option<CleanReport>)> {
    if !table.schema.has(field) {
        return Err((
            PipelineError::ColumnUnavailable {
                column: field.display_name().to_string(),
                sheet: format!("{} in {}", table.sheet, table.source),
            },
            None,
        ));
    }

    let cleaned = clean_with(table, options);
    if cleaned.report.kept == 0 {
        let err = PipelineError::EmptyResultAfterFilter(format!(
            "{} ({} [{}]): all {} rows dropped",
            cleaned.source_label, table.source, table.sheet, cleaned.report.total_rows
        ));
        return Err((err, Some(cleaned.report)));
    }

    let report = cleaned.report;
    Ok((tag(cleaned.observations), report))
}

/// Terminal error once no source produced rows. Multi-source errors list
/// every failed source with its reason.
fn all_sources_failed(
    config: &PipelineConfig,
    mut failures: Vec<(String, PipelineError)>,
) -> PipelineError {
    if failures.len() == 1 {
        if let Some((_, only)) = failures.pop() {
            return only;
        }
    }

    let sources: Vec<&str> = failures.iter().map(|(source, _)| source.as_str()).collect();
    if !failures.is_empty()
        && failures
            .iter()
            .all(|(_, e)| matches!(e, PipelineError::ColumnUnavailable { .. }))
    {
        return PipelineError::ColumnUnavailable {
            column: config.value_field.display_name().to_string(),
            sheet: format!("{} in {}", config.sheet, sources.join(", ")),
        };
    }

    let details: Vec<String> = failures
        .iter()
        .map(|(source, e)| format!("{}: {}", source, e))
        .collect();
    PipelineError::EmptyResultAfterFilter(format!(
        "all {} sources for sheet '{}' ({})",
        config.sources.len(),
        config.sheet,
        details.join("; ")
    ))
}

/// Numeric fields a sheet offers for selection.
pub fn available_columns(
    source: &Path,
    sheet: &str,
    cache: &mut TableCache,
) -> LoadResult<Vec<ValueField>> {
    Ok(cache.get_or_load(source, sheet)?.available_value_fields())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceSpec;
    use crate::logs::LogLevel;
    use crate::transform::aggregate::{Bucket, GroupKeys, Grouping, Reducer};
    use crate::transform::select::{SplitBy, XValue};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    const HEADER: &str = concat!(
        "Date,Source,Site ID,POC,Daily Mean PM2.5 Concentration,",
        "UNITS,DAILY_AQI_VALUE,Site Name"
    );

    /// One directory per year, one CSV per pollutant sheet.
    fn workbook(root: &TempDir, year: &str, sheet: &str, content: &str) -> PathBuf {
        let dir = root.path().join(year);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{sheet}.csv")), content).unwrap();
        dir
    }

    fn config(sources: Vec<PathBuf>, sheet: &str) -> PipelineConfig {
        PipelineConfig::new(sheet, sources.into_iter().map(SourceSpec::new).collect())
    }

    #[test]
    fn test_year_month_scenario_end_to_end() {
        let root = tempdir().unwrap();
        let wb = workbook(
            &root,
            "2019",
            "PM2.5",
            &format!(
                "{HEADER}\n01/01/2019,AQS,60190011,1,5.0,ug/m3 LC,21,Fresno\n\
                 01/08/2019,AQS,60190011,1,7.0,ug/m3 LC,29,Fresno\n\
                 02/01/2019,AQS,60190011,1,9.0,ug/m3 LC,38,Fresno\n"
            ),
        );

        let output = run(&config(vec![wb], "PM2.5"), &mut TableCache::new()).unwrap();

        assert_eq!(output.series.x_label, "Month");
        assert_eq!(output.series.y_label, "Daily Mean");
        assert_eq!(output.series.series.len(), 1);
        let s = &output.series.series[0];
        assert_eq!(s.label, "2019");
        assert_eq!(s.points[0].x, XValue::Period(1));
        assert_eq!(s.points[0].y, 6.0);
        assert_eq!(s.points[1].x, XValue::Period(2));
        assert_eq!(s.points[1].y, 9.0);
        assert_eq!(output.available_y_columns, vec![ValueField::Measurement, ValueField::Aqi]);
        assert_eq!(output.dataset_rows, 3);
    }

    #[test]
    fn test_partial_success_with_unparsable_source() {
        let root = tempdir().unwrap();
        let bad = workbook(&root, "2019", "PM2.5", "Date,Daily Mean\nsoon,1.0\nlater,2.0\n");
        let good = workbook(
            &root,
            "2020",
            "PM2.5",
            "Date,Daily Mean\n03/01/2020,4.0\n03/02/2020,6.0\n",
        );
        let cfg = config(vec![bad, good], "PM2.5");

        let mut log = RunLog::new();
        let loaded = build_dataset(&cfg, &mut TableCache::new(), &mut log).unwrap();
        assert_eq!(loaded.dataset.len(), 2);
        assert!(loaded.dataset.records().iter().all(|r| r.year == 2020));
        assert!(!loaded.sources[0].is_ok());
        assert_eq!(loaded.sources[0].report.as_ref().unwrap().invalid_dates, 2);
        assert!(loaded.sources[1].is_ok());

        let warnings: Vec<_> = log
            .entries()
            .iter()
            .filter(|e| e.level == LogLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("No rows left after filtering 2019"));
        assert!(log
            .entries()
            .iter()
            .any(|e| e.indent == 1 && e.message.contains("Named")));

        let output = run(&cfg, &mut TableCache::new()).unwrap();
        assert_eq!(output.series.series.len(), 1);
        assert_eq!(output.series.series[0].label, "2020");
        assert_eq!(output.diagnostics.iter().filter(|e| e.level == LogLevel::Warning).count(), 1);
    }

    #[test]
    fn test_dropped_rows_warned_for_surviving_source() {
        let root = tempdir().unwrap();
        let wb = workbook(&root, "2021", "CO", "Date,Daily Mean\n01/01/2021,0.4\nlater,0.5\n");

        let mut log = RunLog::new();
        let cfg = config(vec![wb], "CO");
        let loaded = build_dataset(&cfg, &mut TableCache::new(), &mut log).unwrap();
        assert_eq!(loaded.dataset.len(), 1);

        let warning = log.problems().next().unwrap();
        assert_eq!(warning.indent, 1);
        assert!(warning.message.contains("2021: dropped 1 incomplete rows"));
    }

    #[test]
    fn test_all_sources_failing() {
        let root = tempdir().unwrap();
        let a = workbook(&root, "2019", "CO", "Date,Daily Mean\nsoon,1.0\n");
        let b = root.path().join("2020");

        let err = run(&config(vec![a, b], "CO"), &mut TableCache::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResultAfterFilter(_)));
        assert!(err.to_string().contains("all 2 sources"));
    }

    #[test]
    fn test_all_sources_failing_names_each_source() {
        let root = tempdir().unwrap();
        let no_date = workbook(&root, "2019", "CO", "Site,Daily Mean\nFresno,1.0\n");
        let missing = root.path().join("2020.xlsx");

        let cfg = config(vec![no_date.clone(), missing], "CO");
        let err = run(&cfg, &mut TableCache::new()).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, PipelineError::EmptyResultAfterFilter(_)));
        assert!(msg.contains(&no_date.display().to_string()));
        assert!(msg.contains("Date"));
        assert!(msg.contains("2020.xlsx"));
    }

    #[test]
    fn test_missing_aqi_column_not_offered() {
        let root = tempdir().unwrap();
        let wb = workbook(&root, "2021", "NO2", "Date,Daily Mean,Units\n01/01/2021,3.0,ppb\n");

        let mut cache = TableCache::new();
        assert_eq!(
            available_columns(&wb, "NO2", &mut cache).unwrap(),
            vec![ValueField::Measurement]
        );

        let cfg = PipelineConfig {
            value_field: ValueField::Aqi,
            ..config(vec![wb], "NO2")
        };
        let err = run(&cfg, &mut cache).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnUnavailable { .. }));
        assert!(err.to_string().contains("Daily AQI Value"));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_single_missing_source_is_terminal() {
        let root = tempdir().unwrap();
        let cfg = config(vec![root.path().join("1999.xlsx")], "CO");
        let err = run(&cfg, &mut TableCache::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
        assert!(err.to_string().contains("1999.xlsx"));
    }

    #[test]
    fn test_unknown_sheet_is_reported() {
        let root = tempdir().unwrap();
        let wb = workbook(&root, "2019", "PM2.5", "Date,Daily Mean\n01/01/2019,1.0\n");
        let err = run(&config(vec![wb], "Ozone"), &mut TableCache::new()).unwrap_err();
        assert!(err.to_string().contains("Ozone"));
        assert!(err.to_string().contains("PM2.5"));
    }

    #[test]
    fn test_no_numeric_aqi() {
        let root = tempdir().unwrap();
        let wb = workbook(
            &root,
            "2022",
            "PM10",
            "Date,Daily Mean,Daily AQI Value\n01/01/2022,3.0,\n01/02/2022,4.0,n/a\n",
        );
        let cfg = PipelineConfig {
            value_field: ValueField::Aqi,
            ..config(vec![wb], "PM10")
        };
        let err = run(&cfg, &mut TableCache::new()).unwrap_err();
        assert!(matches!(err, PipelineError::NoNumericData { .. }));
    }

    #[test]
    fn test_weekly_resample_single_timeline() {
        let root = tempdir().unwrap();
        let wb = workbook(
            &root,
            "2019",
            "PM2.5",
            "01/01/2019,2.0,ug/m3,10\n01/03/2019,4.0,ug/m3,20\n01/07/2019,9.0,ug/m3,40\n",
        );
        let cfg = PipelineConfig {
            grouping: Grouping::Resample(Bucket::Week),
            split_by: SplitBy::None,
            reducer: Reducer::Sum,
            ..config(vec![wb], "PM2.5")
        };
        let output = run(&cfg, &mut TableCache::new()).unwrap();
        let points = &output.series.series[0].points;

        assert_eq!(output.series.x_label, "Date");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].y, 6.0);
        assert_eq!(points[1].y, 9.0);
    }

    #[test]
    fn test_sources_concatenated_in_config_order() {
        let root = tempdir().unwrap();
        let a = workbook(&root, "2020", "PM10", "01/05/2020,1.0\n");
        let b = workbook(&root, "2019", "PM10", "01/05/2019,2.0\n");
        let cfg = PipelineConfig {
            grouping: Grouping::Calendar(GroupKeys::Year),
            sorted: false,
            ..config(vec![a, b], "PM10")
        };

        let loaded = build_dataset(&cfg, &mut TableCache::new(), &mut RunLog::new()).unwrap();
        let years: Vec<_> = loaded.dataset.records().iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2020, 2019]);
        assert_eq!(loaded.sources[0].label, "2020");
    }
}
