//! Cleaner: typed observations out of raw rows.
//!
//! Rows without a parseable date are dropped, as are rows without a
//! measurement when the table has a measurement column. Nothing here
//! fails; every dropped row is counted in the [`CleanReport`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dates::parse_date_cell;
use crate::loader::RawTable;
use crate::models::{CellValue, ColumnRef, Observation, RawRow};

/// `1,234` or `-12,345.6`
static THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid thousands regex"));

static EMPTY_CELL: CellValue = CellValue::Empty;

/// Caller requirements for a row to survive cleaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanOptions {
    /// Also drop rows without an AQI value.
    #[serde(default)]
    pub require_aqi: bool,

    /// Override the table's source label.
    #[serde(default)]
    pub label: Option<String>,
}

/// Counts of what cleaning did to a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanReport {
    pub total_rows: usize,
    pub invalid_dates: usize,
    pub missing_measurement: usize,
    pub missing_aqi: usize,
    pub kept: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.total_rows - self.kept
    }
}

/// Cleaned rows of one table, sorted by date.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedTable {
    pub source_label: String,
    pub observations: Vec<Observation>,
    pub report: CleanReport,
}

/// Clean with default options: measurement required, AQI optional.
pub fn clean(table: &RawTable) -> CleanedTable {
    clean_with(table, &CleanOptions::default())
}

pub fn clean_with(table: &RawTable, options: &CleanOptions) -> CleanedTable {
    let schema = &table.schema;
    let label = options
        .label
        .clone()
        .unwrap_or_else(|| table.source_label.clone());

    let mut report = CleanReport {
        total_rows: table.rows.len(),
        ..CleanReport::default()
    };
    let mut observations = Vec::with_capacity(table.rows.len());

    for row in &table.rows {
        let Some(date) = parse_date_cell(cell(row, Some(&schema.date))) else {
            report.invalid_dates += 1;
            continue;
        };

        let measurement = coerce_number(cell(row, schema.measurement.as_ref()));
        if schema.measurement.is_some() && measurement.is_none() {
            report.missing_measurement += 1;
            continue;
        }

        let aqi = coerce_number(cell(row, schema.aqi.as_ref()));
        if options.require_aqi && aqi.is_none() {
            report.missing_aqi += 1;
            continue;
        }

        observations.push(Observation {
            date,
            measurement,
            units: coerce_text(cell(row, schema.units.as_ref())),
            aqi,
            source_label: label.clone(),
        });
    }

    // stable: same-day rows keep their source order
    observations.sort_by_key(|o| o.date);
    report.kept = observations.len();

    CleanedTable {
        source_label: label,
        observations,
        report,
    }
}

fn cell<'a>(row: &'a RawRow, column: Option<&ColumnRef>) -> &'a CellValue {
    column
        .and_then(|c| row.get(c.index))
        .unwrap_or(&EMPTY_CELL)
}

/// Numeric value of a cell; anything non-numeric is absent.
pub fn coerce_number(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let s = s.trim();
            if THOUSANDS.is_match(s) {
                s.replace(',', "").parse().ok()?
            } else {
                s.parse().ok()?
            }
        }
        CellValue::Empty | CellValue::Date(_) => return None,
    };
    value.is_finite().then_some(value)
}

fn coerce_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Empty => None,
        other => Some(other.to_string()),
    }
}
