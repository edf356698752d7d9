//! Domain models for the aqtrends pipeline.
//!
//! - [`CellValue`] / [`RawRow`] - Cells as produced by a workbook reader
//! - [`CanonicalField`] / [`Schema`] - Normalized column mapping
//! - [`Observation`] - A cleaned row before period tagging
//! - [`Record`] / [`Dataset`] - Tagged canonical rows
//! - [`ValueField`] - The numeric fields that can be aggregated

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Raw cells
// =============================================================================

/// One cell as emitted by a workbook reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl CellValue {
    /// Build a cell from raw text; blank text becomes [`CellValue::Empty`].
    pub fn text(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(d) => write!(f, "{}", d),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// An ordered row of cells for one (source, sheet) pair.
pub type RawRow = Vec<CellValue>;

// =============================================================================
// Schema
// =============================================================================

/// A normalized column, independent of source naming or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    Date,
    Measurement,
    Units,
    #[serde(rename = "AQIValue")]
    AqiValue,
}

impl CanonicalField {
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Date => "Date",
            CanonicalField::Measurement => "Measurement",
            CanonicalField::Units => "Units",
            CanonicalField::AqiValue => "AQIValue",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a schema was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveStrategy {
    /// Matched header names against known aliases.
    Named,
    /// Headerless table mapped by fixed column positions.
    Positional,
}

/// Where one canonical field lives in the source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub index: usize,
    /// Header text that matched, `None` for positional columns.
    pub header: Option<String>,
}

/// Mapping from canonical fields to source columns.
///
/// `date` is always resolved; the other fields are best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub strategy: ResolveStrategy,
    pub date: ColumnRef,
    pub measurement: Option<ColumnRef>,
    pub units: Option<ColumnRef>,
    pub aqi: Option<ColumnRef>,
}

impl Schema {
    pub fn column(&self, field: CanonicalField) -> Option<&ColumnRef> {
        match field {
            CanonicalField::Date => Some(&self.date),
            CanonicalField::Measurement => self.measurement.as_ref(),
            CanonicalField::Units => self.units.as_ref(),
            CanonicalField::AqiValue => self.aqi.as_ref(),
        }
    }

    /// Numeric fields this table can offer for aggregation.
    pub fn available_value_fields(&self) -> Vec<ValueField> {
        ValueField::ALL
            .into_iter()
            .filter(|f| self.column(f.canonical()).is_some())
            .collect()
    }

    pub fn has(&self, field: ValueField) -> bool {
        self.column(field.canonical()).is_some()
    }
}

// =============================================================================
// Value fields
// =============================================================================

/// A numeric field that can be selected for the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueField {
    /// Primary measurement ("Daily Mean" concentration).
    #[serde(alias = "daily-mean")]
    Measurement,
    /// Daily AQI value.
    #[serde(alias = "daily-aqi-value")]
    Aqi,
}

impl ValueField {
    pub const ALL: [ValueField; 2] = [ValueField::Measurement, ValueField::Aqi];

    pub fn canonical(&self) -> CanonicalField {
        match self {
            ValueField::Measurement => CanonicalField::Measurement,
            ValueField::Aqi => CanonicalField::AqiValue,
        }
    }

    /// Label used on chart axes and single-series output.
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueField::Measurement => "Daily Mean",
            ValueField::Aqi => "Daily AQI Value",
        }
    }

    pub fn value_of(&self, record: &Record) -> Option<f64> {
        match self {
            ValueField::Measurement => record.measurement,
            ValueField::Aqi => record.aqi,
        }
    }
}

impl fmt::Display for ValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A cleaned row: valid date, coerced numbers, not yet tagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub date: NaiveDate,
    pub measurement: Option<f64>,
    pub units: Option<String>,
    pub aqi: Option<f64>,
    pub source_label: String,
}

/// Calendar attributes derived from a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    /// ISO-8601 week, 1..=53
    pub week: u32,
    /// ISO week-numbering year `week` belongs to.
    pub iso_year: i32,
}

/// Canonical tagged row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub date: NaiveDate,
    pub measurement: Option<f64>,
    pub units: Option<String>,
    pub aqi: Option<f64>,
    pub year: i32,
    pub month: u32,
    pub week: u32,
    pub iso_year: i32,
    pub source_year_label: String,
}

impl Record {
    pub fn from_observation(obs: Observation, period: Period) -> Self {
        Self {
            date: obs.date,
            measurement: obs.measurement,
            units: obs.units,
            aqi: obs.aqi,
            year: period.year,
            month: period.month,
            week: period.week,
            iso_year: period.iso_year,
            source_year_label: obs.source_label,
        }
    }
}

/// Ordered, immutable collection of records from one or more sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Concatenate datasets in order. No deduplication.
    pub fn concat(parts: impl IntoIterator<Item = Dataset>) -> Self {
        let records = parts.into_iter().flat_map(|d| d.records).collect();
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records carrying a value for `field`.
    pub fn count_values(&self, field: ValueField) -> usize {
        self.records
            .iter()
            .filter(|r| field.value_of(r).is_some())
            .count()
    }
}
