//! Column resolution: header aliases first, fixed positions second.
//!
//! Headerless sources are mapped as `[Date, Measurement, Units, AQI]`.
//! That positional layout is only trusted when column 0 actually holds
//! dates in the first rows of the table.

use crate::dates::{parse_date_cell, parse_plausible_date_cell};
use crate::error::{LoadError, LoadResult};
use crate::models::{CanonicalField, CellValue, ColumnRef, RawRow, ResolveStrategy, Schema};

/// Rows inspected when sampling a headerless table.
const SAMPLE_ROWS: usize = 10;

const DATE_ALIASES: &[&str] = &["date"];
const AQI_ALIASES: &[&str] = &["daily aqi value", "aqi"];
const MEASUREMENT_ALIASES: &[&str] = &["daily mean", "measurement", "daily max", "concentration"];
const UNITS_ALIASES: &[&str] = &["units", "unit"];

/// Positional layout for headerless tables.
const POSITIONAL_LAYOUT: [(CanonicalField, usize); 4] = [
    (CanonicalField::Date, 0),
    (CanonicalField::Measurement, 1),
    (CanonicalField::Units, 2),
    (CanonicalField::AqiValue, 3),
];

/// Lower-case, `_` as space, collapsed whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A row is a header when every non-empty cell is text that reads as
/// neither a date nor a number.
pub fn is_header_row(row: &RawRow) -> bool {
    let mut saw_text = false;
    for cell in row {
        match cell {
            CellValue::Empty => {}
            CellValue::Text(s) => {
                if parse_date_cell(cell).is_some() || s.trim().parse::<f64>().is_ok() {
                    return false;
                }
                saw_text = true;
            }
            CellValue::Number(_) | CellValue::Date(_) => return false,
        }
    }
    saw_text
}

/// Resolve the schema of a table.
///
/// Returns the schema and whether row 0 is a header.
pub fn resolve(rows: &[RawRow], source_name: &str) -> LoadResult<(Schema, bool)> {
    let first = rows
        .first()
        .ok_or_else(|| LoadError::missing_column(source_name, CanonicalField::Date.name()))?;

    if is_header_row(first) {
        let schema = resolve_named(first)
            .ok_or_else(|| LoadError::missing_column(source_name, CanonicalField::Date.name()))?;
        Ok((schema, true))
    } else {
        let schema = resolve_positional(rows)
            .ok_or_else(|| LoadError::missing_column(source_name, CanonicalField::Date.name()))?;
        Ok((schema, false))
    }
}

/// Match header names against the alias tables.
pub fn resolve_named(header: &RawRow) -> Option<Schema> {
    let names: Vec<String> = header
        .iter()
        .map(|c| c.as_text().map(normalize_header).unwrap_or_default())
        .collect();
    let mut taken = vec![false; names.len()];

    let date = claim(&names, DATE_ALIASES, &mut taken, header)?;
    let aqi = claim(&names, AQI_ALIASES, &mut taken, header);
    let measurement = claim(&names, MEASUREMENT_ALIASES, &mut taken, header);
    let units = claim(&names, UNITS_ALIASES, &mut taken, header);

    Some(Schema {
        strategy: ResolveStrategy::Named,
        date,
        measurement,
        units,
        aqi,
    })
}

/// Find the first unclaimed column for the highest-priority alias.
/// Exact matches win over substring matches for the same alias.
fn claim(
    names: &[String],
    aliases: &[&str],
    taken: &mut [bool],
    header: &RawRow,
) -> Option<ColumnRef> {
    for alias in aliases {
        let exact = names
            .iter()
            .enumerate()
            .find(|(i, n)| !taken[*i] && n.as_str() == *alias);
        let found = exact.or_else(|| {
            names
                .iter()
                .enumerate()
                .find(|(i, n)| !taken[*i] && n.contains(alias))
        });
        if let Some((index, _)) = found {
            taken[index] = true;
            return Some(ColumnRef {
                index,
                header: Some(header[index].to_string()),
            });
        }
    }
    None
}

/// Fixed-position mapping for headerless tables.
pub fn resolve_positional(rows: &[RawRow]) -> Option<Schema> {
    let sample = &rows[..rows.len().min(SAMPLE_ROWS)];
    let plausible = sample
        .iter()
        .any(|row| row.first().and_then(parse_plausible_date_cell).is_some());
    if !plausible {
        return None;
    }

    let width = sample.iter().map(Vec::len).max().unwrap_or(0);
    let column = |field: CanonicalField| {
        POSITIONAL_LAYOUT
            .iter()
            .find(|(f, _)| *f == field)
            .filter(|(_, index)| *index < width)
            .map(|(_, index)| ColumnRef { index: *index, header: None })
    };

    Some(Schema {
        strategy: ResolveStrategy::Positional,
        date: column(CanonicalField::Date)?,
        measurement: column(CanonicalField::Measurement),
        units: column(CanonicalField::Units),
        aqi: column(CanonicalField::AqiValue),
    })
}
