//! Record loader: one (source, sheet) pair in, raw rows plus a schema out.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Workbook    │────▶│  Raw rows    │────▶│  RawTable    │
//! │ xlsx/csv/mem │     │  (cells)     │     │  + Schema    │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod reader;
pub mod schema;
pub mod text;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::error::LoadResult;
use crate::models::{RawRow, Schema, ValueField};

pub use reader::{open_workbook, CsvWorkbook, ExcelWorkbook, MemoryWorkbook, Workbook};
pub use schema::{resolve, resolve_named, resolve_positional};

/// A year between 1900 and 2099 not embedded in a longer number.
static YEAR_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").expect("valid year regex"));

/// One loaded sheet with its resolved schema. Header row excluded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    pub source: String,
    pub sheet: String,
    /// Label of the source in output series, usually its year.
    pub source_label: String,
    pub schema: Schema,
    pub has_header: bool,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn available_value_fields(&self) -> Vec<ValueField> {
        self.schema.available_value_fields()
    }
}

/// Load one sheet of a source file or directory.
pub fn load(source: &Path, sheet: &str) -> LoadResult<RawTable> {
    let mut workbook = open_workbook(source)?;
    load_from(workbook.as_mut(), sheet, &source_label(source))
}

/// Load one sheet of an already opened workbook.
pub fn load_from(workbook: &mut dyn Workbook, sheet: &str, label: &str) -> LoadResult<RawTable> {
    let mut rows = workbook.read_sheet(sheet)?;
    let source_name = format!("{} [{}]", workbook.name(), sheet);
    let (schema, has_header) = resolve(&rows, &source_name)?;
    if has_header {
        rows.remove(0);
    }

    Ok(RawTable {
        source: workbook.name().to_string(),
        sheet: sheet.to_string(),
        source_label: label.to_string(),
        schema,
        has_header,
        rows,
    })
}

/// Sheet names of a source.
pub fn list_sheets(source: &Path) -> LoadResult<Vec<String>> {
    Ok(open_workbook(source)?.sheet_names())
}

/// Default label for a source: the year in its file name, else the stem.
pub fn source_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    YEAR_IN_NAME
        .captures(stem)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::models::{CellValue, ResolveStrategy};
    use std::fs;
    use tempfile::tempdir;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| CellValue::text(c)).collect()
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label(Path::new("data/ad_viz_2019.xlsx")), "2019");
        assert_eq!(source_label(Path::new("2020.csv")), "2020");
        assert_eq!(source_label(Path::new("fresno.xlsx")), "fresno");
        assert_eq!(source_label(Path::new("site_120193.csv")), "site_120193");
    }

    #[test]
    fn test_load_from_memory_strips_header() {
        let mut wb = MemoryWorkbook::new("2019").with_sheet(
            "PM2.5",
            vec![
                row(&["Date", "Daily Mean PM2.5 Concentration", "UNITS"]),
                row(&["01/01/2019", "5.0", "ug/m3 LC"]),
            ],
        );
        let table = load_from(&mut wb, "PM2.5", "2019").unwrap();

        assert!(table.has_header);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.schema.strategy, ResolveStrategy::Named);
        assert_eq!(table.available_value_fields(), vec![ValueField::Measurement]);
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2020.csv");
        fs::write(&path, "01/01/2020,5.0,ug/m3,21\n01/02/2020,6.5,ug/m3,27\n").unwrap();

        let table = load(&path, "2020").unwrap();
        assert_eq!(table.source_label, "2020");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.schema.strategy, ResolveStrategy::Positional);
    }

    #[test]
    fn test_load_missing_date_column() {
        let mut wb = MemoryWorkbook::new("2019")
            .with_sheet("CO", vec![row(&["Site", "Daily Mean"]), row(&["Fresno", "0.3"])]);
        let err = load_from(&mut wb, "CO", "2019").unwrap_err();
        assert!(err.to_string().contains("Date"));
        assert!(err.to_string().contains("CO"));
    }

    #[test]
    fn test_numeric_first_column_is_not_a_date() {
        let mut wb = MemoryWorkbook::new("2019").with_sheet(
            "PM2.5",
            vec![
                vec![CellValue::Number(5.0), CellValue::Number(21.0)],
                vec![CellValue::Number(7.0), CellValue::Number(29.0)],
            ],
        );
        let err = load_from(&mut wb, "PM2.5", "2019").unwrap_err();
        match err {
            LoadError::MissingRequiredColumn { column, .. } => assert_eq!(column, "Date"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_serial_dates_accepted_positionally() {
        let mut wb = MemoryWorkbook::new("2019").with_sheet(
            "PM2.5",
            vec![
                vec![CellValue::Number(43466.0), CellValue::Number(5.0)],
                vec![CellValue::Number(43467.0), CellValue::Number(7.0)],
            ],
        );
        let table = load_from(&mut wb, "PM2.5", "2019").unwrap();
        assert_eq!(table.schema.strategy, ResolveStrategy::Positional);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_load_missing_source() {
        let err = load(Path::new("/nonexistent/2019.xlsx"), "PM2.5").unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound(_)));
    }
}
