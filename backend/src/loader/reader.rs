//! Workbook readers.
//!
//! A [`Workbook`] is anything that exposes named sheets of raw rows:
//! spreadsheet files via calamine, CSV exports (one file per sheet) and
//! in-memory tables.

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use super::text::parse_bytes_auto;
use crate::dates::from_excel_serial;
use crate::error::{LoadError, LoadResult};
use crate::models::{CellValue, RawRow};

/// Extensions read as delimited text.
pub const TEXT_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Extensions read as spreadsheet workbooks.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A tabular source with named sheets.
pub trait Workbook {
    /// Display name used in messages.
    fn name(&self) -> &str;

    fn sheet_names(&self) -> Vec<String>;

    /// Read all rows of a sheet. The sheet name must come from [`Workbook::sheet_names`].
    fn read_rows(&mut self, sheet: &str) -> LoadResult<Vec<RawRow>>;

    /// Resolve a requested sheet name, exact match first, then case-insensitive.
    fn find_sheet(&self, requested: &str) -> Option<String> {
        let names = self.sheet_names();
        let requested = requested.trim();
        names
            .iter()
            .find(|n| n.as_str() == requested)
            .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(requested)))
            .cloned()
    }

    /// Read a sheet by (possibly loosely spelled) name.
    fn read_sheet(&mut self, sheet: &str) -> LoadResult<Vec<RawRow>> {
        let resolved = self.find_sheet(sheet).ok_or_else(|| LoadError::SheetNotFound {
            source_name: self.name().to_string(),
            sheet: sheet.to_string(),
            available: self.sheet_names().join(", "),
        })?;
        self.read_rows(&resolved)
    }
}

// =============================================================================
// Spreadsheet workbooks
// =============================================================================

/// `.xlsx`/`.xls`/`.ods` workbook read with calamine.
pub struct ExcelWorkbook {
    name: String,
    sheets: Sheets<BufReader<File>>,
}

impl ExcelWorkbook {
    pub fn open(path: &Path) -> LoadResult<Self> {
        let name = path.display().to_string();
        let sheets =
            open_workbook_auto(path).map_err(|e| LoadError::unreadable(&name, e.to_string()))?;
        Ok(Self { name, sheets })
    }
}

impl Workbook for ExcelWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_rows(&mut self, sheet: &str) -> LoadResult<Vec<RawRow>> {
        let range = self
            .sheets
            .worksheet_range(sheet)
            .map_err(|e| LoadError::unreadable(&self.name, format!("sheet '{}': {}", sheet, e)))?;

        Ok(range
            .rows()
            .map(|row| row.iter().map(cell_from_excel).collect::<RawRow>())
            .filter(|row| !row.iter().all(CellValue::is_empty))
            .collect())
    }
}

fn cell_from_excel(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::String(s) => CellValue::text(s),
        Data::DateTime(dt) => from_excel_serial(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Empty),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s),
    }
}

// =============================================================================
// CSV exports
// =============================================================================

/// Delimited text exports: a single file is one sheet named after its stem,
/// a directory holds one sheet per file.
pub struct CsvWorkbook {
    name: String,
    sheets: Vec<(String, PathBuf)>,
}

impl CsvWorkbook {
    pub fn from_file(path: &Path) -> Self {
        Self {
            name: path.display().to_string(),
            sheets: vec![(file_stem(path), path.to_path_buf())],
        }
    }

    pub fn from_dir(dir: &Path) -> LoadResult<Self> {
        let mut sheets: Vec<(String, PathBuf)> = fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_extension(path, TEXT_EXTENSIONS))
            .map(|path| (file_stem(&path), path))
            .collect();
        sheets.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self {
            name: dir.display().to_string(),
            sheets,
        })
    }
}

impl Workbook for CsvWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_rows(&mut self, sheet: &str) -> LoadResult<Vec<RawRow>> {
        let path = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, path)| path)
            .ok_or_else(|| {
                LoadError::unreadable(&self.name, format!("sheet '{}' vanished", sheet))
            })?;

        let bytes = fs::read(path)?;
        parse_bytes_auto(&bytes, &path.display().to_string())
    }
}

// =============================================================================
// In-memory tables
// =============================================================================

/// Sheets held in memory, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Vec<(String, Vec<RawRow>)>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>, rows: Vec<RawRow>) -> Self {
        self.sheets.push((sheet.into(), rows));
        self
    }
}

impl Workbook for MemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_rows(&mut self, sheet: &str) -> LoadResult<Vec<RawRow>> {
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| LoadError::unreadable(&self.name, format!("sheet '{}' vanished", sheet)))
    }
}

// =============================================================================
// Opening sources
// =============================================================================

/// Open a source path as a workbook, choosing the reader by file type.
pub fn open_workbook(path: &Path) -> LoadResult<Box<dyn Workbook>> {
    if !path.exists() {
        return Err(LoadError::SourceNotFound(path.display().to_string()));
    }
    if path.is_dir() {
        return Ok(Box::new(CsvWorkbook::from_dir(path)?));
    }
    if has_extension(path, TEXT_EXTENSIONS) {
        return Ok(Box::new(CsvWorkbook::from_file(path)));
    }
    if has_extension(path, WORKBOOK_EXTENSIONS) {
        return Ok(Box::new(ExcelWorkbook::open(path)?));
    }
    Err(LoadError::unreadable(
        path.display().to_string(),
        "unsupported file type",
    ))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string()
}
