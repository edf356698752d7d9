//! Date parsing for spreadsheet cells.
//!
//! Dates are expected as `MM/DD/YYYY`. Anything else goes through a
//! locale-agnostic fallback that accepts ISO dates and date-times,
//! RFC 3339, compact `YYYYMMDD`, month-name forms and Excel serial days.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CellValue;

/// Primary format used by the source workbooks.
pub const PRIMARY_FORMAT: &str = "%m/%d/%Y";

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// `YYYY-MM-DD` or `YYYY/MM/DD` at the start of a longer string.
static LEADING_YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("valid date regex")
});

/// Excel's day zero (serial 1 = 1900-01-01 with the 1900 leap-year quirk).
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial Excel accepts (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Parse with the primary `MM/DD/YYYY` format only.
pub fn parse_primary(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), PRIMARY_FORMAT).ok()
}

/// Parse a date string: primary format first, then the fallbacks.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    parse_primary(s).or_else(|| parse_fallback(s))
}

fn parse_fallback(s: &str) -> Option<NaiveDate> {
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    // chrono's %Y is greedy, so compact dates are split by hand
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year = s[0..4].parse().ok()?;
        let month = s[4..6].parse().ok()?;
        let day = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let caps = LEADING_YMD.captures(s)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Convert an Excel serial day number to a date.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_days(chrono::Days::new(serial.floor() as u64))
}

/// Interpret a cell as a date.
pub fn parse_date_cell(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => from_excel_serial(*n),
        CellValue::Text(s) => parse_date_str(s),
        CellValue::Empty => None,
    }
}

/// Years a bare serial number may fall in before it is read as a date
/// when sampling a headerless column.
const PLAUSIBLE_SERIAL_YEARS: std::ops::RangeInclusive<i32> = 1970..=2100;

/// Like [`parse_date_cell`], but a bare number only counts when its serial
/// lands between 1970 and 2100. Small measurements such as `5.0`
/// would otherwise read as early-1900 dates.
pub fn parse_plausible_date_cell(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(n) => {
            from_excel_serial(*n).filter(|d| PLAUSIBLE_SERIAL_YEARS.contains(&d.year()))
        }
        other => parse_date_cell(other),
    }
}
