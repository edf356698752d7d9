//! Period tagger: calendar attributes for every observation.

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Dataset, Observation, Period, Record};

impl Period {
    /// Year, month and ISO-8601 week of a date.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: date.year(),
            month: date.month(),
            week: iso.week(),
            iso_year: iso.year(),
        }
    }
}

/// Tag observations with their period. Order is preserved.
pub fn tag(observations: Vec<Observation>) -> Dataset {
    let records = observations
        .into_iter()
        .map(|obs| {
            let period = Period::of(obs.date);
            Record::from_observation(obs, period)
        })
        .collect();
    Dataset::new(records)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(date)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(date: NaiveDate) -> Observation {
        Observation {
            date,
            measurement: Some(1.0),
            units: None,
            aqi: None,
            source_label: "2024".into(),
        }
    }

    #[test]
    fn test_iso_week_year_boundary() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025
        let p = Period::of(ymd(2024, 12, 30));
        assert_eq!(p.year, 2024);
        assert_eq!(p.month, 12);
        assert_eq!(p.week, 1);
        assert_eq!(p.iso_year, 2025);
    }

    #[test]
    fn test_week_53() {
        // 2021-01-01 (Friday) belongs to week 53 of 2020
        let p = Period::of(ymd(2021, 1, 1));
        assert_eq!(p.week, 53);
        assert_eq!(p.iso_year, 2020);
        assert_eq!(p.year, 2021);
    }

    #[test]
    fn test_tag_preserves_order() {
        let ds = tag(vec![obs(ymd(2019, 1, 1)), obs(ymd(2019, 2, 1))]);
        let records = ds.records();
        assert_eq!(records[0].month, 1);
        assert_eq!(records[0].week, 1);
        assert_eq!(records[1].month, 2);
        assert_eq!(records[1].week, 5);
        assert_eq!(records[1].source_year_label, "2024");
    }

    #[test]
    fn test_bucket_starts() {
        assert_eq!(week_start(ymd(2019, 1, 6)), ymd(2018, 12, 31));
        assert_eq!(week_start(ymd(2019, 1, 7)), ymd(2019, 1, 7));
        assert_eq!(month_start(ymd(2019, 2, 28)), ymd(2019, 2, 1));
    }
}
