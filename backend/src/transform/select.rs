//! Series selector: shape an aggregated table into labelled (x, y) series.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::aggregate::{AggregatedSeries, Bucket, GroupKey, GroupKeys, Grouping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBy {
    /// One series per year.
    #[default]
    Year,
    /// A single series for the whole table.
    None,
}

/// X coordinate of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum XValue {
    /// Month (1..=12) or ISO week (1..=53) within a year.
    Period(u32),
    Year(i32),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: XValue,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<Point>,
}

/// Series plus the axis titles a chart should use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesBundle {
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

/// Split into one series per year (sorted by year) or one series overall.
/// Points within a series are sorted by x.
pub fn project(aggregated: &AggregatedSeries, split_by: SplitBy) -> Vec<Series> {
    match split_by {
        SplitBy::Year => {
            let mut by_year: BTreeMap<i32, Vec<Point>> = BTreeMap::new();
            for row in aggregated.rows() {
                let (year, x) = match row.key {
                    GroupKey::Calendar { year, period: Some(p) } => (year, XValue::Period(p)),
                    GroupKey::Calendar { year, period: None } => (year, XValue::Year(year)),
                    GroupKey::Bucket(date) => {
                        (bucket_year(aggregated.grouping, date), XValue::Date(date))
                    }
                };
                by_year.entry(year).or_default().push(Point { x, y: row.value });
            }
            by_year
                .into_iter()
                .map(|(year, points)| Series {
                    label: year.to_string(),
                    points: sorted(points),
                })
                .collect()
        }
        SplitBy::None => {
            let points = aggregated
                .rows()
                .iter()
                .map(|row| Point {
                    x: timeline_x(aggregated.grouping, row.key),
                    y: row.value,
                })
                .collect();
            vec![Series {
                label: aggregated.field.display_name().to_string(),
                points: sorted(points),
            }]
        }
    }
}

/// Series a resampled bucket belongs to. Weekly buckets follow the ISO
/// year, like calendar week grouping.
fn bucket_year(grouping: Grouping, start: NaiveDate) -> i32 {
    match grouping {
        Grouping::Resample(Bucket::Week) => start.iso_week().year(),
        _ => start.year(),
    }
}

/// [`project`] plus axis titles.
pub fn bundle(aggregated: &AggregatedSeries, split_by: SplitBy) -> SeriesBundle {
    SeriesBundle {
        x_label: x_label(aggregated.grouping, split_by).to_string(),
        y_label: aggregated.field.display_name().to_string(),
        series: project(aggregated, split_by),
    }
}

fn x_label(grouping: Grouping, split_by: SplitBy) -> &'static str {
    match (grouping, split_by) {
        (Grouping::Calendar(GroupKeys::Year), _) => "Year",
        (Grouping::Calendar(GroupKeys::YearMonth), SplitBy::Year) => "Month",
        (Grouping::Calendar(GroupKeys::YearWeek), SplitBy::Year) => "Week",
        _ => "Date",
    }
}

/// Place a calendar key on a continuous timeline: month keys at the 1st,
/// week keys at the Monday of the ISO week.
fn timeline_x(grouping: Grouping, key: GroupKey) -> XValue {
    match key {
        GroupKey::Bucket(date) => XValue::Date(date),
        GroupKey::Calendar { year, period: None } => XValue::Year(year),
        GroupKey::Calendar { year, period: Some(p) } => {
            let date = match grouping {
                Grouping::Calendar(GroupKeys::YearWeek) => {
                    NaiveDate::from_isoywd_opt(year, p, Weekday::Mon)
                }
                _ => NaiveDate::from_ymd_opt(year, p, 1),
            };
            date.map(XValue::Date).unwrap_or(XValue::Period(p))
        }
    }
}

fn sorted(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.x.cmp(&b.x));
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, Observation, ValueField};
    use crate::transform::aggregate::{aggregate, resample, Bucket, Reducer};
    use crate::transform::period::tag;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset(rows: &[(NaiveDate, f64)]) -> Dataset {
        tag(rows
            .iter()
            .map(|&(date, v)| Observation {
                date,
                measurement: Some(v),
                units: None,
                aqi: None,
                source_label: date.year().to_string(),
            })
            .collect())
    }

    #[test]
    fn test_split_by_year_month() {
        let ds = dataset(&[
            (ymd(2020, 2, 1), 4.0),
            (ymd(2019, 2, 1), 9.0),
            (ymd(2019, 1, 1), 5.0),
            (ymd(2019, 1, 8), 7.0),
            (ymd(2020, 1, 3), 2.0),
        ]);
        let agg = aggregate(&ds, GroupKeys::YearMonth, ValueField::Measurement, Reducer::Mean);
        let series = project(&agg, SplitBy::Year);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "2019");
        assert_eq!(
            series[0].points,
            vec![
                Point { x: XValue::Period(1), y: 6.0 },
                Point { x: XValue::Period(2), y: 9.0 }
            ]
        );
        assert_eq!(series[1].label, "2020");
        assert_eq!(series[1].points[0], Point { x: XValue::Period(1), y: 2.0 });
    }

    #[test]
    fn test_single_timeline() {
        let ds = dataset(&[(ymd(2019, 2, 1), 9.0), (ymd(2019, 1, 1), 5.0)]);
        let agg = aggregate(&ds, GroupKeys::YearMonth, ValueField::Measurement, Reducer::Mean);
        let b = bundle(&agg, SplitBy::None);

        assert_eq!(b.x_label, "Date");
        assert_eq!(b.y_label, "Daily Mean");
        assert_eq!(b.series.len(), 1);
        assert_eq!(b.series[0].label, "Daily Mean");
        assert_eq!(b.series[0].points[0].x, XValue::Date(ymd(2019, 1, 1)));
    }

    #[test]
    fn test_week_keys_on_timeline() {
        let ds = dataset(&[(ymd(2024, 12, 31), 1.0)]);
        let agg = aggregate(&ds, GroupKeys::YearWeek, ValueField::Measurement, Reducer::Sum);
        let series = project(&agg, SplitBy::None);
        assert_eq!(series[0].points[0].x, XValue::Date(ymd(2024, 12, 30)));
    }

    #[test]
    fn test_resampled_split_by_year() {
        let ds = dataset(&[(ymd(2019, 12, 31), 1.0), (ymd(2020, 1, 6), 3.0)]);
        let agg = resample(&ds, Bucket::Week, ValueField::Measurement, Reducer::Mean);
        let b = bundle(&agg, SplitBy::Year);

        // the week of 2019-12-30 is ISO week 1 of 2020
        assert_eq!(b.x_label, "Date");
        assert_eq!(b.series.len(), 1);
        assert_eq!(b.series[0].label, "2020");
        assert_eq!(b.series[0].points[0].x, XValue::Date(ymd(2019, 12, 30)));
        assert_eq!(b.series[0].points.len(), 2);

        let monthly = resample(&ds, Bucket::Month, ValueField::Measurement, Reducer::Mean);
        let labels: Vec<_> = project(&monthly, SplitBy::Year)
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["2019", "2020"]);
    }

    #[test]
    fn test_point_json_shape() {
        let p = Point { x: XValue::Date(ymd(2019, 1, 1)), y: 6.0 };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["x"], "2019-01-01");
        assert_eq!(json["y"], 6.0);
    }
}
