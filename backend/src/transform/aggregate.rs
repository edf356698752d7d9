//! Aggregator: group records by calendar key and reduce one value field.
//!
//! Two modes share one reduction step:
//!
//! - **Calendar grouping** compares calendar positions across years:
//!   keys are `(year)`, `(year, month)` or `(ISO year, ISO week)`.
//! - **Resampling** smooths one continuous timeline: keys are bucket
//!   start dates (the day, the Monday of the ISO week, the 1st of the month).
//!
//! A group with no values is dropped, never reported as zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::period::{month_start, week_start};
use crate::models::{Dataset, Record, ValueField};

/// Calendar key sets for cross-year grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKeys {
    Year,
    YearMonth,
    YearWeek,
}

/// Resampling bucket for a single timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    Week,
    Month,
}

impl Bucket {
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => date,
            Bucket::Week => week_start(date),
            Bucket::Month => month_start(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Sum,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Mean => f.write_str("mean"),
            Reducer::Sum => f.write_str("sum"),
        }
    }
}

/// How records are keyed before reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "by", rename_all = "kebab-case")]
pub enum Grouping {
    /// Daily values, no coarsening.
    None,
    Calendar(GroupKeys),
    Resample(Bucket),
}

impl Default for Grouping {
    fn default() -> Self {
        Grouping::Calendar(GroupKeys::YearMonth)
    }
}

/// Key of one aggregated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    /// `period` is the month or ISO week; `None` when grouping by year only.
    Calendar { year: i32, period: Option<u32> },
    Bucket(NaiveDate),
}

impl GroupKey {
    fn calendar(keys: GroupKeys, record: &Record) -> Self {
        match keys {
            GroupKeys::Year => GroupKey::Calendar { year: record.year, period: None },
            GroupKeys::YearMonth => GroupKey::Calendar {
                year: record.year,
                period: Some(record.month),
            },
            GroupKeys::YearWeek => GroupKey::Calendar {
                year: record.iso_year,
                period: Some(record.week),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub key: GroupKey,
    pub value: f64,
    /// Records that contributed a value.
    pub count: usize,
}

/// Result of one aggregation. Never mutated; [`AggregatedSeries::sorted`] returns a copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSeries {
    pub field: ValueField,
    pub reducer: Reducer,
    pub grouping: Grouping,
    rows: Vec<AggregatedRow>,
}

impl AggregatedSeries {
    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<f64> {
        self.rows.iter().find(|r| &r.key == key).map(|r| r.value)
    }

    /// Copy with rows ordered by key, as chronological plots need.
    pub fn sorted(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Self { rows, ..self.clone() }
    }
}

/// Accumulates one group while scanning.
struct GroupAccumulator {
    key: GroupKey,
    sum: f64,
    count: usize,
}

impl GroupAccumulator {
    fn new(key: GroupKey) -> Self {
        Self { key, sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn build(self, reducer: Reducer) -> Option<AggregatedRow> {
        if self.count == 0 {
            return None;
        }
        let value = match reducer {
            Reducer::Mean => self.sum / self.count as f64,
            Reducer::Sum => self.sum,
        };
        Some(AggregatedRow {
            key: self.key,
            value,
            count: self.count,
        })
    }
}

fn reduce_by<F>(
    dataset: &Dataset,
    field: ValueField,
    reducer: Reducer,
    key_of: F,
) -> Vec<AggregatedRow>
where
    F: Fn(&Record) -> GroupKey,
{
    let mut groups: Vec<GroupAccumulator> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for record in dataset.records() {
        let key = key_of(record);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(GroupAccumulator::new(key));
            groups.len() - 1
        });
        groups[slot].add(field.value_of(record));
    }

    groups
        .into_iter()
        .filter_map(|g| g.build(reducer))
        .collect()
}

/// Group by calendar position. Rows come in first-occurrence order.
pub fn aggregate(
    dataset: &Dataset,
    keys: GroupKeys,
    field: ValueField,
    reducer: Reducer,
) -> AggregatedSeries {
    AggregatedSeries {
        field,
        reducer,
        grouping: Grouping::Calendar(keys),
        rows: reduce_by(dataset, field, reducer, |r| GroupKey::calendar(keys, r)),
    }
}

/// Resample into bucket-start keys. Rows are always chronological.
pub fn resample(
    dataset: &Dataset,
    bucket: Bucket,
    field: ValueField,
    reducer: Reducer,
) -> AggregatedSeries {
    let series = AggregatedSeries {
        field,
        reducer,
        grouping: Grouping::Resample(bucket),
        rows: reduce_by(dataset, field, reducer, |r| GroupKey::Bucket(bucket.start_of(r.date))),
    };
    series.sorted()
}

/// Dispatch on a [`Grouping`].
pub fn aggregate_by(
    dataset: &Dataset,
    grouping: Grouping,
    field: ValueField,
    reducer: Reducer,
) -> AggregatedSeries {
    match grouping {
        Grouping::None => AggregatedSeries {
            grouping: Grouping::None,
            ..resample(dataset, Bucket::Day, field, reducer)
        },
        Grouping::Calendar(keys) => aggregate(dataset, keys, field, reducer),
        Grouping::Resample(bucket) => resample(dataset, bucket, field, reducer),
    }
}
