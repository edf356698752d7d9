//! Transformation module.
//!
//! Everything after loading:
//! - Clean: typed, date-complete observations
//! - Period: year / month / ISO week tagging
//! - Aggregate: calendar grouping and resampling
//! - Select: (x, y) series for charts
//! - Pipeline: the whole chain over one or more sources

pub mod aggregate;
pub mod clean;
pub mod period;
pub mod pipeline;
pub mod select;

pub use aggregate::{
    aggregate, aggregate_by, resample, AggregatedRow, AggregatedSeries, Bucket, GroupKey, GroupKeys,
    Grouping, Reducer,
};
pub use clean::{clean, clean_with, CleanOptions, CleanReport, CleanedTable};
pub use period::tag;
pub use pipeline::*;
pub use select::{bundle, project, Point, Series, SeriesBundle, SplitBy, XValue};
