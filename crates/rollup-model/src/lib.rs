//! Canonical schema for statistic reports.
//!
//! This crate holds the serialization-friendly types shared by the record store, the statistics
//! wizard and the rollup engine: record values, the statistic configuration, and the result rows
//! a report produces. It performs no computation beyond value coercion.

mod config;
mod output;
mod source;
mod value;

pub use config::{
    Aggregation, ComparisonKind, ConditionKind, Direction, FieldRef, FilterCondition, Granularity,
    Purpose, RangeOperator, SortOrder, StatisticConfig, ValueType, WeekNumbering,
};
pub use output::{DataRange, ResultRow, RowKind, StatisticOutput, ROW_KIND_FIELD};
pub use source::DataSource;
pub use value::{format_number, FieldValue, Record};
