//! Temporal rollup and comparative analytics.
//!
//! [`execute`] turns a flat record collection and a [`StatisticConfig`] into a report: either a
//! time-bucketed series (vertical) with cumulative, sequential and comparison metrics, or a
//! grouped table (horizontal) with Top-N compaction, subtotals, shares and an optional pivot.
//!
//! Every entry point is a pure function of its inputs. The evaluation time `now` is always
//! passed in explicitly.

#![forbid(unsafe_code)]

mod aggregate;
mod calendar;
pub mod columns;
mod crosstab;
mod error;
mod filter;
mod horizontal;
mod period;
mod source;
mod validate;
mod vertical;

pub use crate::aggregate::{aggregate, Accumulator};
pub use crate::calendar::{bucket_key, is_complete, week_of_year, Calendar, Decad, PeriodKey};
pub use crate::error::{ConfigError, RollupError, RollupResult};
pub use crate::filter::{apply as apply_filters, matches as matches_condition};
pub use crate::horizontal::GroupKeyPart;
pub use crate::source::{run, RecordSource};
pub use crate::validate::validate;
pub use crate::vertical::change;

pub use rollup_model::*;

use chrono::NaiveDateTime;

/// Runs one statistic over `records` as of `now`.
///
/// The config is validated first; filters apply before bucketing. A cross-table field that is
/// not one of at least two group fields falls back to a plain horizontal rollup.
pub fn execute(
    records: &[Record],
    config: &StatisticConfig,
    now: NaiveDateTime,
) -> RollupResult<StatisticOutput> {
    validate(config)?;
    let filtered = filter::apply(records, &config.filters);

    let output = match config.direction {
        Direction::Vertical => match (config.time_field_id.as_deref(), config.time_granularity) {
            (Some(time_field), Some(granularity)) => {
                vertical::rollup(&filtered, config, time_field, granularity, now)
            }
            (None, _) => return Err(ConfigError::MissingTimeField.into()),
            (_, None) => return Err(ConfigError::MissingGranularity.into()),
        },
        Direction::Horizontal => match config.cross_table_field.as_deref() {
            Some(pivot) if config.group_fields.len() >= 2 && config.is_group_field(pivot) => {
                crosstab::rollup(&filtered, config, pivot)
            }
            Some(pivot) => {
                log::warn!(
                    "cross-table field {pivot:?} needs to be one of at least two group fields; using a plain grouping"
                );
                horizontal::rollup(&filtered, config)
            }
            None => horizontal::rollup(&filtered, config),
        },
    };
    Ok(output)
}
