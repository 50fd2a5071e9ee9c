//! Record-source seam.
//!
//! The record store resolves a [`DataSource`] (form, virtual table or stored statistic) into a
//! flat record sequence; the engine never knows which kind it was handed.

use crate::error::{RollupError, RollupResult};
use chrono::NaiveDateTime;
use rollup_model::{DataSource, Record, StatisticConfig, StatisticOutput};
use std::collections::HashMap;
use std::hash::BuildHasher;

pub trait RecordSource {
    fn load(&self, source: &DataSource) -> RollupResult<Vec<Record>>;
}

impl<S: BuildHasher> RecordSource for HashMap<DataSource, Vec<Record>, S> {
    fn load(&self, source: &DataSource) -> RollupResult<Vec<Record>> {
        self.get(source).cloned().ok_or_else(|| RollupError::Source {
            source_id: source.to_string(),
            message: "no such data source".to_string(),
        })
    }
}

/// Loads the records of `data_source` and executes `config` over them.
pub fn run(
    source: &dyn RecordSource,
    data_source: &DataSource,
    config: &StatisticConfig,
    now: NaiveDateTime,
) -> RollupResult<StatisticOutput> {
    crate::validate(config)?;
    let records = source.load(data_source)?;
    log::debug!("loaded {} records from {data_source}", records.len());
    crate::execute(&records, config, now)
}
