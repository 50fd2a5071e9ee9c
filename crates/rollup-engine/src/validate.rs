use crate::error::ConfigError;
use rollup_model::{Direction, StatisticConfig};
use std::collections::HashSet;

/// Checks the structural requirements of `config` for its direction.
pub fn validate(config: &StatisticConfig) -> Result<(), ConfigError> {
    if config.statistic_fields.is_empty() {
        return Err(ConfigError::NoStatisticFields);
    }
    let mut seen = HashSet::new();
    for field in &config.statistic_fields {
        if !seen.insert(field.field_id.as_str()) {
            return Err(ConfigError::DuplicateStatisticField(field.field_id.clone()));
        }
    }
    if config.top_n == Some(0) {
        return Err(ConfigError::InvalidTopN);
    }

    match config.direction {
        Direction::Vertical => {
            if config
                .time_field_id
                .as_deref()
                .map_or(true, |id| id.trim().is_empty())
            {
                return Err(ConfigError::MissingTimeField);
            }
            if config.time_granularity.is_none() {
                return Err(ConfigError::MissingGranularity);
            }
        }
        Direction::Horizontal => {
            if config.group_fields.is_empty() {
                return Err(ConfigError::NoGroupFields);
            }
            if let Some(sort_by) = config.sort_by.as_deref() {
                if !config.is_statistic_field(sort_by) && !config.is_group_field(sort_by) {
                    return Err(ConfigError::UnknownSortField(sort_by.to_string()));
                }
            }
        }
    }
    Ok(())
}
