use thiserror::Error;

/// A statistic configuration that violates the structural requirements of its direction.
///
/// These are programmer/configuration errors and fail the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("vertical statistic requires a time field")]
    MissingTimeField,
    #[error("vertical statistic requires a time granularity")]
    MissingGranularity,
    #[error("horizontal statistic requires at least one group field")]
    NoGroupFields,
    #[error("statistic must have at least one statistic field")]
    NoStatisticFields,
    #[error("top-N must be at least 1")]
    InvalidTopN,
    #[error("sort field {0} is neither a statistic field nor a group field")]
    UnknownSortField(String),
    #[error("duplicate statistic field: {0}")]
    DuplicateStatisticField(String),
}

#[derive(Debug, Error)]
pub enum RollupError {
    #[error("invalid statistic config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to load records from {source_id}: {message}")]
    Source { source_id: String, message: String },
}

pub type RollupResult<T> = Result<T, RollupError>;
