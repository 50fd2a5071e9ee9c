use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a report's records come from.
///
/// The engine treats every kind uniformly as a flat record sequence; the distinction only
/// matters to the record store that resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum DataSource {
    /// A raw form table.
    Form(String),
    /// A derived table whose computed fields were materialized upstream.
    VirtualTable(String),
    /// The stored output of another statistic report.
    Statistic(String),
}

impl DataSource {
    pub fn id(&self) -> &str {
        match self {
            DataSource::Form(id) | DataSource::VirtualTable(id) | DataSource::Statistic(id) => id,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Form(id) => write!(f, "form:{id}"),
            DataSource::VirtualTable(id) => write!(f, "virtual:{id}"),
            DataSource::Statistic(id) => write!(f, "statistic:{id}"),
        }
    }
}
