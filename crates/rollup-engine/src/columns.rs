//! Result column names.
//!
//! Metric columns are keyed by the statistic field id; consumers reading persisted reports rely
//! on these names staying stable.

use rollup_model::ComparisonKind;

pub const PERIOD: &str = "period";
pub const PERIOD_NAME: &str = "periodName";
pub const RECORD_COUNT: &str = "recordCount";
pub const IS_COMPLETE: &str = "isComplete";
pub const RANK: &str = "rank";

/// `period` value of the vertical summary row.
pub const SUMMARY_PERIOD: &str = "SUMMARY";
/// `periodName` value of the vertical summary row.
pub const SUMMARY_PERIOD_NAME: &str = "汇总";

/// Group value shown for blank group fields.
pub const EMPTY_GROUP: &str = "(empty)";
pub const OTHERS: &str = "(others)";
pub const SUBTOTAL: &str = "(subtotal)";
pub const TOTAL: &str = "(total)";

pub fn count(field: &str) -> String {
    format!("{field}_count")
}

pub fn cumulative(field: &str) -> String {
    format!("{field}_cumulative")
}

pub fn sequential_ratio(field: &str) -> String {
    format!("{field}_ratio")
}

pub fn sequential_delta(field: &str) -> String {
    format!("{field}_delta")
}

pub fn comparison_ratio(field: &str, kind: ComparisonKind) -> String {
    format!("{field}_{}_ratio", kind.column_tag())
}

pub fn comparison_delta(field: &str, kind: ComparisonKind) -> String {
    format!("{field}_{}_delta", kind.column_tag())
}

pub fn share(field: &str) -> String {
    format!("{field}_share")
}

pub fn cumulative_share(field: &str) -> String {
    format!("{field}_cumulativeShare")
}

/// Cross-tab cell, e.g. `amount[East]`.
pub fn cell(field: &str, column: &str) -> String {
    format!("{field}[{column}]")
}

pub fn cell_share(field: &str, column: &str) -> String {
    format!("{field}[{column}]_share")
}

/// Cross-tab row total.
pub fn row_total(field: &str) -> String {
    format!("{field}_total")
}
