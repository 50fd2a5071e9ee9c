//! Statistic configuration schema.
//!
//! A [`StatisticConfig`] is produced by the statistics wizard and stored alongside the report.
//! It is serialization-friendly (camelCase JSON) and tolerant of missing optional keys.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Report orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Time-series rollup over a date field.
    #[default]
    Vertical,
    /// Grouping rollup over one or more group fields (optionally pivoted).
    Horizontal,
}

/// Time bucket size.
///
/// `Year`/`Quarter`/`Month`/`Decad` form the month-based calendar, `Week` the week-based one;
/// `Day` and below are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Granularity {
    Year,
    Quarter,
    Month,
    /// Ten-day window of a month ("旬"): days 1-10, 11-20, 21-end.
    Decad,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Granularity {
    pub const ALL: [Granularity; 9] = [
        Granularity::Year,
        Granularity::Quarter,
        Granularity::Month,
        Granularity::Decad,
        Granularity::Week,
        Granularity::Day,
        Granularity::Hour,
        Granularity::Minute,
        Granularity::Second,
    ];

    /// Comparison kinds that are meaningful for this granularity.
    pub fn supported_comparisons(self) -> &'static [ComparisonKind] {
        use ComparisonKind::*;
        match self {
            Granularity::Year => &[],
            Granularity::Quarter => &[YearOverYear],
            Granularity::Month => &[QuarterOverQuarter, YearOverYear],
            Granularity::Decad => &[MonthOverMonth, QuarterOverQuarter, YearOverYear],
            Granularity::Week => &[MonthOverMonth, YearOverYear],
            Granularity::Day => &[
                WeekOverWeek,
                DecadOverDecad,
                MonthOverMonth,
                QuarterOverQuarter,
                YearOverYear,
            ],
            Granularity::Hour => &[DayOverDay, WeekOverWeek, MonthOverMonth, YearOverYear],
            Granularity::Minute => &[HourOverHour, DayOverDay, MonthOverMonth, YearOverYear],
            Granularity::Second => &[
                MinuteOverMinute,
                HourOverHour,
                DayOverDay,
                MonthOverMonth,
                YearOverYear,
            ],
        }
    }

    pub fn supports(self, kind: ComparisonKind) -> bool {
        self.supported_comparisons().contains(&kind)
    }
}

/// "同比"-style comparison: the analogous bucket one calendar level up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonKind {
    YearOverYear,
    QuarterOverQuarter,
    MonthOverMonth,
    DecadOverDecad,
    WeekOverWeek,
    DayOverDay,
    HourOverHour,
    MinuteOverMinute,
}

impl ComparisonKind {
    /// Tag used in result column names, e.g. `amount_yearOverYear_ratio`.
    pub fn column_tag(self) -> &'static str {
        match self {
            ComparisonKind::YearOverYear => "yearOverYear",
            ComparisonKind::QuarterOverQuarter => "quarterOverQuarter",
            ComparisonKind::MonthOverMonth => "monthOverMonth",
            ComparisonKind::DecadOverDecad => "decadOverDecad",
            ComparisonKind::WeekOverWeek => "weekOverWeek",
            ComparisonKind::DayOverDay => "dayOverDay",
            ComparisonKind::HourOverHour => "hourOverHour",
            ComparisonKind::MinuteOverMinute => "minuteOverMinute",
        }
    }
}

/// Aggregation applied to each statistic field within a bucket or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    #[default]
    Sum,
    Avg,
    Count,
    Max,
    Min,
}

impl Aggregation {
    /// Resolves an aggregation name case-insensitively.
    ///
    /// Unknown names fall back to [`Aggregation::Sum`]; this is not an error.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "sum" => Aggregation::Sum,
            "avg" | "average" | "mean" => Aggregation::Avg,
            "count" => Aggregation::Count,
            "max" => Aggregation::Max,
            "min" => Aggregation::Min,
            other => {
                log::warn!("unknown aggregation {other:?}, falling back to sum");
                Aggregation::Sum
            }
        }
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Aggregation::from_name(&name))
    }
}

/// Derived series requested for a vertical rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    Absolute,
    Cumulative,
    /// "环比": change against the immediately preceding bucket.
    SequentialDelta,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[serde(alias = "ascending")]
    Asc,
    #[default]
    #[serde(alias = "descending")]
    Desc,
}

/// What the report is for; drives optional derived metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Purpose {
    #[default]
    General,
    /// Adds share-of-total and cumulative-share columns.
    ShareAnalysis,
}

/// Week numbering scheme for [`Granularity::Week`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeekNumbering {
    /// Thursday-anchored count from January 1 of the Thursday's year, rolling week 1 back to
    /// week 52. Matches reports produced by earlier releases; not strict ISO-8601.
    #[default]
    Legacy,
    /// ISO-8601 week dates, including 53-week years.
    Iso,
}

/// A field reference as picked in the wizard: id plus the caption shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub field_id: String,
    #[serde(default)]
    pub field_name: String,
}

impl FieldRef {
    pub fn new(field_id: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            field_name: field_name.into(),
        }
    }
}

/// Comparison operator for range conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeOperator {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl RangeOperator {
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            RangeOperator::Eq => lhs == rhs,
            RangeOperator::Ne => lhs != rhs,
            RangeOperator::Gt => lhs > rhs,
            RangeOperator::Ge => lhs >= rhs,
            RangeOperator::Lt => lhs < rhs,
            RangeOperator::Le => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConditionKind {
    /// The field's text form must be one of `values`.
    Specified { values: BTreeSet<String> },
    /// The field's numeric form must satisfy `operator threshold`.
    Range {
        operator: RangeOperator,
        threshold: f64,
    },
}

/// A single per-field filter; conditions in a config combine with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    pub field_id: String,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl FilterCondition {
    pub fn specified<I, S>(field_id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_id: field_id.into(),
            kind: ConditionKind::Specified {
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn range(field_id: impl Into<String>, operator: RangeOperator, threshold: f64) -> Self {
        Self {
            field_id: field_id.into(),
            kind: ConditionKind::Range {
                operator,
                threshold,
            },
        }
    }
}

/// Full description of one statistic report.
///
/// Vertical reports require `time_field_id` and `time_granularity`; horizontal (and cross-tab)
/// reports require at least one group field. The engine validates this before computing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticConfig {
    pub direction: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_field_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_granularity: Option<Granularity>,
    pub statistic_fields: Vec<FieldRef>,
    pub aggregation: Aggregation,
    pub value_types: BTreeSet<ValueType>,
    pub compare_types: BTreeSet<ComparisonKind>,
    /// Ordered; the first entry is the primary grouping level.
    pub group_fields: Vec<FieldRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<usize>,
    pub show_subtotal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_table_field: Option<String>,
    pub purpose: Purpose,
    pub week_numbering: WeekNumbering,
    pub filters: Vec<FilterCondition>,
}

impl Default for StatisticConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            time_field_id: None,
            time_granularity: None,
            statistic_fields: Vec::new(),
            aggregation: Aggregation::default(),
            value_types: BTreeSet::from([ValueType::Absolute]),
            compare_types: BTreeSet::new(),
            group_fields: Vec::new(),
            sort_by: None,
            sort_order: SortOrder::default(),
            top_n: None,
            show_subtotal: false,
            cross_table_field: None,
            purpose: Purpose::default(),
            week_numbering: WeekNumbering::default(),
            filters: Vec::new(),
        }
    }
}

impl StatisticConfig {
    /// Time-series report over `time_field_id` bucketed by `granularity`.
    pub fn vertical(time_field_id: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            direction: Direction::Vertical,
            time_field_id: Some(time_field_id.into()),
            time_granularity: Some(granularity),
            ..Self::default()
        }
    }

    /// Grouping report over the given group field ids (captions default to the ids).
    pub fn horizontal<I, S>(group_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            direction: Direction::Horizontal,
            group_fields: group_fields
                .into_iter()
                .map(|id| {
                    let id = id.into();
                    FieldRef::new(id.clone(), id)
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_statistic(mut self, field_id: impl Into<String>, field_name: impl Into<String>) -> Self {
        self.statistic_fields.push(FieldRef::new(field_id, field_name));
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_value_types(mut self, value_types: impl IntoIterator<Item = ValueType>) -> Self {
        self.value_types = value_types.into_iter().collect();
        self
    }

    pub fn with_compare_types(mut self, kinds: impl IntoIterator<Item = ComparisonKind>) -> Self {
        self.compare_types = kinds.into_iter().collect();
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = order;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    pub fn with_subtotal(mut self, show_subtotal: bool) -> Self {
        self.show_subtotal = show_subtotal;
        self
    }

    pub fn with_cross_table(mut self, field_id: impl Into<String>) -> Self {
        self.cross_table_field = Some(field_id.into());
        self
    }

    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn with_week_numbering(mut self, numbering: WeekNumbering) -> Self {
        self.week_numbering = numbering;
        self
    }

    pub fn with_filter(mut self, condition: FilterCondition) -> Self {
        self.filters.push(condition);
        self
    }

    /// Whether `field_id` names one of the configured group fields.
    pub fn is_group_field(&self, field_id: &str) -> bool {
        self.group_fields.iter().any(|f| f.field_id == field_id)
    }

    /// Whether `field_id` names one of the configured statistic fields.
    pub fn is_statistic_field(&self, field_id: &str) -> bool {
        self.statistic_fields.iter().any(|f| f.field_id == field_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn comparison_matrix_matches_granularity_levels() {
        assert!(Granularity::Year.supported_comparisons().is_empty());
        assert!(Granularity::Quarter.supports(ComparisonKind::YearOverYear));
        assert!(!Granularity::Quarter.supports(ComparisonKind::QuarterOverQuarter));
        assert!(Granularity::Decad.supports(ComparisonKind::MonthOverMonth));
        assert!(!Granularity::Week.supports(ComparisonKind::QuarterOverQuarter));
        assert!(Granularity::Day.supports(ComparisonKind::DecadOverDecad));
        assert!(!Granularity::Hour.supports(ComparisonKind::HourOverHour));
        assert!(Granularity::Second.supports(ComparisonKind::MinuteOverMinute));
    }

    #[test]
    fn deserializes_wizard_payload() {
        let json = serde_json::json!({
            "direction": "vertical",
            "timeFieldId": "createdAt",
            "timeGranularity": "month",
            "statisticFields": [{"fieldId": "amount", "fieldName": "Amount"}],
            "aggregation": "AVG",
            "valueTypes": ["absolute", "sequentialDelta"],
            "compareTypes": ["quarterOverQuarter"],
            "sortOrder": "ascending",
            "filters": [
                {"fieldId": "region", "kind": "specified", "values": ["East", "West"]},
                {"fieldId": "amount", "kind": "range", "operator": ">=", "threshold": 10}
            ]
        });
        let cfg: StatisticConfig = serde_json::from_value(json).unwrap();

        assert_eq!(cfg.direction, Direction::Vertical);
        assert_eq!(cfg.time_granularity, Some(Granularity::Month));
        assert_eq!(cfg.aggregation, Aggregation::Avg);
        assert_eq!(
            cfg.value_types,
            BTreeSet::from([ValueType::Absolute, ValueType::SequentialDelta])
        );
        assert_eq!(cfg.sort_order, SortOrder::Asc);
        assert_eq!(
            cfg.filters,
            vec![
                FilterCondition::specified("region", ["East", "West"]),
                FilterCondition::range("amount", RangeOperator::Ge, 10.0),
            ]
        );
        assert!(!cfg.show_subtotal);
        assert_eq!(cfg.week_numbering, WeekNumbering::Legacy);
    }

    #[test]
    fn unknown_aggregation_falls_back_to_sum() {
        let cfg: StatisticConfig =
            serde_json::from_value(serde_json::json!({"aggregation": "median"})).unwrap();
        assert_eq!(cfg.aggregation, Aggregation::Sum);
    }

    #[test]
    fn missing_value_types_defaults_to_absolute() {
        let cfg: StatisticConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.value_types, BTreeSet::from([ValueType::Absolute]));
        assert_eq!(cfg.sort_order, SortOrder::Desc);
    }

    #[test]
    fn range_operator_aliases() {
        let op: RangeOperator = serde_json::from_value(serde_json::json!("<>")).unwrap();
        assert_eq!(op, RangeOperator::Ne);
        assert!(RangeOperator::Le.holds(3.0, 3.0));
        assert!(!RangeOperator::Gt.holds(3.0, 3.0));
    }
}
