//! Record filtering applied before any rollup.

use rollup_model::{ConditionKind, FieldValue, FilterCondition, Record};

/// Keeps the records that satisfy every condition (logical AND).
///
/// An empty condition list keeps everything.
pub fn apply(records: &[Record], conditions: &[FilterCondition]) -> Vec<Record> {
    if conditions.is_empty() {
        return records.to_vec();
    }
    let kept: Vec<Record> = records
        .iter()
        .filter(|record| conditions.iter().all(|c| matches(record, c)))
        .cloned()
        .collect();
    log::debug!(
        "filters kept {} of {} records",
        kept.len(),
        records.len()
    );
    kept
}

/// Whether `record` satisfies a single condition.
pub fn matches(record: &Record, condition: &FilterCondition) -> bool {
    let value = record.value(&condition.field_id);
    match &condition.kind {
        ConditionKind::Specified { values } => {
            if values.contains(&value.to_text()) {
                return true;
            }
            // `3` and "3.0" name the same number.
            match value {
                FieldValue::Number(n) => values
                    .iter()
                    .filter_map(|v| v.trim().parse::<f64>().ok())
                    .any(|v| v == *n),
                _ => false,
            }
        }
        ConditionKind::Range {
            operator,
            threshold,
        } => value
            .as_number()
            .is_some_and(|n| operator.holds(n, *threshold)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_model::RangeOperator;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("region", "East").with("amount", 120.0),
            Record::new().with("region", "West").with("amount", 80.0),
            Record::new().with("region", "East").with("amount", "n/a"),
            Record::new().with("amount", 10.0),
        ]
    }

    #[test]
    fn conditions_combine_with_and() {
        let conditions = [
            FilterCondition::specified("region", ["East"]),
            FilterCondition::range("amount", RangeOperator::Gt, 100.0),
        ];
        let kept = apply(&records(), &conditions);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value("amount"), &FieldValue::from(120.0));
    }

    #[test]
    fn no_conditions_keeps_everything() {
        assert_eq!(apply(&records(), &[]).len(), 4);
    }

    #[test]
    fn range_rejects_missing_and_non_numeric_values() {
        let kept = apply(
            &records(),
            &[FilterCondition::range("amount", RangeOperator::Ne, 80.0)],
        );
        assert_eq!(kept.len(), 2);
        let kept = apply(
            &records(),
            &[FilterCondition::range("missing", RangeOperator::Ge, 0.0)],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn specified_numbers_compare_numerically() {
        let record = Record::new().with("qty", 3.0);
        assert!(matches(&record, &FilterCondition::specified("qty", ["3"])));
        assert!(matches(&record, &FilterCondition::specified("qty", ["3.0"])));
        assert!(!matches(&record, &FilterCondition::specified("qty", ["4"])));
    }

    #[test]
    fn empty_specified_set_matches_nothing() {
        let condition = FilterCondition::specified("region", Vec::<String>::new());
        assert!(apply(&records(), &[condition]).is_empty());
    }

    #[test]
    fn blank_matches_empty_string_member() {
        let condition = FilterCondition::specified("region", [""]);
        let kept = apply(&records(), &[condition]);
        assert_eq!(kept.len(), 1);
    }
}
