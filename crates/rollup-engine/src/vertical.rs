//! Vertical (time-series) rollup.
//!
//! Records are bucketed by their time field, aggregated per bucket, and then extended with the
//! requested derived series: cumulative totals, sequential change ("环比") against the previous
//! bucket, and comparisons ("同比") against the analogous bucket one calendar level up.

use crate::aggregate::{aggregate, Accumulator};
use crate::calendar::{Calendar, PeriodKey};
use crate::columns;
use chrono::NaiveDateTime;
use rollup_model::{
    Aggregation, DataRange, FieldRef, Granularity, Record, ResultRow, RowKind, StatisticConfig,
    StatisticOutput, ValueType, WeekNumbering,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct Bucket {
    records: usize,
    accs: Vec<Accumulator>,
}

impl Bucket {
    fn new(fields: usize) -> Self {
        Self {
            records: 0,
            accs: vec![Accumulator::new(); fields],
        }
    }
}

/// Ratio and absolute change of `current` against `baseline`.
///
/// A missing baseline yields `(None, None)`. A zero baseline yields the signed unit ratio
/// (`+1` / `-1`) for a non-zero current value and no ratio when both are zero.
pub fn change(current: Option<f64>, baseline: Option<f64>) -> (Option<f64>, Option<f64>) {
    let (Some(current), Some(baseline)) = (current, baseline) else {
        return (None, None);
    };
    let delta = current - baseline;
    let ratio = if baseline != 0.0 {
        Some(delta / baseline.abs())
    } else if current > 0.0 {
        Some(1.0)
    } else if current < 0.0 {
        Some(-1.0)
    } else {
        None
    };
    (ratio, Some(delta))
}

/// Runs a vertical rollup over already-filtered records.
pub(crate) fn rollup(
    records: &[Record],
    config: &StatisticConfig,
    time_field: &str,
    granularity: Granularity,
    now: NaiveDateTime,
) -> StatisticOutput {
    let calendar = Calendar::new(config.week_numbering);
    let fields = &config.statistic_fields;

    let mut buckets: BTreeMap<PeriodKey, Bucket> = BTreeMap::new();
    let mut skipped = 0usize;
    for record in records {
        let Some(key) = calendar.bucket_key(record.value(time_field), granularity) else {
            skipped += 1;
            continue;
        };
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(fields.len()));
        bucket.records += 1;
        for (acc, field) in bucket.accs.iter_mut().zip(fields) {
            acc.update_value(record.value(&field.field_id));
        }
    }
    if skipped > 0 {
        log::debug!("skipped {skipped} records with no usable {time_field:?} value");
    }
    if buckets.is_empty() {
        return StatisticOutput::empty();
    }
    log::debug!("vertical rollup over {} {granularity:?} buckets", buckets.len());
    warn_on_legacy_week_boundaries(&calendar, buckets.keys());

    let keys: Vec<PeriodKey> = buckets.keys().copied().collect();
    let index: HashMap<PeriodKey, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    // values[field][bucket]
    let values: Vec<Vec<Option<f64>>> = (0..fields.len())
        .map(|f| {
            buckets
                .values()
                .map(|b| b.accs[f].finalize(config.aggregation))
                .collect()
        })
        .collect();
    let baseline = |f: usize, key: Option<PeriodKey>| -> Option<f64> {
        key.and_then(|k| index.get(&k)).and_then(|&j| values[f][j])
    };

    let wants = |t: ValueType| config.value_types.contains(&t);
    let mut running = vec![0.0; fields.len()];
    let mut rows = Vec::with_capacity(keys.len() + 1);
    let mut incomplete = 0usize;

    for (i, (key, bucket)) in buckets.iter().enumerate() {
        let complete = calendar.is_complete(key, now);
        if !complete {
            incomplete += 1;
        }
        let mut row = ResultRow::new(RowKind::Data);
        row.set(columns::PERIOD, key.to_string());
        row.set(columns::PERIOD_NAME, key.display_name());
        row.set(columns::RECORD_COUNT, bucket.records);
        row.set(columns::IS_COMPLETE, complete);

        for (f, field) in fields.iter().enumerate() {
            let id = field.field_id.as_str();
            let current = values[f][i];
            row.set(columns::count(id), bucket.accs[f].count() as f64);
            if wants(ValueType::Absolute) {
                row.set(id, current);
            }
            if wants(ValueType::Cumulative) {
                running[f] += current.unwrap_or(0.0);
                row.set(columns::cumulative(id), running[f]);
            }
            if wants(ValueType::SequentialDelta) {
                let (ratio, delta) = change(current, baseline(f, calendar.previous_period(key)));
                row.set(columns::sequential_ratio(id), ratio);
                row.set(columns::sequential_delta(id), delta);
            }
            for &kind in &config.compare_types {
                let (ratio, delta) =
                    change(current, baseline(f, calendar.compare_period(key, kind)));
                row.set(columns::comparison_ratio(id, kind), ratio);
                row.set(columns::comparison_delta(id, kind), delta);
            }
        }
        rows.push(row);
    }

    let summary = summary_row(config, fields, &buckets, &values, &running, &rows);
    let (first, last) = (keys[0], keys[keys.len() - 1]);
    rows.push(summary);

    StatisticOutput {
        data: rows,
        data_range: Some(DataRange {
            from: first.to_string(),
            to: last.to_string(),
            from_name: first.display_name(),
            to_name: last.display_name(),
            period_count: keys.len(),
            incomplete_count: incomplete,
            skipped_records: skipped,
        }),
        pivot_columns: Vec::new(),
    }
}

fn summary_row(
    config: &StatisticConfig,
    fields: &[FieldRef],
    buckets: &BTreeMap<PeriodKey, Bucket>,
    values: &[Vec<Option<f64>>],
    running: &[f64],
    data_rows: &[ResultRow],
) -> ResultRow {
    let mut row = ResultRow::new(RowKind::Summary);
    row.set(columns::PERIOD, columns::SUMMARY_PERIOD);
    row.set(columns::PERIOD_NAME, columns::SUMMARY_PERIOD_NAME);
    row.set(
        columns::RECORD_COUNT,
        buckets.values().map(|b| b.records).sum::<usize>(),
    );

    let mean_of = |column: &str| -> Option<f64> {
        let ratios: Vec<f64> = data_rows.iter().filter_map(|r| r.number(column)).collect();
        (!ratios.is_empty()).then(|| ratios.iter().sum::<f64>() / ratios.len() as f64)
    };

    for (f, field) in fields.iter().enumerate() {
        let id = field.field_id.as_str();
        let count: u64 = buckets.values().map(|b| b.accs[f].count()).sum();
        row.set(columns::count(id), count as f64);
        if config.value_types.contains(&ValueType::Absolute) {
            row.set(id, combine(&values[f], config.aggregation));
        }
        if config.value_types.contains(&ValueType::Cumulative) {
            row.set(columns::cumulative(id), running[f]);
        }
        if config.value_types.contains(&ValueType::SequentialDelta) {
            let ratio = columns::sequential_ratio(id);
            row.set(ratio.as_str(), mean_of(&ratio));
            row.set(columns::sequential_delta(id), None::<f64>);
        }
        for &kind in &config.compare_types {
            let ratio = columns::comparison_ratio(id, kind);
            row.set(ratio.as_str(), mean_of(&ratio));
            row.set(columns::comparison_delta(id, kind), None::<f64>);
        }
    }
    row
}

/// Combines per-bucket aggregates into the summary value for `method`.
///
/// Sum and Count add; Avg is the mean of the bucket means, where a bucket without numeric values
/// reads 0; Max and Min take the extreme bucket.
fn combine(values: &[Option<f64>], method: Aggregation) -> Option<f64> {
    let method = match method {
        Aggregation::Count => Aggregation::Sum,
        other => other,
    };
    aggregate(values.iter().copied(), method)
}

fn warn_on_legacy_week_boundaries<'a>(
    calendar: &Calendar,
    keys: impl Iterator<Item = &'a PeriodKey>,
) {
    if calendar.week_numbering() != WeekNumbering::Legacy {
        return;
    }
    for key in keys {
        if let PeriodKey::Week { year, week } = key {
            if *week == 1 || *week >= 52 {
                log::warn!(
                    "bucket {key} sits on a year boundary where legacy week numbering differs from ISO-8601 (year {year})"
                );
            }
        }
    }
}
