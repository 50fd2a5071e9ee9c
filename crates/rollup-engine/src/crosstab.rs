//! Cross-tab (pivot) rollup.
//!
//! One group field is pivoted into columns; the remaining group fields form the row key. Cells,
//! row totals, column totals and the grand total all come from merged accumulators, so every
//! total is finalized with the configured aggregation rather than summed.

use crate::aggregate::Accumulator;
use crate::columns;
use crate::horizontal::{group_key, ratio_of, GroupKeyPart};
use rollup_model::{
    Aggregation, FieldRef, Purpose, Record, ResultRow, RowKind, StatisticConfig, StatisticOutput,
};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug)]
struct PivotRow {
    records: usize,
    cells: BTreeMap<GroupKeyPart, Vec<Accumulator>>,
    total: Vec<Accumulator>,
}

fn merge_into(target: &mut [Accumulator], record: &Record, fields: &[FieldRef]) {
    for (acc, field) in target.iter_mut().zip(fields) {
        acc.update_value(record.value(&field.field_id));
    }
}

fn finalize(accs: &[Accumulator], f: usize, method: Aggregation) -> Option<f64> {
    accs.get(f).and_then(|acc| acc.finalize(method))
}

/// Labels for the pivot columns in key order.
///
/// Distinct key parts that render alike (`1` and `"1"`) get a ` (n)` suffix from the second one
/// on, so every column keeps its own cells.
fn column_labels<'a>(
    parts: impl IntoIterator<Item = &'a GroupKeyPart>,
) -> Vec<(GroupKeyPart, String)> {
    let mut used: HashSet<String> = HashSet::new();
    parts
        .into_iter()
        .map(|part| {
            let base = part.display_string();
            let mut label = base.clone();
            let mut n = 1;
            while !used.insert(label.clone()) {
                n += 1;
                label = format!("{base} ({n})");
            }
            (part.clone(), label)
        })
        .collect()
}

/// Runs a cross-tab rollup pivoting `pivot_field` over already-filtered records.
///
/// Callers guarantee `pivot_field` is one of at least two group fields.
pub(crate) fn rollup(
    records: &[Record],
    config: &StatisticConfig,
    pivot_field: &str,
) -> StatisticOutput {
    let fields = &config.statistic_fields;
    let method = config.aggregation;
    let row_ids: Vec<&str> = config
        .group_fields
        .iter()
        .map(|f| f.field_id.as_str())
        .filter(|id| *id != pivot_field)
        .collect();

    let mut rows: BTreeMap<Vec<GroupKeyPart>, PivotRow> = BTreeMap::new();
    let mut column_totals: BTreeMap<GroupKeyPart, Vec<Accumulator>> = BTreeMap::new();
    let mut grand = vec![Accumulator::new(); fields.len()];
    let mut record_count = 0usize;

    for record in records {
        let row_key = group_key(record, row_ids.iter().copied());
        let column = GroupKeyPart::from_value(record.value(pivot_field));
        let row = rows.entry(row_key).or_insert_with(|| PivotRow {
            records: 0,
            cells: BTreeMap::new(),
            total: vec![Accumulator::new(); fields.len()],
        });
        row.records += 1;
        record_count += 1;

        let cell = row
            .cells
            .entry(column.clone())
            .or_insert_with(|| vec![Accumulator::new(); fields.len()]);
        merge_into(cell, record, fields);
        merge_into(&mut row.total, record, fields);
        let column_total = column_totals
            .entry(column)
            .or_insert_with(|| vec![Accumulator::new(); fields.len()]);
        merge_into(column_total, record, fields);
        merge_into(&mut grand, record, fields);
    }
    if rows.is_empty() {
        return StatisticOutput::empty();
    }

    let pivot_columns = column_labels(column_totals.keys());
    log::debug!(
        "cross-tab over {} rows and {} {pivot_field:?} columns",
        rows.len(),
        pivot_columns.len()
    );

    let share = config.purpose == Purpose::ShareAnalysis;
    let grand_values: Vec<Option<f64>> = (0..fields.len())
        .map(|f| finalize(&grand, f, method))
        .collect();
    let share_of = |value: Option<f64>, f: usize| -> Option<f64> {
        ratio_of(value?, grand_values[f]?)
    };

    let mut data = Vec::with_capacity(rows.len() + 1);
    for (key, pivot_row) in &rows {
        let mut row = ResultRow::new(RowKind::Data);
        for (id, part) in row_ids.iter().zip(key) {
            row.set(*id, part.to_value());
        }
        row.set(columns::RECORD_COUNT, pivot_row.records);
        for (f, field) in fields.iter().enumerate() {
            let id = field.field_id.as_str();
            for (part, label) in &pivot_columns {
                let value = pivot_row
                    .cells
                    .get(part)
                    .and_then(|accs| finalize(accs, f, method));
                row.set(columns::cell(id, label), value);
                if share {
                    row.set(columns::cell_share(id, label), share_of(value, f));
                }
            }
            let total = finalize(&pivot_row.total, f, method);
            row.set(columns::row_total(id), total);
            if share {
                row.set(columns::share(id), share_of(total, f));
            }
        }
        data.push(row);
    }

    let mut total_row = ResultRow::new(RowKind::GrandTotal);
    if let Some(first) = row_ids.first() {
        total_row.set(*first, columns::TOTAL);
    }
    total_row.set(columns::RECORD_COUNT, record_count);
    for (f, field) in fields.iter().enumerate() {
        let id = field.field_id.as_str();
        for (part, label) in &pivot_columns {
            let value = column_totals
                .get(part)
                .and_then(|accs| finalize(accs, f, method));
            total_row.set(columns::cell(id, label), value);
            if share {
                total_row.set(columns::cell_share(id, label), share_of(value, f));
            }
        }
        total_row.set(columns::row_total(id), grand_values[f]);
        if share {
            total_row.set(columns::share(id), share_of(grand_values[f], f));
        }
    }
    data.push(total_row);

    StatisticOutput {
        data,
        data_range: None,
        pivot_columns: pivot_columns.into_iter().map(|(_, label)| label).collect(),
    }
}
