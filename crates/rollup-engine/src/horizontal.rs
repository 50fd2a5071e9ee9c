//! Horizontal (grouping) rollup.
//!
//! Records are grouped by the ordered group fields and aggregated per group. The group list is
//! then sorted, optionally compacted to the top N groups plus an "others" row, decorated with
//! share-of-total metrics and subtotals, and closed by a grand-total row computed over every
//! group.

use crate::aggregate::Accumulator;
use crate::columns;
use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use rollup_model::{
    FieldValue, Purpose, Record, ResultRow, RowKind, SortOrder, StatisticConfig, StatisticOutput,
};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One component of a group key.
///
/// Ordering is fixed across types: numbers, dates, text (case-insensitive), booleans, then
/// empty values last.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKeyPart {
    Empty,
    Number(OrderedFloat<f64>),
    Date(NaiveDateTime),
    Text(String),
    Bool(bool),
}

impl GroupKeyPart {
    /// Blank, whitespace-only and non-finite values all group as [`GroupKeyPart::Empty`].
    pub fn from_value(value: &FieldValue) -> Self {
        match value {
            FieldValue::Blank => GroupKeyPart::Empty,
            FieldValue::Number(n) if n.is_finite() => {
                // Fold -0.0 into 0.0.
                GroupKeyPart::Number(OrderedFloat(if *n == 0.0 { 0.0 } else { *n }))
            }
            FieldValue::Number(_) => GroupKeyPart::Empty,
            FieldValue::Text(s) if s.trim().is_empty() => GroupKeyPart::Empty,
            FieldValue::Text(s) => GroupKeyPart::Text(s.clone()),
            FieldValue::Date(d) => GroupKeyPart::Date(*d),
            FieldValue::Bool(b) => GroupKeyPart::Bool(*b),
        }
    }

    pub fn to_value(&self) -> FieldValue {
        match self {
            GroupKeyPart::Empty => FieldValue::from(columns::EMPTY_GROUP),
            GroupKeyPart::Number(n) => FieldValue::Number(n.0),
            GroupKeyPart::Date(d) => FieldValue::Date(*d),
            GroupKeyPart::Text(s) => FieldValue::Text(s.clone()),
            GroupKeyPart::Bool(b) => FieldValue::Bool(*b),
        }
    }

    pub fn display_string(&self) -> String {
        self.to_value().to_text()
    }

    fn kind_rank(&self) -> u8 {
        match self {
            GroupKeyPart::Number(_) => 0,
            GroupKeyPart::Date(_) => 1,
            GroupKeyPart::Text(_) => 2,
            GroupKeyPart::Bool(_) => 3,
            GroupKeyPart::Empty => 4,
        }
    }
}

impl PartialOrd for GroupKeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.kind_rank().cmp(&other.kind_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (GroupKeyPart::Number(a), GroupKeyPart::Number(b)) => a.cmp(b),
            (GroupKeyPart::Date(a), GroupKeyPart::Date(b)) => a.cmp(b),
            (GroupKeyPart::Text(a), GroupKeyPart::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (GroupKeyPart::Bool(a), GroupKeyPart::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Composite key over the ordered group fields of `record`.
pub(crate) fn group_key<'a, I>(record: &Record, field_ids: I) -> Vec<GroupKeyPart>
where
    I: IntoIterator<Item = &'a str>,
{
    field_ids
        .into_iter()
        .map(|id| GroupKeyPart::from_value(record.value(id)))
        .collect()
}

#[derive(Debug, Clone)]
struct Group {
    key: Vec<GroupKeyPart>,
    records: usize,
    /// 1-based position in the sorted order.
    rank: usize,
    accs: Vec<Accumulator>,
    /// Finalized aggregate per statistic field.
    values: Vec<Option<f64>>,
}

/// Additive totals over a set of groups.
#[derive(Debug, Clone)]
struct Totals {
    records: usize,
    counts: Vec<u64>,
    values: Vec<f64>,
}

impl Totals {
    fn new(fields: usize) -> Self {
        Self {
            records: 0,
            counts: vec![0; fields],
            values: vec![0.0; fields],
        }
    }

    fn add(&mut self, group: &Group) {
        self.records += group.records;
        for (f, acc) in group.accs.iter().enumerate() {
            self.counts[f] += acc.count();
            self.values[f] += group.values[f].unwrap_or(0.0);
        }
    }

    fn over<'a>(fields: usize, groups: impl IntoIterator<Item = &'a Group>) -> Self {
        let mut totals = Totals::new(fields);
        for group in groups {
            totals.add(group);
        }
        totals
    }
}

/// Runs a horizontal rollup over already-filtered records.
pub(crate) fn rollup(records: &[Record], config: &StatisticConfig) -> StatisticOutput {
    let fields = &config.statistic_fields;
    let group_ids: Vec<&str> = config
        .group_fields
        .iter()
        .map(|f| f.field_id.as_str())
        .collect();

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<Vec<GroupKeyPart>, usize> = HashMap::new();
    for record in records {
        let key = group_key(record, group_ids.iter().copied());
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                records: 0,
                rank: 0,
                accs: vec![Accumulator::new(); fields.len()],
                values: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.records += 1;
        for (acc, field) in group.accs.iter_mut().zip(fields) {
            acc.update_value(record.value(&field.field_id));
        }
    }
    if groups.is_empty() {
        return StatisticOutput::empty();
    }
    for group in &mut groups {
        group.values = group
            .accs
            .iter()
            .map(|acc| acc.finalize(config.aggregation))
            .collect();
    }
    log::debug!("horizontal rollup over {} groups", groups.len());

    let grand = Totals::over(fields.len(), &groups);
    sort_groups(&mut groups, config);

    let others = match config.top_n {
        Some(n) if groups.len() > n => {
            let rest = groups.split_off(n);
            Some(Totals::over(fields.len(), &rest))
        }
        _ => None,
    };
    for (i, group) in groups.iter_mut().enumerate() {
        group.rank = i + 1;
    }

    let subtotals = config.show_subtotal && group_ids.len() > 1;
    if subtotals {
        groups = cluster_by_first_level(groups);
    }

    let share = config.purpose == Purpose::ShareAnalysis;
    let mut running_share = vec![0.0; fields.len()];
    let mut data_rows: Vec<ResultRow> = Vec::with_capacity(groups.len());
    for group in &groups {
        let mut row = ResultRow::new(RowKind::Data);
        for (id, part) in group_ids.iter().zip(&group.key) {
            row.set(*id, part.to_value());
        }
        row.set(columns::RECORD_COUNT, group.records);
        row.set(columns::RANK, group.rank);
        for (f, field) in fields.iter().enumerate() {
            let id = field.field_id.as_str();
            row.set(id, group.values[f]);
            row.set(columns::count(id), group.accs[f].count() as f64);
            if share {
                let value = group.values[f].unwrap_or(0.0);
                set_share(&mut row, id, value, grand.values[f]);
                running_share[f] += value;
                set_cumulative_share(&mut row, id, running_share[f], grand.values[f]);
            }
        }
        data_rows.push(row);
    }

    let mut rows = if subtotals {
        with_subtotals(data_rows, &groups, config, &group_ids, &grand)
    } else {
        data_rows
    };

    if let Some(others) = others {
        let mut row = totals_row(RowKind::Others, &others, config, &group_ids, columns::OTHERS);
        if share {
            for (f, field) in fields.iter().enumerate() {
                let id = field.field_id.as_str();
                set_share(&mut row, id, others.values[f], grand.values[f]);
                running_share[f] += others.values[f];
                set_cumulative_share(&mut row, id, running_share[f], grand.values[f]);
            }
        }
        rows.push(row);
    }

    let mut total = totals_row(RowKind::GrandTotal, &grand, config, &group_ids, columns::TOTAL);
    if share {
        for (f, field) in fields.iter().enumerate() {
            set_share(&mut total, &field.field_id, grand.values[f], grand.values[f]);
        }
    }
    rows.push(total);

    StatisticOutput {
        data: rows,
        data_range: None,
        pivot_columns: Vec::new(),
    }
}

/// Stable sort by the configured sort field.
///
/// A statistic field sorts by its aggregate with missing values last in either direction; a
/// group field sorts by its key part. Without `sortBy` groups sort descending by the first
/// statistic field.
fn sort_groups(groups: &mut [Group], config: &StatisticConfig) {
    let order = config.sort_order;
    let directed = |ord: Ordering| match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    };

    let (by_group, position) = match config.sort_by.as_deref() {
        Some(id) => {
            if let Some(f) = config.statistic_fields.iter().position(|f| f.field_id == id) {
                (false, f)
            } else if let Some(g) = config.group_fields.iter().position(|f| f.field_id == id) {
                (true, g)
            } else {
                return;
            }
        }
        None => {
            groups.sort_by(|a, b| cmp_values(a.values.first(), b.values.first(), |o| o.reverse()));
            return;
        }
    };

    if by_group {
        groups.sort_by(|a, b| directed(a.key[position].cmp(&b.key[position])));
    } else {
        groups.sort_by(|a, b| cmp_values(a.values.get(position), b.values.get(position), directed));
    }
}

fn cmp_values(
    a: Option<&Option<f64>>,
    b: Option<&Option<f64>>,
    directed: impl Fn(Ordering) -> Ordering,
) -> Ordering {
    match (a.copied().flatten(), b.copied().flatten()) {
        (Some(x), Some(y)) => directed(x.total_cmp(&y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Regroups the sorted groups into contiguous blocks sharing the first-level value.
///
/// Blocks appear in the order of their best-ranked group and keep the sorted order inside.
fn cluster_by_first_level(groups: Vec<Group>) -> Vec<Group> {
    let mut blocks: Vec<Vec<Group>> = Vec::new();
    let mut index: HashMap<GroupKeyPart, usize> = HashMap::new();
    for group in groups {
        let slot = *index.entry(group.key[0].clone()).or_insert_with(|| {
            blocks.push(Vec::new());
            blocks.len() - 1
        });
        blocks[slot].push(group);
    }
    blocks.into_iter().flatten().collect()
}

/// Inserts an additive subtotal row after each run of consecutive groups sharing the first-level
/// group value.
fn with_subtotals(
    data_rows: Vec<ResultRow>,
    groups: &[Group],
    config: &StatisticConfig,
    group_ids: &[&str],
    grand: &Totals,
) -> Vec<ResultRow> {
    let fields = config.statistic_fields.len();
    let mut rows = Vec::with_capacity(data_rows.len() * 2);
    let mut run = Totals::new(fields);
    let mut rows_iter = data_rows.into_iter().zip(groups).peekable();
    while let Some((row, group)) = rows_iter.next() {
        run.add(group);
        rows.push(row);
        let run_ends = rows_iter
            .peek()
            .map_or(true, |(_, next)| next.key[0] != group.key[0]);
        if run_ends {
            let mut subtotal = totals_row(RowKind::Subtotal, &run, config, group_ids, "");
            subtotal.set(group_ids[0], group.key[0].to_value());
            subtotal.set(group_ids[1], columns::SUBTOTAL);
            if config.purpose == Purpose::ShareAnalysis {
                for (f, field) in config.statistic_fields.iter().enumerate() {
                    set_share(&mut subtotal, &field.field_id, run.values[f], grand.values[f]);
                }
            }
            rows.push(subtotal);
            run = Totals::new(fields);
        }
    }
    rows
}

fn totals_row(
    kind: RowKind,
    totals: &Totals,
    config: &StatisticConfig,
    group_ids: &[&str],
    label: &str,
) -> ResultRow {
    let mut row = ResultRow::new(kind);
    if let Some(first) = group_ids.first() {
        row.set(*first, label);
    }
    row.set(columns::RECORD_COUNT, totals.records);
    for (f, field) in config.statistic_fields.iter().enumerate() {
        let id = field.field_id.as_str();
        row.set(id, totals.values[f]);
        row.set(columns::count(id), totals.counts[f] as f64);
    }
    row
}

fn set_share(row: &mut ResultRow, field: &str, value: f64, total: f64) {
    row.set(columns::share(field), ratio_of(value, total));
}

fn set_cumulative_share(row: &mut ResultRow, field: &str, running: f64, total: f64) {
    row.set(columns::cumulative_share(field), ratio_of(running, total));
}

pub(crate) fn ratio_of(value: f64, total: f64) -> Option<f64> {
    (total != 0.0).then(|| value / total)
}
