use crate::value::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column that carries the row kind when a report is re-read as records.
pub const ROW_KIND_FIELD: &str = "rowKind";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    /// One time bucket, group, or cross-tab row.
    Data,
    /// Trailing summary of a vertical report.
    Summary,
    /// Additive subtotal after a run of rows sharing the first-level group value.
    Subtotal,
    /// Synthetic row folding the groups cut off by Top-N.
    Others,
    /// Trailing grand total of a horizontal or cross-tab report.
    GrandTotal,
}

impl RowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RowKind::Data => "data",
            RowKind::Summary => "summary",
            RowKind::Subtotal => "subtotal",
            RowKind::Others => "others",
            RowKind::GrandTotal => "grandTotal",
        }
    }
}

/// One output row: identifying columns, metric columns and bookkeeping columns by name.
///
/// Cells are kept in a `BTreeMap` so that serialized reports are byte-stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub kind: RowKind,
    pub cells: BTreeMap<String, FieldValue>,
}

impl ResultRow {
    pub fn new(kind: RowKind) -> Self {
        Self {
            kind,
            cells: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.cells.get(column)
    }

    /// The numeric cell under `column`; blank or missing cells read as `None`.
    pub fn number(&self, column: &str) -> Option<f64> {
        match self.cells.get(column) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(FieldValue::as_text)
    }

    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }
}

/// Extent of a vertical report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRange {
    pub from: String,
    pub to: String,
    pub from_name: String,
    pub to_name: String,
    /// Number of buckets, excluding the summary row.
    pub period_count: usize,
    /// Buckets that have not fully elapsed at evaluation time.
    pub incomplete_count: usize,
    /// Records dropped because their time value could not be bucketed.
    pub skipped_records: usize,
}

/// Result of one engine invocation; may be persisted verbatim as a report snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticOutput {
    pub data: Vec<ResultRow>,
    /// Populated for vertical reports with at least one bucket.
    #[serde(default)]
    pub data_range: Option<DataRange>,
    /// Ordered pivot column values of a cross-tab report.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pivot_columns: Vec<String>,
}

impl StatisticOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.data.iter().filter(|row| row.is_data())
    }

    /// Re-reads the report as records so it can be the source of another report.
    ///
    /// Every row becomes one record carrying its cells plus a [`ROW_KIND_FIELD`] column, so
    /// callers can filter summary/total rows out with a regular condition.
    pub fn to_records(&self) -> Vec<Record> {
        self.data
            .iter()
            .map(|row| {
                let mut record: Record = row
                    .cells
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                record.insert(ROW_KIND_FIELD, row.kind.as_str());
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_become_records_with_kind_column() {
        let mut data = ResultRow::new(RowKind::Data);
        data.set("period", "2024-01");
        data.set("amount", 10.0);
        let mut summary = ResultRow::new(RowKind::Summary);
        summary.set("amount", 10.0);

        let output = StatisticOutput {
            data: vec![data, summary],
            ..StatisticOutput::default()
        };
        let records = output.to_records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value("period"), &FieldValue::from("2024-01"));
        assert_eq!(records[0].value(ROW_KIND_FIELD), &FieldValue::from("data"));
        assert_eq!(records[1].value(ROW_KIND_FIELD), &FieldValue::from("summary"));
    }

    #[test]
    fn number_ignores_non_numeric_cells() {
        let mut row = ResultRow::new(RowKind::Data);
        row.set("a", None::<f64>);
        row.set("b", "12");
        row.set("c", 1.5);
        assert_eq!(row.number("a"), None);
        assert_eq!(row.number("b"), None);
        assert_eq!(row.number("c"), Some(1.5));
        assert_eq!(row.number("missing"), None);
    }
}
