use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accepted textual timestamp layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

static BLANK: FieldValue = FieldValue::Blank;

/// Scalar value stored in a record field or emitted in a result cell.
///
/// This is the canonical serde format shared with the record store:
/// a tagged enum in the shape `{ "type": "...", "value": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    #[default]
    Blank,
    Number(f64),
    Text(String),
    /// A wall-clock timestamp. The engine does not track time zones.
    Date(NaiveDateTime),
    Bool(bool),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Blank)
    }

    /// Numeric coercion used by aggregation and range filters.
    ///
    /// Numbers pass through, text is accepted when it parses to a finite number after trimming.
    /// Everything else (blank, booleans, dates) is non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Timestamp coercion used by the calendar resolver.
    ///
    /// Numbers are read as Unix epoch milliseconds (UTC). Text accepts ISO-like date and
    /// date-time layouts, RFC 3339 (the offset is dropped, keeping the written wall time) and a
    /// bare `YYYY-MM` month.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Date(dt) => Some(*dt),
            FieldValue::Number(n) if n.is_finite() => {
                DateTime::<Utc>::from_timestamp_millis(n.trunc() as i64).map(|dt| dt.naive_utc())
            }
            FieldValue::Text(s) => parse_datetime_text(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used for set-membership filters and group labels.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Blank => String::new(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

/// Formats a number the way the record store displays it: integral values without a
/// fractional part, `-0` folded into `0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{n}")
}

fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    // Month-precision values, e.g. the `period` column of a monthly report.
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    None
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value.and_time(NaiveTime::MIN))
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Blank, FieldValue::Number)
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => FieldValue::Blank,
            Json::Bool(b) => FieldValue::Bool(*b),
            Json::Number(n) => n.as_f64().map_or(FieldValue::Blank, FieldValue::Number),
            Json::String(s) => FieldValue::Text(s.clone()),
            // Multi-select fields arrive as arrays; they group and filter by their joined text.
            Json::Array(items) if items.is_empty() => FieldValue::Blank,
            Json::Array(items) => FieldValue::Text(
                items
                    .iter()
                    .map(|item| FieldValue::from(item).to_text())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Json::Object(_) => FieldValue::Text(value.to_string()),
        }
    }
}

/// One immutable row from the record store: field id to scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Like [`Record::get`], but a missing field reads as [`FieldValue::Blank`].
    pub fn value(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&BLANK)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a record from a JSON document as stored by the record store.
    ///
    /// Returns `None` for anything other than a JSON object.
    pub fn from_json(doc: &serde_json::Value) -> Option<Self> {
        let object = doc.as_object()?;
        Some(
            object
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from(v)))
                .collect(),
        )
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
