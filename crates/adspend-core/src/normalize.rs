//! Conversion of loosely-typed ingestion rows into [`SpendRecord`]s.
//!
//! All ingestion leniency lives here: unreadable numbers become `None`
//! instead of failing the batch, and missing batch metadata is filled from
//! defaults resolved once from the first row.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::records::{BatchKey, SpendRecord};

/// A row as received on the wire: an untyped JSON object.
pub type RawRow = Map<String, Value>;

/// Source file name used when the first row does not name one.
pub const FALLBACK_SOURCE_FILE: &str = "ads_spend.csv";

/// Batch metadata applied to rows that do not carry their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDefaults {
    pub load_date: String,
    pub source_file_name: String,
}

impl BatchDefaults {
    /// Resolves the defaults from the first row of a batch.
    ///
    /// `today` is the current UTC date, used when the row has no `load_date`.
    #[must_use]
    pub fn from_first_row(first: &RawRow, today: NaiveDate) -> Self {
        let load_date = present_text(first.get("load_date"))
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
        let source_file_name = present_text(first.get("source_file_name"))
            .unwrap_or_else(|| FALLBACK_SOURCE_FILE.to_string());

        Self {
            load_date,
            source_file_name,
        }
    }

    /// The key whose existing rows an ingestion of this batch replaces.
    #[must_use]
    pub fn batch_key(&self) -> BatchKey {
        BatchKey {
            load_date: self.load_date.clone(),
            source_file_name: self.source_file_name.clone(),
        }
    }
}

/// Normalizes every row, preserving input order.
///
/// A row's own non-empty `load_date` / `source_file_name` wins over the batch
/// defaults.
#[must_use]
pub fn normalize_rows(rows: &[RawRow], defaults: &BatchDefaults) -> Vec<SpendRecord> {
    rows.iter().map(|row| normalize_row(row, defaults)).collect()
}

fn normalize_row(row: &RawRow, defaults: &BatchDefaults) -> SpendRecord {
    SpendRecord {
        date: text(row.get("date")),
        platform: text(row.get("platform")),
        account: text(row.get("account")),
        campaign: text(row.get("campaign")),
        country: text(row.get("country")),
        device: text(row.get("device")),
        spend: coerce_number(row.get("spend")),
        clicks: coerce_number(row.get("clicks")),
        impressions: coerce_number(row.get("impressions")),
        conversions: coerce_number(row.get("conversions")),
        load_date: present_text(row.get("load_date"))
            .unwrap_or_else(|| defaults.load_date.clone()),
        source_file_name: present_text(row.get("source_file_name"))
            .unwrap_or_else(|| defaults.source_file_name.clone()),
    }
}

/// Best-effort numeric read: a number, or `None`. Never fails.
///
/// Absent, `null`, `""` and `"NULL"` are `None`. Strings are parsed as
/// floating point after trimming; anything that does not parse is `None`.
/// Booleans read as `1` / `0`.
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Null => None,
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.is_empty() || s == "NULL" => None,
        // Every string an integer parse accepts is also accepted here.
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Array(_) | Value::Object(_) => None,
    };

    // SQLite stores NaN as NULL; keep the record consistent with the store.
    number.filter(|n| !n.is_nan())
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Batch metadata counts as present unless it is empty, `false` or zero.
fn present_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => text(Some(other)).filter(|s| !s.is_empty()),
    }
}
