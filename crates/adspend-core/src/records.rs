/// One row of advertising spend attribution, in the fixed column shape the
/// store persists.
///
/// Numeric fields are either a number or `None`; raw input that could not be
/// read as a number has already been coerced to `None` by
/// [`crate::normalize_rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpendRecord {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub platform: Option<String>,
    pub account: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub device: Option<String>,
    pub spend: Option<f64>,
    /// Bound as floating point; SQLite's `INTEGER` affinity stores integral
    /// values as integers.
    pub clicks: Option<f64>,
    pub impressions: Option<f64>,
    pub conversions: Option<f64>,
    /// Ingestion batch day, `YYYY-MM-DD`. Always resolved.
    pub load_date: String,
    /// Provenance of the row. Always resolved.
    pub source_file_name: String,
}

/// The `(load_date, source_file_name)` pair identifying a replaceable
/// ingestion unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub load_date: String,
    pub source_file_name: String,
}

impl SpendRecord {
    #[must_use]
    pub fn batch_key(&self) -> BatchKey {
        BatchKey {
            load_date: self.load_date.clone(),
            source_file_name: self.source_file_name.clone(),
        }
    }
}
