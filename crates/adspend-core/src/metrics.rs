//! Derived ratios and period-over-period comparison over aggregated spend.
//!
//! The store sums raw rows; everything computed from those sums lives here.

use chrono::{Days, NaiveDate};
use serde::{Serialize, Serializer};

/// Length of each trailing comparison window, in days.
pub const TRAILING_WINDOW_DAYS: u64 = 30;

/// Aggregates for one date window.
///
/// `roas` is conversions per 100 units of spend (`conversions * 100 / spend`).
/// There is no revenue column, so this is not a revenue ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsWindow {
    pub spend: Option<f64>,
    #[serde(serialize_with = "serialize_count")]
    pub conversions: Option<f64>,
    pub cac: Option<f64>,
    pub roas: Option<f64>,
}

impl MetricsWindow {
    /// Derives `cac` and `roas` from summed spend and conversions.
    ///
    /// Each ratio is `None` when either operand is `None` or its divisor is zero.
    #[must_use]
    pub fn from_totals(spend: Option<f64>, conversions: Option<f64>) -> Self {
        let cac = match (spend, conversions) {
            (Some(s), Some(c)) if c != 0.0 => Some(s / c),
            _ => None,
        };
        let roas = match (spend, conversions) {
            (Some(s), Some(c)) if s != 0.0 => Some(c * 100.0 / s),
            _ => None,
        };

        Self {
            spend,
            conversions,
            cac,
            roas,
        }
    }
}

/// Largest magnitude below which every whole `f64` is an exact integer (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Emits whole-number counts as JSON integers, the way SQLite sums an
/// `INTEGER` column. Fractional sums stay floating point.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp, clippy::ref_option)]
fn serialize_count<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *value {
        Some(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER => {
            serializer.serialize_i64(v as i64)
        }
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}

/// Relative change of each metric, `(last - prev) / prev`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsDelta {
    pub spend: Option<f64>,
    pub conversions: Option<f64>,
    pub cac: Option<f64>,
    pub roas: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsComparison {
    pub last_30d: MetricsWindow,
    pub prev_30d: MetricsWindow,
    pub delta_pct: MetricsDelta,
}

impl MetricsComparison {
    #[must_use]
    pub fn new(last: MetricsWindow, prev: MetricsWindow) -> Self {
        Self {
            last_30d: last,
            prev_30d: prev,
            delta_pct: MetricsDelta {
                spend: delta_pct(last.spend, prev.spend),
                conversions: delta_pct(last.conversions, prev.conversions),
                cac: delta_pct(last.cac, prev.cac),
                roas: delta_pct(last.roas, prev.roas),
            },
        }
    }
}

/// `(last - prev) / prev`, or `None` if either side is `None` or `prev` is zero.
#[must_use]
pub fn delta_pct(last: Option<f64>, prev: Option<f64>) -> Option<f64> {
    match (last, prev) {
        (Some(l), Some(p)) if p != 0.0 => Some((l - p) / p),
        _ => None,
    }
}

/// A date window that excludes `after` and includes `through`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub after: NaiveDate,
    pub through: NaiveDate,
}

/// The trailing 30-day window and the 30 days before it, anchored on the
/// latest date present in the store rather than the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindows {
    pub last: DateWindow,
    pub prev: DateWindow,
}

impl TrailingWindows {
    /// Returns `None` only if the arithmetic underflows the calendar.
    #[must_use]
    pub fn ending_at(max_date: NaiveDate) -> Option<Self> {
        let last_start = max_date.checked_sub_days(Days::new(TRAILING_WINDOW_DAYS))?;
        let prev_start = max_date.checked_sub_days(Days::new(TRAILING_WINDOW_DAYS * 2))?;

        Some(Self {
            last: DateWindow {
                after: last_start,
                through: max_date,
            },
            prev: DateWindow {
                after: prev_start,
                through: last_start,
            },
        })
    }
}

/// Reads a stored `date` value as a calendar day.
///
/// Only the leading `YYYY-MM-DD` is considered, so `2024-01-05 00:00:00`
/// and `2024-01-05T00:00:00` read as `2024-01-05`.
#[must_use]
pub fn parse_store_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn from_totals_derives_cac_and_roas() {
        let window = MetricsWindow::from_totals(Some(30.0), Some(3.0));
        assert_eq!(window.cac, Some(10.0));
        let roas = window.roas.expect("roas present");
        assert!((roas - 10.0).abs() < 1e-9);
    }

    #[test]
    fn from_totals_guards_zero_and_null_divisors() {
        let zero_conv = MetricsWindow::from_totals(Some(50.0), Some(0.0));
        assert_eq!(zero_conv.cac, None);
        assert_eq!(zero_conv.roas, Some(0.0));

        let zero_spend = MetricsWindow::from_totals(Some(0.0), Some(4.0));
        assert_eq!(zero_spend.roas, None);
        assert_eq!(zero_spend.cac, Some(0.0));

        let empty = MetricsWindow::from_totals(None, None);
        assert_eq!(empty.cac, None);
        assert_eq!(empty.roas, None);

        let no_spend = MetricsWindow::from_totals(None, Some(2.0));
        assert_eq!(no_spend.cac, None);
        assert_eq!(no_spend.roas, None);
    }

    #[test]
    fn delta_pct_is_relative_change() {
        assert_eq!(delta_pct(Some(200.0), Some(100.0)), Some(1.0));
        assert_eq!(delta_pct(Some(50.0), Some(100.0)), Some(-0.5));
        assert_eq!(delta_pct(Some(5.0), Some(0.0)), None);
        assert_eq!(delta_pct(None, Some(1.0)), None);
        assert_eq!(delta_pct(Some(1.0), None), None);
    }

    #[test]
    fn comparison_fills_every_delta() {
        let last = MetricsWindow::from_totals(Some(200.0), Some(10.0));
        let prev = MetricsWindow::from_totals(Some(100.0), Some(10.0));
        let cmp = MetricsComparison::new(last, prev);

        assert_eq!(cmp.delta_pct.spend, Some(1.0));
        assert_eq!(cmp.delta_pct.conversions, Some(0.0));
        assert_eq!(cmp.delta_pct.cac, Some(1.0));
        assert_eq!(cmp.delta_pct.roas, Some(-0.5));
    }

    #[test]
    fn trailing_windows_are_anchored_on_max_date() {
        let windows = TrailingWindows::ending_at(date("2024-03-31")).expect("in range");
        assert_eq!(windows.last.after, date("2024-03-01"));
        assert_eq!(windows.last.through, date("2024-03-31"));
        assert_eq!(windows.prev.after, date("2024-01-31"));
        assert_eq!(windows.prev.through, date("2024-03-01"));
    }

    #[test]
    fn parse_store_date_accepts_datetime_prefix() {
        assert_eq!(parse_store_date("2024-01-05"), Some(date("2024-01-05")));
        assert_eq!(parse_store_date("2024-01-05 12:00:00"), Some(date("2024-01-05")));
        assert_eq!(parse_store_date("2024-1-5"), None);
        assert_eq!(parse_store_date("yesterday"), None);
    }

    #[test]
    fn whole_conversions_serialize_as_integers() {
        let whole = serde_json::to_value(MetricsWindow::from_totals(Some(30.0), Some(3.0)))
            .expect("serialize");
        assert_eq!(whole["conversions"], serde_json::json!(3));
        assert!(whole["conversions"].is_i64());
        assert!(whole["spend"].is_f64());

        let fractional = serde_json::to_value(MetricsWindow::from_totals(Some(1.0), Some(2.5)))
            .expect("serialize");
        assert_eq!(fractional["conversions"], serde_json::json!(2.5));

        let empty = serde_json::to_value(MetricsWindow::from_totals(None, None))
            .expect("serialize");
        assert!(empty["conversions"].is_null());
    }

    #[test]
    fn comparison_serializes_with_wire_names() {
        let cmp = MetricsComparison::new(
            MetricsWindow::from_totals(Some(1.0), None),
            MetricsWindow::from_totals(None, None),
        );
        let json = serde_json::to_value(cmp).expect("serialize");
        assert!(json["last_30d"]["spend"].is_number());
        assert!(json["prev_30d"]["roas"].is_null());
        assert!(json["delta_pct"]["cac"].is_null());
    }
}
