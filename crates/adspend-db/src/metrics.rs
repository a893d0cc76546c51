//! Aggregate queries behind the metrics endpoints.
//!
//! Range queries are inclusive on both ends. The trailing comparison windows
//! exclude their start and include their end.

use adspend_core::{parse_store_date, MetricsComparison, MetricsWindow, TrailingWindows};
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    spend: Option<f64>,
    conversions: Option<f64>,
}

impl TotalsRow {
    fn into_window(self) -> MetricsWindow {
        MetricsWindow::from_totals(self.spend, self.conversions)
    }
}

/// Spend, conversions, CAC and ROAS over `start <= date <= end`.
///
/// Sums are `None` when no row matches or every matching value is null.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn range_metrics(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<MetricsWindow, DbError> {
    let row = sqlx::query_as::<_, TotalsRow>(
        "SELECT \
             CAST(SUM(spend) AS REAL) AS spend, \
             CAST(SUM(conversions) AS REAL) AS conversions \
         FROM ads_spend \
         WHERE date >= ? AND date <= ?",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(row.into_window())
}

/// Latest non-null `date` in the store, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn max_date(pool: &SqlitePool) -> Result<Option<String>, DbError> {
    let mut conn = pool.acquire().await?;
    max_date_on(&mut *conn).await
}

/// Last 30 days against the 30 days before, anchored on the latest stored
/// date. `None` when the store holds no dated rows.
///
/// All three reads share one transaction so the windows see the same
/// snapshot.
///
/// # Errors
///
/// Returns [`DbError::InvalidStoreDate`] if the latest date is not a
/// calendar day, or [`DbError::Sqlx`] if a query fails.
pub async fn trailing_comparison(pool: &SqlitePool) -> Result<Option<MetricsComparison>, DbError> {
    let mut tx = pool.begin().await?;

    let Some(max_raw) = max_date_on(&mut *tx).await? else {
        return Ok(None);
    };

    let windows = parse_store_date(&max_raw)
        .and_then(TrailingWindows::ending_at)
        .ok_or_else(|| DbError::InvalidStoreDate(max_raw.clone()))?;

    // The last window ends at the stored value itself, not its parsed day.
    let last = window_totals(&mut *tx, &format_day(windows.last.after), &max_raw).await?;
    let prev = window_totals(
        &mut *tx,
        &format_day(windows.prev.after),
        &format_day(windows.prev.through),
    )
    .await?;

    tx.commit().await?;

    Ok(Some(MetricsComparison::new(last, prev)))
}

async fn max_date_on(conn: &mut SqliteConnection) -> Result<Option<String>, DbError> {
    let max = sqlx::query_scalar::<_, Option<String>>("SELECT MAX(date) FROM ads_spend")
        .fetch_one(&mut *conn)
        .await?;

    Ok(max.filter(|d| !d.is_empty()))
}

async fn window_totals(
    conn: &mut SqliteConnection,
    after: &str,
    through: &str,
) -> Result<MetricsWindow, DbError> {
    let row = sqlx::query_as::<_, TotalsRow>(
        "SELECT \
             CAST(SUM(spend) AS REAL) AS spend, \
             CAST(SUM(conversions) AS REAL) AS conversions \
         FROM ads_spend \
         WHERE date > ? AND date <= ?",
    )
    .bind(after)
    .bind(through)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_window())
}

fn format_day(day: chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
