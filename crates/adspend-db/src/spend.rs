//! Replace-on-ingest writes for `ads_spend`.

use adspend_core::{BatchKey, SpendRecord};
use sqlx::SqlitePool;

use crate::DbError;

/// Row counts from a [`replace_batch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: u64,
    pub inserted: u64,
}

/// Deletes every row carrying `key`, then inserts `records`, in one
/// transaction.
///
/// Rows are not deduplicated, so `inserted` always equals `records.len()`.
/// Records whose own batch key differs from `key` are inserted as-is; only
/// rows matching `key` are removed first. If any statement fails the
/// transaction is dropped uncommitted and no partial replacement is visible.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn replace_batch(
    pool: &SqlitePool,
    key: &BatchKey,
    records: &[SpendRecord],
) -> Result<ReplaceOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM ads_spend WHERE load_date = ? AND source_file_name = ?")
        .bind(&key.load_date)
        .bind(&key.source_file_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let mut inserted = 0u64;
    for record in records {
        sqlx::query(
            "INSERT INTO ads_spend ( \
                 date, platform, account, campaign, country, device, \
                 spend, clicks, impressions, conversions, load_date, source_file_name \
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.date)
        .bind(&record.platform)
        .bind(&record.account)
        .bind(&record.campaign)
        .bind(&record.country)
        .bind(&record.device)
        .bind(record.spend)
        .bind(record.clicks)
        .bind(record.impressions)
        .bind(record.conversions)
        .bind(&record.load_date)
        .bind(&record.source_file_name)
        .execute(&mut *tx)
        .await?;

        inserted += 1;
    }

    tx.commit().await?;

    tracing::debug!(
        load_date = %key.load_date,
        source = %key.source_file_name,
        deleted,
        inserted,
        "replaced ingestion batch"
    );

    Ok(ReplaceOutcome { deleted, inserted })
}
