//! Idempotent DDL for the `ads_spend` table and its date index.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;

use crate::{absolute_db_path, ensure_parent_dir, DbError};

const CREATE_SPEND_TABLE: &str = "CREATE TABLE IF NOT EXISTS ads_spend ( \
     date TEXT, \
     platform TEXT, \
     account TEXT, \
     campaign TEXT, \
     country TEXT, \
     device TEXT, \
     spend REAL, \
     clicks INTEGER, \
     impressions INTEGER, \
     conversions INTEGER, \
     load_date TEXT, \
     source_file_name TEXT \
 )";

const CREATE_DATE_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_ads_date ON ads_spend(date)";

/// Ensures the data directory, the `ads_spend` table and its `date` index
/// exist. Safe to call any number of times, concurrently or not.
///
/// Returns the absolute location of the store.
///
/// # Errors
///
/// Returns [`DbError::DataDir`] if the directory cannot be created, or
/// [`DbError::Sqlx`] if the DDL fails.
pub async fn ensure_schema(pool: &SqlitePool, db_path: &Path) -> Result<PathBuf, DbError> {
    ensure_parent_dir(db_path)?;

    sqlx::query(CREATE_SPEND_TABLE).execute(pool).await?;
    sqlx::query(CREATE_DATE_INDEX).execute(pool).await?;

    Ok(absolute_db_path(db_path))
}
