use adspend_core::{normalize_rows, BatchDefaults, RawRow};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{run_store_op, ApiError, AppState};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct IngestResponse {
    status: &'static str,
    inserted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl IngestResponse {
    fn empty() -> Self {
        Self {
            status: "empty",
            inserted: 0,
            load_date: None,
            source: None,
        }
    }
}

/// Replaces the batch named by the first row with the posted rows.
pub(super) async fn ingest_rows(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<Vec<RawRow>>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(rows) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected ingest body");
        let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "bad_request"
        };
        ApiError::new(req_id.0.clone(), code, rejection.body_text())
    })?;

    let Some(first) = rows.first() else {
        return Ok(Json(IngestResponse::empty()));
    };

    let defaults = BatchDefaults::from_first_row(first, Utc::now().date_naive());
    let records = normalize_rows(&rows, &defaults);
    let key = defaults.batch_key();

    let outcome = run_store_op(
        &state,
        &req_id,
        adspend_db::replace_batch(&state.pool, &key, &records),
    )
    .await?;

    tracing::info!(
        load_date = %key.load_date,
        source = %key.source_file_name,
        deleted = outcome.deleted,
        inserted = outcome.inserted,
        "ingested batch"
    );

    Ok(Json(IngestResponse {
        status: "ok",
        inserted: outcome.inserted,
        load_date: Some(key.load_date),
        source: Some(key.source_file_name),
    }))
}

#[cfg(test)]
mod tests {
    use super::IngestResponse;

    #[test]
    fn empty_response_omits_batch_key() {
        let json = serde_json::to_value(IngestResponse::empty()).expect("serialize");
        assert_eq!(json, serde_json::json!({"status": "empty", "inserted": 0}));
    }
}
