use adspend_core::{MetricsComparison, MetricsWindow};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{run_store_op, ApiError, AppState};

const COMPARE_LAST30_PREV30: &str = "last30_prev30";
const MISSING_PARAMS_DETAIL: &str = "Provide start & end or compare=last30_prev30";

#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub compare: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RangeBounds {
    start: String,
    end: String,
}

/// Body of `GET /metrics`. Missing parameters are a soft error: HTTP 200
/// with `status: "error"`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum MetricsResponse {
    Range {
        status: &'static str,
        range: RangeBounds,
        #[serde(flatten)]
        window: MetricsWindow,
    },
    Comparison {
        status: &'static str,
        result: Option<MetricsComparison>,
    },
    Error {
        status: &'static str,
        detail: &'static str,
    },
}

pub(super) async fn get_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<MetricsQuery>, QueryRejection>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected metrics query");
        ApiError::new(req_id.0.clone(), "bad_request", rejection.body_text())
    })?;

    if query.compare.as_deref() == Some(COMPARE_LAST30_PREV30) {
        let result = run_store_op(
            &state,
            &req_id,
            adspend_db::trailing_comparison(&state.pool),
        )
        .await?;
        return Ok(Json(MetricsResponse::Comparison {
            status: "ok",
            result,
        }));
    }

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(start), Some(end)) = (non_empty(query.start), non_empty(query.end)) else {
        return Ok(Json(MetricsResponse::Error {
            status: "error",
            detail: MISSING_PARAMS_DETAIL,
        }));
    };

    let window = run_store_op(
        &state,
        &req_id,
        adspend_db::range_metrics(&state.pool, &start, &end),
    )
    .await?;

    Ok(Json(MetricsResponse::Range {
        status: "ok",
        range: RangeBounds { start, end },
        window,
    }))
}
