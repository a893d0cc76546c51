mod ingest;
mod metrics;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Store location as configured; reported in absolute form.
    pub db_path: Arc<PathBuf>,
    /// Upper bound on any single store operation.
    pub request_timeout: Duration,
    /// Largest accepted `POST /ingest` body, in bytes.
    pub ingest_body_limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Hard failure body. Soft errors from `/metrics` do not use this shape.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    db: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "bad_request" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &adspend_db::DbError) -> ApiError {
    tracing::error!(error = %error, "store operation failed");
    ApiError::new(request_id, "internal_error", "store operation failed")
}

/// Runs a store operation under the request timeout, mapping failures to
/// [`ApiError`]. A timed-out write is dropped uncommitted.
pub(super) async fn run_store_op<T, F>(
    state: &AppState,
    request_id: &RequestId,
    op: F,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, adspend_db::DbError>>,
{
    match tokio::time::timeout(state.request_timeout, op).await {
        Ok(result) => result.map_err(|e| map_db_error(request_id.0.clone(), &e)),
        Err(_) => {
            tracing::warn!(
                timeout_ms = u64::try_from(state.request_timeout.as_millis()).unwrap_or(u64::MAX),
                "store operation timed out"
            );
            Err(ApiError::new(
                request_id.0.clone(),
                "timeout",
                "store operation timed out",
            ))
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, REQUEST_ID_HEADER])
}

pub fn build_app(state: AppState) -> Router {
    let ingest_limit = DefaultBodyLimit::max(state.ingest_body_limit);

    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest::ingest_rows).layer(ingest_limit))
        .route("/metrics", get(metrics::get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Ensures the schema exists and reports where the store lives, so a health
/// probe alone bootstraps an empty deployment.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let ensured = tokio::time::timeout(
        state.request_timeout,
        adspend_db::ensure_schema(&state.pool, &state.db_path),
    )
    .await;

    match ensured {
        Ok(Ok(location)) => {
            return (
                StatusCode::OK,
                Json(HealthData {
                    status: "ok",
                    db: location.display().to_string(),
                }),
            );
        }
        Ok(Err(e)) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "health check: store unavailable");
        }
        Err(_) => tracing::warn!(request_id = %req_id.0, "health check: store timed out"),
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(HealthData {
            status: "degraded",
            db: adspend_db::absolute_db_path(&state.db_path)
                .display()
                .to_string(),
        }),
    )
}
