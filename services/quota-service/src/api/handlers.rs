use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use coffer_quota_core::{ChangeNotification, QuotaBreach, QuotaError};

use super::types::{
    ApplyEventResponse, BucketCountersResponse, CollectionCountersResponse, ErrorResponse,
};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub async fn apply_event(
    State(state): State<Arc<ApiState>>,
    Json(notification): Json<ChangeNotification>,
) -> ApiResult<ApplyEventResponse> {
    if notification.bucket_id.trim().is_empty() {
        return Err(bad_request("invalid_bucket_id", "bucket_id cannot be empty"));
    }

    let result = {
        let _guard = state
            .apply_lock
            .lock()
            .map_err(|_| internal_error("apply lock poisoned"))?;
        state.engine.apply(&notification)
    };

    match result {
        Ok(()) => Ok(Json(ApplyEventResponse { success: true })),
        Err(QuotaError::Exceeded(breach)) => Err(quota_exceeded(breach)),
        Err(err) => Err(internal_error(err)),
    }
}

pub async fn bucket_counters(
    State(state): State<Arc<ApiState>>,
    Path(bucket_id): Path<String>,
) -> ApiResult<BucketCountersResponse> {
    match state.engine.bucket_counters(&bucket_id) {
        Ok(counters) => Ok(Json(BucketCountersResponse {
            bucket_id,
            counters,
        })),
        Err(err) => Err(internal_error(err)),
    }
}

pub async fn collection_counters(
    State(state): State<Arc<ApiState>>,
    Path((bucket_id, collection_id)): Path<(String, String)>,
) -> ApiResult<CollectionCountersResponse> {
    match state.engine.collection_counters(&bucket_id, &collection_id) {
        Ok(counters) => Ok(Json(CollectionCountersResponse {
            bucket_id,
            collection_id,
            counters,
        })),
        Err(err) => Err(internal_error(err)),
    }
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "quota-service"
    })))
}

fn quota_exceeded(breach: QuotaBreach) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INSUFFICIENT_STORAGE,
        Json(ErrorResponse {
            error: QuotaError::Exceeded(breach).to_string(),
            code: "quota_exceeded".to_string(),
            details: Some(serde_json::json!({
                "scope": breach.scope.as_str(),
                "limit": breach.limit.as_str(),
                "maximum": breach.maximum,
                "actual": breach.actual,
            })),
        }),
    )
}

fn bad_request(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, Json<ErrorResponse>) {
    error!(error = %err, "quota API internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            details: Some(serde_json::json!({ "message": err.to_string() })),
        }),
    )
}
