//! Runtime log filter routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{LogFilterResponse, UpdateLogFilterRequest};
use crate::api::server::AppState;

/// Create the logging router.
pub fn router() -> Router<AppState> {
    Router::new().route("/filter", get(get_log_filter).put(update_log_filter))
}

async fn get_log_filter(State(state): State<AppState>) -> ApiResult<Json<LogFilterResponse>> {
    let logging_config = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging configuration not available"))?;

    Ok(Json(LogFilterResponse {
        filter: logging_config.get_filter(),
    }))
}

async fn update_log_filter(
    State(state): State<AppState>,
    Json(request): Json<UpdateLogFilterRequest>,
) -> ApiResult<Json<LogFilterResponse>> {
    let logging_config = state
        .logging_config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging configuration not available"))?;

    logging_config
        .set_filter(&request.filter)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    tracing::info!(filter = %request.filter, "Log filter updated");

    Ok(Json(LogFilterResponse {
        filter: logging_config.get_filter(),
    }))
}
