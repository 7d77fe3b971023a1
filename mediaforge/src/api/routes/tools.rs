//! Operation submission.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::AcceptedResponse;
use crate::api::server::AppState;
use crate::pipeline::OperationRequest;

pub fn router() -> Router<AppState> {
    Router::new().route("/video-tools/{operation}", post(submit_operation))
}

/// Submit `operation` with a JSON parameter object.
///
/// An empty body is an empty parameter object.
async fn submit_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let params = if body.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?
    };
    let request = OperationRequest::from_parts(&operation, params)?;
    let record = state.engine.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse::from(&record))))
}
