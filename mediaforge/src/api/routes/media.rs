//! Media routes.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::services::ServeFile;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    AcceptedResponse, DeleteResponse, StatusResponse, TtsRequest, WebhookDelivery,
    WebhookRequest, WebhookResponse,
};
use crate::api::server::AppState;
use crate::probe::MediaInfo;
use crate::registry::CallbackRegistration;
use crate::storage::sanitize_extension;

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Create the media router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/tts", post(synthesize_speech))
        .route("/{id}", delete(delete_media))
        .route("/{id}/status", get(get_status))
        .route("/{id}/content", get(get_media_content))
        .route("/{id}/metadata", get(get_metadata))
        .route("/{id}/webhook", post(register_webhook))
}

/// Store an uploaded file as a `ready` asset.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let registry = state.engine.registry();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let extension = sanitize_extension(field.file_name());
        registry.blobs().ensure_root().await?;
        let id = registry.allocate_id();
        let path = registry
            .blobs()
            .create_from_stream(&id, &extension, field)
            .await?;
        let record = registry.create_upload(id, path)?;
        info!(id = %record.id, extension = %extension, "Asset uploaded");
        return Ok((StatusCode::CREATED, Json(AcceptedResponse::from(&record))));
    }
    Err(ApiError::bad_request(format!(
        "Multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}

async fn synthesize_speech(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let record = state
        .engine
        .submit_speech(
            &request.text,
            request.voice.as_deref(),
            request.callback_url.as_deref(),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse::from(&record))))
}

async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let record = state.engine.registry().get(&id)?;
    Ok(Json(StatusResponse::from(record)))
}

/// Serve the file of a ready record.
async fn get_media_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let path = state.engine.registry().resolve_ready(&id)?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::not_found(format!("Media file not found: {}", id)));
    }

    let req = axum::http::Request::builder()
        .body(Body::empty())
        .map_err(|e| ApiError::internal(e.to_string()))?;

    match ServeFile::new(path).try_call(req).await {
        Ok(response) => Ok(response.into_response()),
        Err(e) => Err(ApiError::internal(format!("Failed to serve file: {}", e))),
    }
}

async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MediaInfo>> {
    Ok(Json(state.engine.probe_asset(&id).await?))
}

/// Delete a record and its file. Unknown ids succeed.
async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let outcome = state.engine.delete(&id).await;
    info!(id = %id, ?outcome, "Delete requested");
    Json(DeleteResponse::new(id, outcome))
}

async fn register_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<WebhookRequest>,
) -> ApiResult<Json<WebhookResponse>> {
    let delivery = match state.engine.register_callback(&id, &request.url).await? {
        CallbackRegistration::Pending => WebhookDelivery::Pending,
        CallbackRegistration::DeliverNow(_) => WebhookDelivery::Delivered,
    };
    Ok(Json(WebhookResponse {
        file_id: id,
        delivery,
    }))
}
