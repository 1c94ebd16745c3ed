use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::animal_error;
use crate::api::response::ApiError;
use crate::blob_store::BlobStoreError;
use crate::photo::media_type_for;
use crate::AppState;

/// Error body of the streaming endpoint: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct StreamError {
    pub error: String,
}

fn stream_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(StreamError {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn content_type_for(name: &str) -> HeaderValue {
    HeaderValue::from_static(media_type_for(name))
}

/// Serve a photo blob as a static file.
/// Route: GET /uploads/:name
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.blob_store.read(&name).await.map_err(|e| match e {
        BlobStoreError::NotFound(_) | BlobStoreError::InvalidName(_) => {
            ApiError::not_found("File not found")
        }
        _ => ApiError::internal_with_details(
            "Failed to retrieve file",
            e.to_string(),
            state.config.dev_mode,
        ),
    })?;

    let byte_size = data.len() as u64;
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, content_type_for(&name));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));

    // Cache for 1 hour (blob names are never reused for different bytes)
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}

/// Stream a photo blob to the caller without buffering it.
/// Route: GET /api/animals/imagem/:name
pub async fn stream_photo(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    stream_blob(&state, &name).await
}

/// Stream an animal's current photo.
/// Route: GET /api/animals/:id/photo
pub async fn animal_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::not_found(format!("Animal {id} not found")))?;
    let name = state.animals.photo_of(id).map_err(|e| animal_error(&state, e))?;
    Ok(stream_blob(&state, &name).await)
}

async fn stream_blob(state: &AppState, name: &str) -> Response {
    let reader = match state.blob_store.open(name).await {
        Ok(reader) => reader,
        Err(BlobStoreError::NotFound(_)) | Err(BlobStoreError::InvalidName(_)) => {
            return stream_error(StatusCode::NOT_FOUND, "Image not found");
        }
        Err(e) => {
            tracing::error!(blob = %name, error = %e, "Failed to open photo blob");
            return stream_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image");
        }
    };

    let mut response = Body::from_stream(ReaderStream::new(reader)).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, content_type_for(name));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );

    response
}
