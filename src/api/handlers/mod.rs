mod admin;
mod animals;
mod photos;

use axum::http::{header, HeaderMap};

use crate::api::response::ApiError;
use crate::coordinator::AnimalError;
use crate::AppState;

pub use admin::{admin_purge, health};
pub use animals::{
    adopt_animal, create_animal, delete_animal, get_animal, list_animals, patch_animal,
    update_animal, AnimalResponse,
};
pub use photos::{animal_photo, serve_upload, stream_photo};

/// Map an AnimalError to an ApiError
fn animal_error(state: &AppState, e: AnimalError) -> ApiError {
    match e {
        AnimalError::Validation(msg) => ApiError::bad_request(msg),
        AnimalError::NotFound(msg) => ApiError::not_found(msg),
        AnimalError::UnsupportedMediaType(media_type) => ApiError::unsupported_media_type(
            format!("Unsupported media type '{media_type}'; only JPEG, PNG and GIF images are accepted"),
        ),
        AnimalError::PayloadTooLarge(limit) => ApiError::payload_too_large(format!(
            "File exceeds maximum upload size of {limit} bytes"
        )),
        AnimalError::StorageIo(_) | AnimalError::Persistence(_) => {
            tracing::error!(error = %e, "Animal operation failed");
            ApiError::internal_with_details("Internal server error", e.to_string(), state.config.dev_mode)
        }
    }
}

/// `<scheme>://<host>` clients should use to reach this service.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(ref url) = state.config.photos.public_base_url {
        return url.clone();
    }

    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let scheme = header_str("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header_str("x-forwarded-host")
        .or_else(|| header_str(header::HOST.as_str()))
        .unwrap_or_else(|| state.config.server.bind_address.clone());

    format!("{scheme}://{host}")
}
