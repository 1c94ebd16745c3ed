use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::auth;
use crate::AppState;

/// Room for the text fields that travel alongside a photo.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.storage.max_upload_size as usize + FORM_OVERHEAD;

    let mut router = Router::new()
        // Animals
        .route("/api/animals", get(handlers::list_animals))
        .route(
            "/api/animals",
            post(handlers::create_animal).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/animals/:id", get(handlers::get_animal))
        .route(
            "/api/animals/:id",
            put(handlers::update_animal).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/animals/:id", patch(handlers::patch_animal))
        .route("/api/animals/:id", delete(handlers::delete_animal))
        .route(
            "/api/animals/:id/adopt",
            patch(handlers::adopt_animal).route_layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                auth::require_bearer,
            )),
        )
        // Photos
        .route("/api/animals/:id/photo", get(handlers::animal_photo))
        .route("/api/animals/imagem/:name", get(handlers::stream_photo))
        .route("/uploads/:name", get(handlers::serve_upload))
        // Internal
        .route("/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("TEST_MODE is set, exposing DELETE /admin/purge");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
