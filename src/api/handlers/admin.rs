use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub photo_delivery: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub animals_deleted: u64,
    pub photos_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        photo_delivery: state.animals.delivery().name().to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Remove every animal row and every blob in the store, orphans included.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state
        .db
        .purge_all()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let names = state
        .blob_store
        .list()
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let mut photos_deleted = 0;
    for name in &names {
        match state.blob_store.delete(name).await {
            Ok(()) => photos_deleted += 1,
            Err(e) => tracing::warn!(blob = %name, error = %e, "Failed to purge photo blob"),
        }
    }

    let orphans = names.len().saturating_sub(stats.photo_refs.len());
    tracing::warn!(
        animals = stats.animals,
        photos = photos_deleted,
        orphans,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        animals_deleted: stats.animals,
        photos_deleted,
    }))
}
