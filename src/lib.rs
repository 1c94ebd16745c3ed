//! shelter-records - Record management for shelter animals
//!
//! Each animal row owns exactly one photo blob. This crate provides:
//! - A filesystem blob store with generated, write-once names
//! - redb embedded database for animal rows (ACID, MVCC, crash-safe)
//! - A lifecycle coordinator that keeps rows and blobs consistent across failures
//! - Inline, redirect, or streamed photo delivery
//! - REST API with multipart upload support

pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod coordinator;
pub mod photo;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use auth::TokenVerifier;
use blob_store::BlobStore;
use config::Config;
use coordinator::AnimalCoordinator;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub blob_store: Arc<dyn BlobStore>,
    pub animals: AnimalCoordinator,
    pub token_verifier: Option<TokenVerifier>,
}

impl AppState {
    pub fn new(config: Config, db: Database, blob_store: Arc<dyn BlobStore>) -> Self {
        let animals = AnimalCoordinator::new(
            Arc::new(db.clone()),
            Arc::clone(&blob_store),
            config.photos.delivery,
        );
        let token_verifier = config.jwt_secret.as_deref().map(TokenVerifier::new);

        Self {
            config,
            db,
            blob_store,
            animals,
            token_verifier,
        }
    }
}
