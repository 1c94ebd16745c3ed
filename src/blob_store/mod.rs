mod local;

pub use local::LocalStore;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Invalid blob name: {0}")]
    InvalidName(String),
}

/// Byte source for streaming a blob without buffering it in memory.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Abstraction over photo blob storage.
///
/// Blobs are write-once: `save` always picks a fresh name and never replaces
/// existing bytes. Names are generated by the store, never by clients.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `data` under a newly generated name ending in `extension`.
    async fn save(&self, data: Bytes, extension: &str) -> Result<String, BlobStoreError>;
    async fn read(&self, name: &str) -> Result<Bytes, BlobStoreError>;
    async fn open(&self, name: &str) -> Result<BlobReader, BlobStoreError>;
    /// Remove a blob. A missing blob counts as already deleted.
    async fn delete(&self, name: &str) -> Result<(), BlobStoreError>;
    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError>;
    async fn list(&self) -> Result<Vec<String>, BlobStoreError>;
}

/// Generate a collision-resistant blob name: `<unix millis>-<random><ext>`.
pub fn generate_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple();
    format!("{millis}-{suffix}{}", normalize_extension(extension))
}

/// Reduce a suggested extension to `.` followed by ASCII alphanumerics, or nothing.
fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty()
        || trimmed.len() > 8
        || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", trimmed.to_ascii_lowercase())
}

/// Reject names that could escape the store's root directory.
pub fn validate_name(name: &str) -> Result<(), BlobStoreError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(BlobStoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
