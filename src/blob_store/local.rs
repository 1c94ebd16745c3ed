use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{generate_name, validate_name, BlobReader, BlobStore, BlobStoreError};

/// Filesystem blob store. Every blob is a single file directly under `base_path`.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, name: &str) -> Result<PathBuf, BlobStoreError> {
        validate_name(name)?;
        Ok(self.base_path.join(name))
    }
}

fn not_found_or_io(name: &str, e: std::io::Error) -> BlobStoreError {
    if e.kind() == ErrorKind::NotFound {
        BlobStoreError::NotFound(name.to_string())
    } else {
        BlobStoreError::Io(e)
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn save(&self, data: Bytes, extension: &str) -> Result<String, BlobStoreError> {
        let name = generate_name(extension);
        let path = self.blob_path(&name)?;

        // create_new: an existing name is never overwritten
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(blob = %name, error = %cleanup, "Failed to remove partially written blob");
            }
            return Err(e.into());
        }

        Ok(name)
    }

    async fn read(&self, name: &str) -> Result<Bytes, BlobStoreError> {
        let path = self.blob_path(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))?;
        Ok(Bytes::from(data))
    }

    async fn open(&self, name: &str) -> Result<BlobReader, BlobStoreError> {
        let path = self.blob_path(name)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(name, e))?;
        Ok(Box::pin(file))
    }

    async fn delete(&self, name: &str) -> Result<(), BlobStoreError> {
        let path = self.blob_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, BlobStoreError> {
        let path = match self.blob_path(name) {
            Ok(path) => path,
            Err(_) => return Ok(false),
        };
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn list(&self) -> Result<Vec<String>, BlobStoreError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
