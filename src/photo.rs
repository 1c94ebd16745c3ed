//! Turning a stored photo reference into something a client can display.
//!
//! Three interchangeable delivery strategies are supported; a deployment picks
//! one through `PHOTO_DELIVERY`:
//! - `inline`: the blob is read and embedded as a `data:` URI
//! - `redirect`: a URL to the static `/uploads/` route, optionally cache-busted
//! - `streamed`: a URL to the `/api/animals/imagem/` streaming endpoint

use std::sync::Arc;

use base64::Engine;
use serde::{Serialize, Serializer};

use crate::blob_store::{BlobStore, BlobStoreError};

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Path prefix of the static-file route.
pub const STATIC_PREFIX: &str = "/uploads";

/// Path prefix of the streaming route.
pub const STREAM_PREFIX: &str = "/api/animals/imagem";

/// Media type served for a blob extension. Only these extensions are ever
/// picked for new uploads, so stored photos always map to an image type.
fn media_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Infer a photo's media type from the extension of its blob name.
pub fn media_type_for(name: &str) -> &'static str {
    name.rsplit_once('.')
        .map_or(DEFAULT_MEDIA_TYPE, |(_, ext)| media_type_for_extension(ext))
}

/// Pick the extension a new blob is saved with.
///
/// The client's extension is kept only when it is one `media_type_for` maps
/// back to the upload's media type (`cat.jfif` is stored as `.jpg`).
pub fn upload_extension(file_name: Option<&str>, media_type: &str) -> String {
    let from_name = file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| media_type_for_extension(ext) == media_type);

    if let Some(ext) = from_name {
        return format!(".{ext}");
    }

    match media_type {
        "image/png" => ".png".to_string(),
        "image/jpeg" => ".jpg".to_string(),
        "image/gif" => ".gif".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default(),
    }
}

/// How photo references are rendered in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoDelivery {
    Inline,
    Redirect { cache_bust: bool },
    Streamed,
}

impl PhotoDelivery {
    /// Parse a mode name (`inline`, `redirect`, `streamed`).
    pub fn parse(mode: &str, cache_bust: bool) -> Option<Self> {
        match mode.trim().to_lowercase().as_str() {
            "inline" | "base64" => Some(PhotoDelivery::Inline),
            "redirect" | "static" | "url" => Some(PhotoDelivery::Redirect { cache_bust }),
            "streamed" | "stream" => Some(PhotoDelivery::Streamed),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhotoDelivery::Inline => "inline",
            PhotoDelivery::Redirect { .. } => "redirect",
            PhotoDelivery::Streamed => "streamed",
        }
    }
}

/// Client-facing form of a photo. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoRepresentation {
    /// `data:<media type>;base64,<payload>`
    DataUri(String),
    Url(String),
}

impl PhotoRepresentation {
    pub fn as_str(&self) -> &str {
        match self {
            PhotoRepresentation::DataUri(s) | PhotoRepresentation::Url(s) => s,
        }
    }
}

impl Serialize for PhotoRepresentation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn data_uri(name: &str, bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{payload}", media_type_for(name))
}

/// Materializes photo references according to the configured delivery mode.
pub struct PhotoCodec {
    store: Arc<dyn BlobStore>,
    delivery: PhotoDelivery,
}

impl PhotoCodec {
    pub fn new(store: Arc<dyn BlobStore>, delivery: PhotoDelivery) -> Self {
        Self { store, delivery }
    }

    pub fn delivery(&self) -> PhotoDelivery {
        self.delivery
    }

    /// Render `photo_ref` for a response. `base_url` is `<scheme>://<host>`
    /// and only matters for the URL-based modes.
    ///
    /// URL modes still check the blob exists so a response never links to a
    /// photo that is already gone.
    pub async fn materialize(
        &self,
        photo_ref: Option<&str>,
        base_url: &str,
    ) -> Result<Option<PhotoRepresentation>, BlobStoreError> {
        let Some(name) = photo_ref else {
            return Ok(None);
        };

        let representation = match self.delivery {
            PhotoDelivery::Inline => {
                let bytes = self.store.read(name).await?;
                PhotoRepresentation::DataUri(data_uri(name, &bytes))
            }
            PhotoDelivery::Redirect { cache_bust } => {
                self.ensure_exists(name).await?;
                let base = base_url.trim_end_matches('/');
                let mut url = format!("{base}{STATIC_PREFIX}/{name}");
                if cache_bust {
                    url.push_str(&format!("?v={}", chrono::Utc::now().timestamp_millis()));
                }
                PhotoRepresentation::Url(url)
            }
            PhotoDelivery::Streamed => {
                self.ensure_exists(name).await?;
                let base = base_url.trim_end_matches('/');
                PhotoRepresentation::Url(format!("{base}{STREAM_PREFIX}/{name}"))
            }
        };

        Ok(Some(representation))
    }

    async fn ensure_exists(&self, name: &str) -> Result<(), BlobStoreError> {
        if self.store.exists(name).await? {
            Ok(())
        } else {
            Err(BlobStoreError::NotFound(name.to_string()))
        }
    }
}
