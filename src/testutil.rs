//! Shared test helpers for shelter-records router tests.

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::blob_store::LocalStore;
use crate::config::{Config, PhotoConfig, ServerConfig, StorageConfig};
use crate::photo::PhotoDelivery;
use crate::storage::Database;
use crate::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret";

/// Upload limit used by test state: small enough to exceed cheaply.
pub const TEST_MAX_UPLOAD_SIZE: u64 = 4 * 1024;

/// Create a test AppState with a temporary database and local blob store.
pub fn test_state(temp_dir: &tempfile::TempDir, delivery: PhotoDelivery) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let upload_dir = temp_dir.path().join("uploads");

    let config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_string_lossy().to_string(),
            max_upload_size: TEST_MAX_UPLOAD_SIZE,
            ..StorageConfig::default()
        },
        photos: PhotoConfig {
            delivery,
            public_base_url: None,
        },
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        cors_allowed_origins: Vec::new(),
        dev_mode: false,
        test_mode: true,
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let blob_store = LocalStore::new(&upload_dir).expect("Failed to create test blob store");

    Arc::new(AppState::new(config, db, Arc::new(blob_store)))
}

/// Sign an HS256 token the way the auth service does.
pub fn sign_token(secret: &str, exp: i64) -> String {
    let claims = crate::auth::Claims {
        id: Some(1),
        email: Some("staff@shelter.test".to_string()),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("claims encode")
}

/// Minimal multipart/form-data body builder.
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("----shelter-{}", uuid::Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.buf,
        )
    }
}
