use thiserror::Error;

use crate::photo::PhotoDelivery;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub photos: PhotoConfig,
    /// HS256 secret shared with the auth service. Without it, gated routes reject everything.
    pub jwt_secret: Option<String>,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Include internal error detail in 5xx responses.
    pub dev_mode: bool,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding photo blobs
    pub upload_dir: String,
    /// Maximum photo size in bytes
    pub max_upload_size: u64,
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PhotoConfig {
    pub delivery: PhotoDelivery,
    /// Overrides the request-derived `<scheme>://<host>` in photo URLs.
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "./uploads".to_string(),
            max_upload_size: 5 * 1024 * 1024, // 5MB
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            delivery: PhotoDelivery::Inline,
            public_base_url: None,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5 * 1024 * 1024);

        let allowed_mime_types = std::env::var("ALLOWED_MIME_TYPES")
            .map(|v| split_list(&v.to_lowercase()))
            .unwrap_or_else(|_| StorageConfig::default().allowed_mime_types);

        let delivery_name = std::env::var("PHOTO_DELIVERY").unwrap_or_else(|_| "inline".to_string());
        let delivery = PhotoDelivery::parse(&delivery_name, env_flag("PHOTO_CACHE_BUST"))
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "PHOTO_DELIVERY must be one of inline, redirect, streamed (got '{delivery_name}')"
                ))
            })?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        let dev_mode = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let config = Config {
            server: ServerConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                upload_dir,
                max_upload_size,
                allowed_mime_types,
            },
            photos: PhotoConfig {
                delivery,
                public_base_url,
            },
            jwt_secret,
            cors_allowed_origins,
            dev_mode,
            test_mode: env_flag("TEST_MODE"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.storage.allowed_mime_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_MIME_TYPES cannot be empty".to_string(),
            ));
        }

        if let Some(ref url) = self.photos.public_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "PUBLIC_BASE_URL must start with http:// or https:// (got '{url}')"
                )));
            }
        }

        if self.jwt_secret.is_none() {
            tracing::warn!("JWT_SECRET is not set. Adopt requests will be rejected.");
        }

        Ok(())
    }

    /// Check whether an upload's media type is on the allowlist.
    pub fn is_allowed_mime(&self, media_type: &str) -> bool {
        self.storage
            .allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(media_type))
    }
}
