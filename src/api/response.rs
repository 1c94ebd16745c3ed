//! JSend envelopes for every JSON response the animal API produces.
//!
//! Success bodies are `{"status":"success","data":...}`. Client errors are
//! `{"status":"fail","data":{"message":...}}`. Server errors are
//! `{"status":"error","message":...}`, with `details` only in development.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

// ============================================================================
// Success envelopes
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }

    /// A success envelope sent with `201 Created`.
    pub fn created(data: T) -> (StatusCode, Json<JSend<T>>) {
        (StatusCode::CREATED, Self::success(data))
    }
}

/// One page of a list query together with its position in the full result.
#[derive(Debug, Serialize)]
pub struct JSendPage<T: Serialize> {
    pub data: PageData<T>,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize)]
pub struct PageData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

impl<T: Serialize> JSendPage<T> {
    pub fn success(items: Vec<T>, pagination: Pagination) -> Json<JSendPage<T>> {
        Json(JSendPage {
            data: PageData { items, pagination },
            status: JSendStatus::Success,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize)]
struct FailBody {
    data: FailData,
    status: JSendStatus,
}

#[derive(Debug, Serialize)]
struct FailData {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    message: String,
    status: JSendStatus,
}

/// Handler error rendered as a JSend `fail` (4xx) or `error` (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail {
        status: StatusCode,
        message: String,
    },
    Error {
        status: StatusCode,
        message: String,
        details: Option<String>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fail { status, message } => {
                let body = FailBody {
                    data: FailData { message },
                    status: JSendStatus::Fail,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Error {
                status,
                message,
                details,
            } => {
                let body = ErrorBody {
                    details,
                    message,
                    status: JSendStatus::Error,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl ApiError {
    fn fail(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Fail {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::NOT_FOUND, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::fail(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: None,
        }
    }

    /// A 500 that carries `details` only when `expose` is set (development mode).
    pub fn internal_with_details(message: impl Into<String>, details: String, expose: bool) -> Self {
        ApiError::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            details: expose.then_some(details),
        }
    }
}

// ============================================================================
// Extractors that reject with JSend bodies
// ============================================================================

/// `axum::Json` that rejects with a JSend `fail`.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let rejection = match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => return Ok(AppJson(value)),
            Err(rejection) => rejection,
        };

        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid animal fields: {}", err.body_text()),
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Expected Content-Type: application/json (use multipart/form-data with PUT to upload a photo)"
                    .to_string()
            }
            other => format!("Failed to read request body: {}", other.body_text()),
        };
        Err(ApiError::bad_request(message))
    }
}

/// Query-string extractor backed by `serde_qs` that rejects with a JSend `fail`.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Replace Rust type names in serde_qs messages with what a client can act on.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("a boolean", "true or false");

    format!("Invalid query parameter: {cleaned}")
}
