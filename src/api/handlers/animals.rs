use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use bytes::BytesMut;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use super::{animal_error, base_url};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPage, Pagination};
use crate::auth::Claims;
use crate::coordinator::{AnimalError, AnimalInput, AnimalView, PhotoUpload};
use crate::photo::{upload_extension, PhotoRepresentation, DEFAULT_MEDIA_TYPE};
use crate::storage::models::{AnimalFilter, Patch};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AnimalResponse {
    pub adopted: bool,
    pub birth_date: Option<String>,
    pub description: String,
    pub id: u64,
    pub name: String,
    pub photo: Option<PhotoRepresentation>,
    pub photo_name: Option<String>,
    pub rescue_date: String,
    pub species: String,
}

/// JSON partial update. Omitted fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateAnimalRequest {
    #[serde(default)]
    pub adopted: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rescue_date: Option<NaiveDate>,
    #[serde(default)]
    pub species: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListAnimalsParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub adopted: Option<bool>,
}

fn default_limit() -> u32 {
    20
}

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

impl From<UpdateAnimalRequest> for AnimalInput {
    fn from(req: UpdateAnimalRequest) -> Self {
        AnimalInput {
            name: req.name,
            species: req.species,
            birth_date: Patch::from(req.birth_date),
            rescue_date: req.rescue_date.map_or(Patch::Absent, Patch::Value),
            description: req.description,
            adopted: req.adopted,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_animal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JSend<AnimalResponse>>), ApiError> {
    let (input, photo) = read_animal_form(&state, &mut multipart)
        .await
        .map_err(|e| animal_error(&state, e))?;

    let view = state
        .animals
        .create(input, photo, &base_url(&state, &headers))
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSend::created(view_to_response(view)))
}

pub async fn get_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JSend<AnimalResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let view = state
        .animals
        .get(id, &base_url(&state, &headers))
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSend::success(view_to_response(view)))
}

pub async fn list_animals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(params): AppQuery<ListAnimalsParams>,
) -> Result<Json<JSendPage<AnimalResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let filter = AnimalFilter {
        species: params.species.filter(|s| !s.trim().is_empty()),
        adopted: params.adopted,
    };

    let page = state
        .animals
        .list(
            &filter,
            params.offset as usize,
            params.limit as usize,
            &base_url(&state, &headers),
        )
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSendPage::success(
        page.items.into_iter().map(view_to_response).collect(),
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total: page.total,
        },
    ))
}

/// Multipart update; may carry a replacement photo.
pub async fn update_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<JSend<AnimalResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let (input, photo) = read_animal_form(&state, &mut multipart)
        .await
        .map_err(|e| animal_error(&state, e))?;

    let view = state
        .animals
        .update(id, input, photo, &base_url(&state, &headers))
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSend::success(view_to_response(view)))
}

/// JSON update of structured fields only.
pub async fn patch_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    AppJson(req): AppJson<UpdateAnimalRequest>,
) -> Result<Json<JSend<AnimalResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let view = state
        .animals
        .update(id, req.into(), None, &base_url(&state, &headers))
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSend::success(view_to_response(view)))
}

pub async fn adopt_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> Result<Json<JSend<AnimalResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let view = state
        .animals
        .adopt(id, &base_url(&state, &headers))
        .await
        .map_err(|e| animal_error(&state, e))?;

    tracing::debug!(animal_id = id, caller = ?claims.email, "Adoption recorded");
    Ok(JSend::success(view_to_response(view)))
}

pub async fn delete_animal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    let id = parse_id(&id)?;
    state
        .animals
        .delete(id)
        .await
        .map_err(|e| animal_error(&state, e))?;

    Ok(JSend::success(()))
}

// ============================================================================
// Form parsing
// ============================================================================

/// Read animal fields and an optional `photo` file from a multipart body.
/// The upload is checked against the size limit and media type allowlist here,
/// before anything reaches the coordinator.
async fn read_animal_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<(AnimalInput, Option<PhotoUpload>), AnimalError> {
    let limit = state.config.storage.max_upload_size;
    let mut input = AnimalInput::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "photo" => {
                photo = read_photo(state, field).await?;
            }
            "name" => input.name = Some(field_text(field, limit).await?),
            "species" => input.species = Some(field_text(field, limit).await?),
            "description" => input.description = Some(field_text(field, limit).await?),
            "birth_date" => {
                input.birth_date = parse_date(&field_text(field, limit).await?, "birth_date")?;
            }
            "rescue_date" => {
                input.rescue_date = parse_date(&field_text(field, limit).await?, "rescue_date")?;
            }
            "adopted" => input.adopted = Some(parse_flag(&field_text(field, limit).await?)?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok((input, photo))
}

async fn read_photo(
    state: &AppState,
    mut field: Field<'_>,
) -> Result<Option<PhotoUpload>, AnimalError> {
    let limit = state.config.storage.max_upload_size;
    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());
    let content_type = field
        .content_type()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(AnimalError::PayloadTooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }

    // An empty file input submits a nameless, empty part
    if buf.is_empty() && file_name.is_none() {
        return Ok(None);
    }

    // Determine MIME type: from multipart Content-Type, or guess from filename, or fallback
    let media_type = content_type
        .filter(|ct| ct != DEFAULT_MEDIA_TYPE)
        .or_else(|| {
            file_name
                .as_deref()
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.essence_str().to_string())
        })
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

    if !state.config.is_allowed_mime(&media_type) {
        return Err(AnimalError::UnsupportedMediaType(media_type));
    }

    if buf.is_empty() {
        return Err(AnimalError::Validation("photo must not be empty".to_string()));
    }

    let extension = upload_extension(file_name.as_deref(), &media_type);
    Ok(Some(PhotoUpload {
        data: buf.freeze(),
        media_type,
        extension,
    }))
}

async fn field_text(field: Field<'_>, limit: u64) -> Result<String, AnimalError> {
    let name = field.name().unwrap_or("field").to_string();
    field.text().await.map_err(|e| match multipart_error(e, limit) {
        AnimalError::Validation(msg) => AnimalError::Validation(format!("Invalid {name}: {msg}")),
        other => other,
    })
}

fn multipart_error(e: MultipartError, limit: u64) -> AnimalError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnimalError::PayloadTooLarge(limit)
    } else {
        AnimalError::Validation(format!("Invalid multipart data: {}", e.body_text()))
    }
}

/// Empty input means "no date" and is reported as an explicit null.
fn parse_date(raw: &str, field: &str) -> Result<Patch<NaiveDate>, AnimalError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Patch::Null);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Patch::Value)
        .map_err(|_| AnimalError::Validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

fn parse_flag(raw: &str) -> Result<bool, AnimalError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        other => Err(AnimalError::Validation(format!(
            "adopted must be a boolean (got '{other}')"
        ))),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("Animal {raw} not found")))
}

fn view_to_response(view: AnimalView) -> AnimalResponse {
    let AnimalView { animal, photo } = view;
    AnimalResponse {
        adopted: animal.adopted,
        birth_date: animal.birth_date.map(format_date),
        description: animal.description,
        id: animal.id,
        name: animal.name,
        photo,
        photo_name: animal.photo_ref,
        rescue_date: format_date(animal.rescue_date),
        species: animal.species,
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
