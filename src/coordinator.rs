//! Animal lifecycle: keeps animal rows and their photo blobs consistent.
//!
//! Writes follow one discipline: stage the blob, commit the row, and only then
//! let go of the staged blob. Any failure after staging discards the blob, so
//! a visible row never references a missing photo and failed writes leave no
//! orphans behind. Retiring a superseded or deleted photo is best-effort and
//! never changes the outcome of the operation that triggered it.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blob_store::{BlobStore, BlobStoreError};
use crate::photo::{PhotoCodec, PhotoDelivery, PhotoRepresentation};
use crate::storage::models::{Animal, AnimalFilter, AnimalPatch, NewAnimal, Patch};
use crate::storage::{DatabaseError, RecordStore};

#[derive(Debug, Error)]
pub enum AnimalError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("File exceeds maximum upload size of {0} bytes")]
    PayloadTooLarge(u64),
    #[error("Storage error: {0}")]
    StorageIo(#[from] BlobStoreError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

fn animal_not_found(id: u64) -> AnimalError {
    AnimalError::NotFound(format!("Animal {id} not found"))
}

/// A validated photo upload, ready to be staged.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub data: Bytes,
    pub media_type: String,
    /// Extension (with leading dot) the blob is saved under.
    pub extension: String,
}

/// Client-supplied animal fields. Every field is optional at this layer;
/// presence is what distinguishes "set" from "keep".
#[derive(Debug, Clone, Default)]
pub struct AnimalInput {
    pub name: Option<String>,
    pub species: Option<String>,
    pub birth_date: Patch<NaiveDate>,
    pub rescue_date: Patch<NaiveDate>,
    pub description: Option<String>,
    pub adopted: Option<bool>,
}

/// An animal together with its materialized photo.
#[derive(Debug, Clone)]
pub struct AnimalView {
    pub animal: Animal,
    pub photo: Option<PhotoRepresentation>,
}

/// A page of animals from a list query.
#[derive(Debug, Clone)]
pub struct AnimalPage {
    pub items: Vec<AnimalView>,
    pub total: u64,
}

/// A blob written ahead of its row commit.
///
/// Must end in `keep` (the row now references it) or `discard` (roll back).
/// Dropping it armed (a dropped request future, or a record store that
/// panics mid-commit) schedules a background delete.
#[must_use = "a staged blob must be kept or discarded"]
struct StagedBlob {
    store: Arc<dyn BlobStore>,
    name: String,
    armed: bool,
}

impl StagedBlob {
    async fn stage(store: &Arc<dyn BlobStore>, photo: PhotoUpload) -> Result<Self, BlobStoreError> {
        let name = store.save(photo.data, &photo.extension).await?;
        debug!(blob = %name, media_type = %photo.media_type, "Staged photo blob");
        Ok(Self {
            store: Arc::clone(store),
            name,
            armed: true,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn keep(mut self) {
        self.armed = false;
    }

    async fn discard(mut self) {
        self.armed = false;
        retire(self.store.as_ref(), &self.name, "rollback").await;
    }
}

impl Drop for StagedBlob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let name = std::mem::take(&mut self.name);
        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { retire(store.as_ref(), &name, "abandoned").await });
            }
            Err(_) => warn!(blob = %name, "Staged blob abandoned outside a runtime"),
        }
    }
}

/// Best-effort blob removal: failures are logged, never propagated.
async fn retire(store: &dyn BlobStore, name: &str, reason: &'static str) {
    match store.delete(name).await {
        Ok(()) => debug!(blob = %name, reason, "Retired photo blob"),
        Err(e) => warn!(blob = %name, reason, error = %e, "Failed to retire photo blob"),
    }
}

/// Trimmed value of a required text field, `None` when missing or blank.
fn required_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Orchestrates the record store and blob store for every animal operation.
pub struct AnimalCoordinator {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    codec: PhotoCodec,
}

impl AnimalCoordinator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        delivery: PhotoDelivery,
    ) -> Self {
        let codec = PhotoCodec::new(Arc::clone(&blobs), delivery);
        Self {
            records,
            blobs,
            codec,
        }
    }

    pub fn delivery(&self) -> PhotoDelivery {
        self.codec.delivery()
    }

    /// Create an animal. A photo is mandatory.
    pub async fn create(
        &self,
        input: AnimalInput,
        photo: Option<PhotoUpload>,
        base_url: &str,
    ) -> Result<AnimalView, AnimalError> {
        let photo =
            photo.ok_or_else(|| AnimalError::Validation("photo is required".to_string()))?;

        let (name, species) = match (required_text(input.name), required_text(input.species)) {
            (Some(name), Some(species)) => (name, species),
            _ => {
                return Err(AnimalError::Validation(
                    "name and species are required".to_string(),
                ))
            }
        };

        let rescue_date = input
            .rescue_date
            .into_value()
            .unwrap_or_else(|| Utc::now().date_naive());

        let staged = StagedBlob::stage(&self.blobs, photo).await?;

        let new_animal = NewAnimal {
            name,
            species,
            birth_date: input.birth_date.into_value(),
            rescue_date,
            description: input.description.unwrap_or_default(),
            adopted: false,
            photo_ref: Some(staged.name().to_string()),
        };

        let animal = match self.records.create_animal(new_animal) {
            Ok(animal) => animal,
            Err(e) => {
                staged.discard().await;
                return Err(AnimalError::Persistence(e));
            }
        };
        staged.keep();

        info!(animal_id = animal.id, "Created animal");
        Ok(self.view(animal, base_url).await)
    }

    pub async fn get(&self, id: u64, base_url: &str) -> Result<AnimalView, AnimalError> {
        let animal = self
            .records
            .get_animal(id)?
            .ok_or_else(|| animal_not_found(id))?;
        Ok(self.view(animal, base_url).await)
    }

    /// One page of animals matching `filter`, plus the total match count.
    ///
    /// Only the requested page is materialized, so inline delivery reads just
    /// the blobs it returns.
    pub async fn list(
        &self,
        filter: &AnimalFilter,
        offset: usize,
        limit: usize,
        base_url: &str,
    ) -> Result<AnimalPage, AnimalError> {
        let animals = self.records.list_animals(filter)?;
        let total = animals.len() as u64;

        let mut items = Vec::with_capacity(limit.min(animals.len()));
        for animal in animals.into_iter().skip(offset).take(limit) {
            items.push(self.view(animal, base_url).await);
        }
        Ok(AnimalPage { items, total })
    }

    /// Merge-update an animal, optionally replacing its photo.
    /// An update that carries nothing returns the record unchanged.
    pub async fn update(
        &self,
        id: u64,
        input: AnimalInput,
        photo: Option<PhotoUpload>,
        base_url: &str,
    ) -> Result<AnimalView, AnimalError> {
        let mut patch = Self::merge_patch(input)?;

        if self.records.get_animal(id)?.is_none() {
            return Err(animal_not_found(id));
        }

        let staged = match photo {
            Some(photo) => Some(StagedBlob::stage(&self.blobs, photo).await?),
            None => None,
        };
        patch.photo_ref = staged.as_ref().map(|s| s.name().to_string());

        let update = match self.records.update_animal(id, &patch) {
            Ok(Some(update)) => update,
            Ok(None) => {
                // Removed between load and commit
                if let Some(staged) = staged {
                    staged.discard().await;
                }
                return Err(animal_not_found(id));
            }
            Err(e) => {
                if let Some(staged) = staged {
                    staged.discard().await;
                }
                return Err(AnimalError::Persistence(e));
            }
        };
        if let Some(staged) = staged {
            staged.keep();
        }

        if let Some(ref old) = update.replaced_photo {
            retire(self.blobs.as_ref(), old, "superseded").await;
        }

        info!(animal_id = id, photo_replaced = update.replaced_photo.is_some(), "Updated animal");
        Ok(self.view(update.animal, base_url).await)
    }

    /// Build a merge patch from client input. Only fields that are present
    /// are carried over, so `adopted: false` is an explicit un-adopt.
    fn merge_patch(input: AnimalInput) -> Result<AnimalPatch, AnimalError> {
        let name = match input.name {
            Some(name) => Some(
                required_text(Some(name))
                    .ok_or_else(|| AnimalError::Validation("name must not be empty".to_string()))?,
            ),
            None => None,
        };
        let species = match input.species {
            Some(species) => Some(required_text(Some(species)).ok_or_else(|| {
                AnimalError::Validation("species must not be empty".to_string())
            })?),
            None => None,
        };
        let rescue_date = match input.rescue_date {
            Patch::Absent => None,
            Patch::Null => {
                return Err(AnimalError::Validation(
                    "rescue_date cannot be cleared".to_string(),
                ))
            }
            Patch::Value(date) => Some(date),
        };

        Ok(AnimalPatch {
            name,
            species,
            birth_date: input.birth_date,
            rescue_date,
            description: input.description,
            adopted: input.adopted,
            photo_ref: None,
        })
    }

    /// Mark an animal as adopted.
    pub async fn adopt(&self, id: u64, base_url: &str) -> Result<AnimalView, AnimalError> {
        let patch = AnimalPatch {
            adopted: Some(true),
            ..Default::default()
        };
        let update = self
            .records
            .update_animal(id, &patch)?
            .ok_or_else(|| animal_not_found(id))?;

        info!(animal_id = id, "Animal adopted");
        Ok(self.view(update.animal, base_url).await)
    }

    /// Delete an animal and retire its photo. Returns the removed row.
    pub async fn delete(&self, id: u64) -> Result<Animal, AnimalError> {
        // Row first: once it is gone no reader can reach the photo.
        let removed = self
            .records
            .delete_animal(id)?
            .ok_or_else(|| animal_not_found(id))?;

        if let Some(ref photo) = removed.photo_ref {
            retire(self.blobs.as_ref(), photo, "deleted").await;
        }

        info!(animal_id = id, "Deleted animal");
        Ok(removed)
    }

    /// Name of the blob currently holding an animal's photo.
    pub fn photo_of(&self, id: u64) -> Result<String, AnimalError> {
        self.records
            .find_photo_ref(id)?
            .ok_or_else(|| AnimalError::NotFound(format!("Animal {id} has no photo")))
    }

    /// Materialize the photo; an unreadable blob degrades to no photo.
    async fn view(&self, animal: Animal, base_url: &str) -> AnimalView {
        let photo = match self
            .codec
            .materialize(animal.photo_ref.as_deref(), base_url)
            .await
        {
            Ok(photo) => photo,
            Err(e) => {
                warn!(animal_id = animal.id, error = %e, "Photo unavailable, returning record without it");
                None
            }
        };
        AnimalView { animal, photo }
    }
}
