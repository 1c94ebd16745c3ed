use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Three-state patch value for partial updates.
/// Unlike `Option<Option<T>>`, each variant has a distinct meaning at every layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Field was not included in the request (no change).
    #[default]
    Absent,
    /// Field was explicitly set to null (clear it).
    Null,
    /// Field was set to a new value.
    Value(T),
}

impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(v: Option<Option<T>>) -> Self {
        match v {
            None => Patch::Absent,
            Some(None) => Patch::Null,
            Some(Some(v)) => Patch::Value(v),
        }
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Collapse to a plain value, treating both absent and null as "none".
    pub fn into_value(self) -> Option<T> {
        match self {
            Patch::Value(v) => Some(v),
            Patch::Absent | Patch::Null => None,
        }
    }
}

/// An animal row stored in redb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    // System fields
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub name: String,
    pub species: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    pub rescue_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub adopted: bool,
    /// Name of the photo blob, if any.
    #[serde(default)]
    pub photo_ref: Option<String>,
}

/// Fields for a row that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewAnimal {
    pub name: String,
    pub species: String,
    pub birth_date: Option<NaiveDate>,
    pub rescue_date: NaiveDate,
    pub description: String,
    pub adopted: bool,
    pub photo_ref: Option<String>,
}

/// A merge patch: only fields that are present overwrite the stored row.
#[derive(Debug, Clone, Default)]
pub struct AnimalPatch {
    pub name: Option<String>,
    pub species: Option<String>,
    pub birth_date: Patch<NaiveDate>,
    pub rescue_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub adopted: Option<bool>,
    pub photo_ref: Option<String>,
}

impl AnimalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.species.is_none()
            && self.birth_date.is_absent()
            && self.rescue_date.is_none()
            && self.description.is_none()
            && self.adopted.is_none()
            && self.photo_ref.is_none()
    }

    /// Merge the patch into `animal`, returning the photo reference it displaced.
    pub fn apply(&self, animal: &mut Animal) -> Option<String> {
        if let Some(ref name) = self.name {
            animal.name = name.clone();
        }
        if let Some(ref species) = self.species {
            animal.species = species.clone();
        }
        match self.birth_date {
            Patch::Absent => {}
            Patch::Null => animal.birth_date = None,
            Patch::Value(date) => animal.birth_date = Some(date),
        }
        if let Some(date) = self.rescue_date {
            animal.rescue_date = date;
        }
        if let Some(ref description) = self.description {
            animal.description = description.clone();
        }
        if let Some(adopted) = self.adopted {
            animal.adopted = adopted;
        }

        match self.photo_ref {
            Some(ref new_ref) if animal.photo_ref.as_ref() != Some(new_ref) => {
                animal.photo_ref.replace(new_ref.clone())
            }
            _ => None,
        }
    }
}

/// Result of a committed update.
#[derive(Debug, Clone)]
pub struct AnimalUpdate {
    pub animal: Animal,
    /// Photo reference this update replaced; the blob is now unreferenced.
    pub replaced_photo: Option<String>,
}

/// Optional list filters.
#[derive(Debug, Clone, Default)]
pub struct AnimalFilter {
    pub species: Option<String>,
    pub adopted: Option<bool>,
}

impl AnimalFilter {
    pub fn matches(&self, animal: &Animal) -> bool {
        if let Some(ref species) = self.species {
            if !animal.species.eq_ignore_ascii_case(species) {
                return false;
            }
        }
        if let Some(adopted) = self.adopted {
            if animal.adopted != adopted {
                return false;
            }
        }
        true
    }
}
