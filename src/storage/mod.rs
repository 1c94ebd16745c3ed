mod animals;
pub mod db;
pub mod models;
mod tables;

pub use db::{Database, DatabaseError, PurgeStats};
pub use tables::*;

use models::{Animal, AnimalFilter, AnimalPatch, AnimalUpdate, NewAnimal};

/// Relational store for animal rows.
///
/// Each method runs in its own transaction. `Database` is the production
/// implementation; the coordinator only sees this trait.
pub trait RecordStore: Send + Sync {
    fn create_animal(&self, new: NewAnimal) -> Result<Animal, DatabaseError>;
    fn get_animal(&self, id: u64) -> Result<Option<Animal>, DatabaseError>;
    /// All rows matching `filter`, ordered by id.
    fn list_animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>, DatabaseError>;
    /// Apply a merge patch. `None` if the row does not exist.
    fn update_animal(&self, id: u64, patch: &AnimalPatch)
        -> Result<Option<AnimalUpdate>, DatabaseError>;
    /// Remove a row, returning it. `None` if the row does not exist.
    fn delete_animal(&self, id: u64) -> Result<Option<Animal>, DatabaseError>;
    /// Current photo reference of an animal; `None` when the row is missing or has no photo.
    fn find_photo_ref(&self, id: u64) -> Result<Option<String>, DatabaseError>;
}
