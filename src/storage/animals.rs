use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Animal, AnimalFilter, AnimalPatch, AnimalUpdate, NewAnimal};
use super::tables::*;
use super::RecordStore;

impl RecordStore for Database {
    fn create_animal(&self, new: NewAnimal) -> Result<Animal, DatabaseError> {
        debug_assert!(!new.name.is_empty(), "animal name must not be empty");
        debug_assert!(!new.species.is_empty(), "animal species must not be empty");

        let write_txn = self.begin_write()?;
        let animal = {
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let id = sequences
                .get(ANIMAL_SEQUENCE)?
                .map(|v| v.value())
                .unwrap_or(0)
                + 1;
            sequences.insert(ANIMAL_SEQUENCE, id)?;

            let now = Utc::now();
            let animal = Animal {
                id,
                created_at: now,
                updated_at: now,
                name: new.name,
                species: new.species,
                birth_date: new.birth_date,
                rescue_date: new.rescue_date,
                description: new.description,
                adopted: new.adopted,
                photo_ref: new.photo_ref,
            };

            let mut table = write_txn.open_table(ANIMALS)?;
            let data = rmp_serde::to_vec_named(&animal)?;
            table.insert(id, data.as_slice())?;
            animal
        };
        write_txn.commit()?;
        Ok(animal)
    }

    fn get_animal(&self, id: u64) -> Result<Option<Animal>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ANIMALS)?;

        match table.get(id)? {
            Some(data) => {
                let animal: Animal = rmp_serde::from_slice(data.value())?;
                Ok(Some(animal))
            }
            None => Ok(None),
        }
    }

    fn list_animals(&self, filter: &AnimalFilter) -> Result<Vec<Animal>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ANIMALS)?;

        let mut animals = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let animal: Animal = rmp_serde::from_slice(value.value())?;
            if filter.matches(&animal) {
                animals.push(animal);
            }
        }

        Ok(animals)
    }

    fn update_animal(
        &self,
        id: u64,
        patch: &AnimalPatch,
    ) -> Result<Option<AnimalUpdate>, DatabaseError> {
        // Nothing to merge: report the row as it stands, no write and no updated_at bump
        if patch.is_empty() {
            return Ok(self.get_animal(id)?.map(|animal| AnimalUpdate {
                animal,
                replaced_photo: None,
            }));
        }

        let write_txn = self.begin_write()?;

        // Read-modify-write inside one transaction so concurrent writers
        // never lose each other's fields.
        let existing = {
            let table = write_txn.open_table(ANIMALS)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let animal: Animal = rmp_serde::from_slice(data.value())?;
                    Some(animal)
                }
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut animal) => {
                let replaced_photo = patch.apply(&mut animal);
                animal.updated_at = Utc::now();

                let serialized = rmp_serde::to_vec_named(&animal)?;
                let mut table = write_txn.open_table(ANIMALS)?;
                table.insert(id, serialized.as_slice())?;
                Some(AnimalUpdate {
                    animal,
                    replaced_photo,
                })
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    fn delete_animal(&self, id: u64) -> Result<Option<Animal>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let removed = {
            let mut table = write_txn.open_table(ANIMALS)?;
            let result = match table.remove(id)? {
                Some(data) => {
                    let animal: Animal = rmp_serde::from_slice(data.value())?;
                    Some(animal)
                }
                None => None,
            };
            result
        };

        write_txn.commit()?;
        Ok(removed)
    }

    fn find_photo_ref(&self, id: u64) -> Result<Option<String>, DatabaseError> {
        Ok(self.get_animal(id)?.and_then(|animal| animal.photo_ref))
    }
}
