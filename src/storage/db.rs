use redb::{Database as RedbDatabase, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::models::Animal;
use super::tables::*;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Redb(Box<redb::Error>),
    #[error("Corrupt animal row: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Failed to encode animal row: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// redb splits its errors by operation; all of them widen into `redb::Error`.
macro_rules! from_redb {
    ($($source:ty),+ $(,)?) => {$(
        impl From<$source> for DatabaseError {
            fn from(e: $source) -> Self {
                DatabaseError::Redb(Box::new(e.into()))
            }
        }
    )+};
}

from_redb!(
    redb::Error,
    redb::CommitError,
    redb::DatabaseError,
    redb::StorageError,
    redb::TableError,
    redb::TransactionError,
);

/// Handle to the embedded animal database. Clones share one redb instance.
#[derive(Clone)]
pub struct Database {
    db: Arc<RedbDatabase>,
}

/// Statistics from a purge operation
#[derive(Debug, Default)]
pub struct PurgeStats {
    pub animals: u64,
    /// Photo references held by the purged rows.
    pub photo_refs: Vec<String>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("shelter-records.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        // Initialize application tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ANIMALS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Begin a read transaction
    pub fn begin_read(&self) -> Result<ReadTransaction, DatabaseError> {
        Ok(self.db.begin_read()?)
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> Result<WriteTransaction, DatabaseError> {
        Ok(self.db.begin_write()?)
    }

    // ========================================================================
    // Admin operations
    // ========================================================================

    /// Purge all animal rows - for testing only. Id sequences are left alone.
    pub fn purge_all(&self) -> Result<PurgeStats, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut stats = PurgeStats::default();

        {
            let table = write_txn.open_table(ANIMALS)?;
            let rows: Vec<(u64, Vec<u8>)> = table
                .iter()?
                .map(|r| r.map(|(k, v)| (k.value(), v.value().to_vec())))
                .collect::<Result<Vec<_>, _>>()?;
            drop(table);

            let mut table = write_txn.open_table(ANIMALS)?;
            for (id, data) in rows {
                let animal: Animal = rmp_serde::from_slice(&data)?;
                if let Some(photo) = animal.photo_ref {
                    stats.photo_refs.push(photo);
                }
                table.remove(id)?;
                stats.animals += 1;
            }
        }

        write_txn.commit()?;
        Ok(stats)
    }
}
