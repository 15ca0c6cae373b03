//! Persistence contract between the vector store and its durable backing.
//!
//! The engine needs only bulk load plus add/delete; it never asks a backend
//! to filter or search. Every call is all-or-nothing from the caller's
//! point of view.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::record::Vector;

mod file;
mod memory;

pub use file::{FileBackend, FileCollection};
pub use memory::{MemoryBackend, MemoryCollection};

pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

/// A durable collection of vector records keyed by id.
#[async_trait]
pub trait Collection: Send + Sync {
    async fn get_all(&self) -> StoreResult<Vec<Vector>>;

    /// Adds one record. Fails with `DuplicateId` if the id is present.
    async fn insert_one(&self, record: &Vector) -> StoreResult<()>;

    /// Adds all records or none of them.
    async fn insert_many(&self, records: &[Vector]) -> StoreResult<()>;

    /// Removing an absent id succeeds.
    async fn delete_one(&self, id: &str) -> StoreResult<()>;

    async fn delete_many(&self, ids: &[String]) -> StoreResult<()>;
}

/// Opened collection plus whether this open created it.
pub struct Opened<C> {
    pub collection: C,
    pub is_new: bool,
}

/// Opens (creating if absent) named collections.
#[async_trait]
pub trait Backend: Send + Sync {
    type Collection: Collection;

    async fn open(&self, name: &str) -> StoreResult<Opened<Self::Collection>>;
}

/// Adds `records` to `map` with add-only semantics. Nothing is inserted
/// unless every id is new, including ids repeated inside the batch.
pub(crate) fn add_records(map: &mut BTreeMap<String, Vector>, records: &[Vector]) -> StoreResult<()> {
    for (i, record) in records.iter().enumerate() {
        let repeated = records[..i].iter().any(|r| r.id == record.id);
        if repeated || map.contains_key(&record.id) {
            return Err(PersistenceError::DuplicateId(record.id.clone()));
        }
    }

    for record in records {
        map.insert(record.id.clone(), record.clone());
    }

    Ok(())
}

/// Removes `ids` from `map`, returning how many were present.
pub(crate) fn remove_records<'a>(
    map: &mut BTreeMap<String, Vector>,
    ids: impl IntoIterator<Item = &'a str>,
) -> usize {
    ids.into_iter().filter(|id| map.remove(*id).is_some()).count()
}
