//! Process-local backend. Clones of a `MemoryBackend` share their
//! collections, so a second engine opened on the same name sees the data.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Backend, Collection, Opened, StoreResult, add_records, remove_records};
use crate::record::Vector;

type Records = Arc<Mutex<BTreeMap<String, Vector>>>;

#[derive(Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<Mutex<HashMap<String, Records>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    type Collection = MemoryCollection;

    async fn open(&self, name: &str) -> StoreResult<Opened<MemoryCollection>> {
        let mut collections = self.collections.lock().await;
        let is_new = !collections.contains_key(name);
        let records = collections.entry(name.to_string()).or_default().clone();

        Ok(Opened { collection: MemoryCollection { records }, is_new })
    }
}

pub struct MemoryCollection {
    records: Records,
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn get_all(&self) -> StoreResult<Vec<Vector>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn insert_one(&self, record: &Vector) -> StoreResult<()> {
        add_records(&mut *self.records.lock().await, std::slice::from_ref(record))
    }

    async fn insert_many(&self, records: &[Vector]) -> StoreResult<()> {
        add_records(&mut *self.records.lock().await, records)
    }

    async fn delete_one(&self, id: &str) -> StoreResult<()> {
        remove_records(&mut *self.records.lock().await, [id]);
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> StoreResult<()> {
        remove_records(&mut *self.records.lock().await, ids.iter().map(String::as_str));
        Ok(())
    }
}
