//! The database module
//! Provide connect, insert, delete and cosine similarity search over an
//! in-memory index mirrored to a persistent backend

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DotError, Result};
use crate::record::{Metadata, NewVector, SearchResult, Vector, VectorRecord};
use crate::store::{Backend, Collection, Opened};
use crate::vector::{cosine_similarity, magnitude};

/// A fixed-dimension vector store.
///
/// The backend's collection is the source of truth. `connect` loads it
/// wholesale into memory; every mutation is written to the backend first and
/// only applied to the in-memory map once that write succeeded.
///
/// Mutations take `&mut self`, so one instance has a single writer. Callers
/// sharing a store across tasks wrap it in a mutex (see `server`).
pub struct DotDB<B: Backend> {
    dimension: usize,
    backend: B,
    collection: Option<B::Collection>,
    vectors: HashMap<String, VectorRecord>,
}

impl<B: Backend> DotDB<B> {
    /// Creates an unconnected store for vectors of length `dimension`.
    ///
    /// # Errors
    ///
    /// * `DotError::InvalidDimension` - if `dimension` is zero
    ///
    /// # Examples
    ///
    /// ```
    /// use dotdb::{DotDB, MemoryBackend};
    ///
    /// let db = DotDB::new(3, MemoryBackend::new()).unwrap();
    /// assert_eq!(db.count(), 0);
    /// assert!(!db.is_connected());
    ///
    /// assert!(DotDB::new(0, MemoryBackend::new()).is_err());
    /// ```
    pub fn new(dimension: usize, backend: B) -> Result<Self> {
        if dimension == 0 {
            return Err(DotError::InvalidDimension(dimension));
        }

        Ok(DotDB {
            dimension,
            backend,
            collection: None,
            vectors: HashMap::new(),
        })
    }

    /// Opens (or creates) the named collection and loads every record into memory.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the collection did not exist and was created
    /// * `Ok(false)` - an existing collection was loaded
    /// * `Err(DotError::DimensionMismatch)` - a persisted vector has a different
    ///   length than this store's dimension; the store stays unconnected
    /// * `Err(DotError::Persistence)` - the backend failed to open or read
    ///
    /// # Examples
    ///
    /// ```
    /// use dotdb::{DotDB, MemoryBackend};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> dotdb::Result<()> {
    /// let backend = MemoryBackend::new();
    ///
    /// let mut db = DotDB::new(3, backend.clone())?;
    /// assert!(db.connect("vectors").await?);
    /// db.insert(vec![1.0, 0.0, 0.0], None).await?;
    ///
    /// // A second instance sees the persisted data
    /// let mut again = DotDB::new(3, backend.clone())?;
    /// assert!(!again.connect("vectors").await?);
    /// assert_eq!(again.count(), 1);
    ///
    /// // ...but only with the same dimension
    /// let mut wrong = DotDB::new(4, backend)?;
    /// assert!(wrong.connect("vectors").await.is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(&mut self, name: &str) -> Result<bool> {
        let Opened { collection, is_new } = self.backend.open(name).await?;
        let stored = collection.get_all().await?;

        if let Some(bad) = stored.iter().find(|v| v.values.len() != self.dimension) {
            warn!(
                store = name,
                expected = self.dimension,
                actual = bad.values.len(),
                "persisted vector dimension mismatch"
            );
            return Err(DotError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.values.len(),
            });
        }

        self.vectors = stored
            .into_iter()
            .map(|v| (v.id.clone(), VectorRecord::new(v)))
            .collect();
        self.collection = Some(collection);

        info!(store = name, is_new, records = self.vectors.len(), "connected");
        Ok(is_new)
    }

    /// Inserts a vector and returns its generated id.
    ///
    /// The record is written to the backend before it becomes visible to
    /// `search`. If that write fails nothing changes in memory.
    ///
    /// # Errors
    ///
    /// * `DotError::NotConnected` - `connect` has not succeeded
    /// * `DotError::DimensionMismatch` - `values.len()` differs from the dimension
    /// * `DotError::Persistence` - the backend rejected the write
    ///
    /// # Examples
    ///
    /// ```
    /// use dotdb::{DotDB, MemoryBackend, NewVector};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> dotdb::Result<()> {
    /// let mut db = DotDB::new(2, MemoryBackend::new())?;
    /// db.connect("vectors").await?;
    ///
    /// let meta = NewVector::new(vec![]).with_metadata("text", "hello").metadata;
    /// let id = db.insert(vec![3.0, 4.0], meta).await?;
    /// assert_eq!(db.get(&id).unwrap().values, vec![3.0, 4.0]);
    ///
    /// assert!(db.insert(vec![1.0, 2.0, 3.0], None).await.is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn insert(&mut self, values: Vec<f32>, metadata: Option<Metadata>) -> Result<String> {
        let collection = self.collection.as_ref().ok_or(DotError::NotConnected)?;
        self.check_dimension(values.len())?;

        let vector = Vector {
            id: Uuid::new_v4().to_string(),
            values,
            metadata,
        };

        if let Err(e) = collection.insert_one(&vector).await {
            warn!(id = %vector.id, error = %e, "insert rejected by backend");
            return Err(e.into());
        }

        let id = vector.id.clone();
        self.vectors.insert(id.clone(), VectorRecord::new(vector));
        debug!(id = %id, "inserted vector");

        Ok(id)
    }

    /// Inserts a batch with a single backend write and returns the ids in
    /// input order.
    ///
    /// Every entry is validated before anything is written. Whether a failed
    /// batch write is partial is up to the backend; both bundled backends are
    /// all-or-nothing. An empty batch does not touch the backend.
    pub async fn insert_many(&mut self, batch: Vec<NewVector>) -> Result<Vec<String>> {
        let collection = self.collection.as_ref().ok_or(DotError::NotConnected)?;
        for entry in &batch {
            self.check_dimension(entry.values.len())?;
        }

        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let vectors: Vec<Vector> = batch
            .into_iter()
            .map(|entry| Vector {
                id: Uuid::new_v4().to_string(),
                values: entry.values,
                metadata: entry.metadata,
            })
            .collect();

        if let Err(e) = collection.insert_many(&vectors).await {
            warn!(count = vectors.len(), error = %e, "batch insert rejected by backend");
            return Err(e.into());
        }

        let ids: Vec<String> = vectors.iter().map(|v| v.id.clone()).collect();
        for vector in vectors {
            self.vectors.insert(vector.id.clone(), VectorRecord::new(vector));
        }
        debug!(count = ids.len(), "inserted batch");

        Ok(ids)
    }

    /// Deletes a vector by id. Deleting an unknown id is not an error.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let collection = self.collection.as_ref().ok_or(DotError::NotConnected)?;
        collection.delete_one(id).await?;

        self.vectors.remove(id);
        debug!(id, "deleted vector");
        Ok(())
    }

    /// Deletes several vectors with one backend call. An empty slice is a no-op.
    pub async fn delete_many(&mut self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let collection = self.collection.as_ref().ok_or(DotError::NotConnected)?;
        collection.delete_many(ids).await?;

        for id in ids {
            self.vectors.remove(id);
        }
        debug!(count = ids.len(), "deleted vectors");
        Ok(())
    }

    /// Searches for the `top_k` vectors most similar to `query` by cosine similarity.
    ///
    /// Every stored vector is scored (a full linear scan). Results are ordered by
    /// descending score. Ties keep scan order, which is unspecified. A zero
    /// vector on either side scores NaN; such scores are returned as-is and
    /// rank below every finite score.
    ///
    /// # Arguments
    ///
    /// * `query` - Query vector, must have the store's dimension
    /// * `top_k` - Maximum number of results; `0` returns nothing
    ///
    /// # Returns
    ///
    /// At most `min(top_k, count())` results, each an independent copy of
    /// the stored vector paired with its score.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotdb::{DotDB, MemoryBackend, NewVector};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> dotdb::Result<()> {
    /// let mut db = DotDB::new(3, MemoryBackend::new())?;
    /// db.connect("colors").await?;
    /// db.insert_many(vec![
    ///     NewVector::new(vec![1.0, 0.0, 0.0]).with_metadata("text", "red"),
    ///     NewVector::new(vec![0.0, 1.0, 0.0]).with_metadata("text", "green"),
    ///     NewVector::new(vec![0.9, 0.1, 0.0]).with_metadata("text", "reddish"),
    /// ]).await?;
    ///
    /// let results = db.search(&[1.0, 0.0, 0.0], 2)?;
    /// let text = |i: usize| results[i].vector.metadata.as_ref().unwrap()["text"].as_str().unwrap().to_string();
    /// assert_eq!(text(0), "red");
    /// assert_eq!(text(1), "reddish");
    /// assert!((results[0].score - 1.0).abs() < 1e-4);
    /// # Ok(())
    /// # }
    /// ```
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if self.collection.is_none() {
            return Err(DotError::NotConnected);
        }
        self.check_dimension(query.len())?;

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_mag = magnitude(query);
        let scored = self.vectors.values().map(|record| {
            let score = cosine_similarity(query, query_mag, &record.vector.values, record.magnitude);
            (record, score)
        });

        let ranked: Vec<(&VectorRecord, f32)> = if top_k >= self.vectors.len() {
            // Everything is returned: one stable sort, best first
            let mut all: Vec<_> = scored.collect();
            all.sort_by(|(_, a), (_, b)| rank_key(*b).total_cmp(&rank_key(*a)));
            all
        } else {
            // Bounded sorted insertion, best first. `>=` places equal keys after
            // existing ones so ties stay in scan order.
            let mut best: Vec<(&VectorRecord, f32)> = Vec::with_capacity(top_k + 1);
            for (record, score) in scored {
                let key = rank_key(score);

                if best.len() == top_k && best.last().is_some_and(|(_, s)| rank_key(*s) >= key) {
                    continue;
                }

                let at = best.partition_point(|(_, s)| rank_key(*s) >= key);
                best.insert(at, (record, score));
                best.truncate(top_k);
            }
            best
        };

        Ok(ranked
            .into_iter()
            .map(|(record, score)| SearchResult {
                vector: record.vector.clone(),
                score,
            })
            .collect())
    }

    /// Returns a copy of every stored vector, in unspecified order.
    pub fn get_all(&self) -> Vec<Vector> {
        self.vectors.values().map(|r| r.vector.clone()).collect()
    }

    /// Returns a copy of the vector with `id`, if present.
    pub fn get(&self, id: &str) -> Option<Vector> {
        self.vectors.get(id).map(|r| r.vector.clone())
    }

    /// Returns the number of vectors in the database.
    pub fn count(&self) -> usize {
        self.vectors.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_connected(&self) -> bool {
        self.collection.is_some()
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(DotError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

/// Ordering key for scores: non-finite scores sink to the bottom.
fn rank_key(score: f32) -> f32 {
    if score.is_finite() { score } else { f32::NEG_INFINITY }
}
