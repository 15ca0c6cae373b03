//! Bincode file backend: one `<name>.dotdb` file per collection.
//!
//! Each mutating call serializes the next state to a temporary file and
//! renames it over the current one, so the file on disk is always either the
//! state before the call or the state after it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Backend, Collection, Opened, StoreResult, add_records, remove_records};
use crate::error::PersistenceError;
use crate::record::Vector;

const FILE_EXTENSION: &str = "dotdb";

#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileBackend { root: root.into() }
    }

    fn path_for(&self, name: &str) -> StoreResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !name.starts_with('.');
        if !valid {
            return Err(PersistenceError::Backend(format!("Invalid store name '{}'", name)));
        }

        Ok(self.root.join(format!("{}.{}", name, FILE_EXTENSION)))
    }
}

#[async_trait]
impl Backend for FileBackend {
    type Collection = FileCollection;

    async fn open(&self, name: &str) -> StoreResult<Opened<FileCollection>> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let is_new = !tokio::fs::try_exists(&path).await?;
        let records = if is_new {
            let empty = BTreeMap::new();
            write_atomic(&path, &empty).await?;
            empty
        } else {
            let bytes = tokio::fs::read(&path).await?;
            let stored: Vec<Vector> = bincode::deserialize(&bytes)?;
            stored.into_iter().map(|v| (v.id.clone(), v)).collect()
        };

        debug!(path = %path.display(), is_new, records = records.len(), "opened file collection");

        Ok(Opened {
            collection: FileCollection { path, records: Mutex::new(records) },
            is_new,
        })
    }
}

/// A collection backed by a single file. Only one open handle per file is
/// supported at a time.
pub struct FileCollection {
    path: PathBuf,
    records: Mutex<BTreeMap<String, Vector>>,
}

impl FileCollection {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Collection for FileCollection {
    async fn get_all(&self) -> StoreResult<Vec<Vector>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn insert_one(&self, record: &Vector) -> StoreResult<()> {
        self.insert_many(std::slice::from_ref(record)).await
    }

    async fn insert_many(&self, records: &[Vector]) -> StoreResult<()> {
        let mut current = self.records.lock().await;
        let mut next = current.clone();
        add_records(&mut next, records)?;

        write_atomic(&self.path, &next).await?;
        *current = next;
        Ok(())
    }

    async fn delete_one(&self, id: &str) -> StoreResult<()> {
        self.delete_many(&[id.to_string()]).await
    }

    async fn delete_many(&self, ids: &[String]) -> StoreResult<()> {
        let mut current = self.records.lock().await;
        let mut next = current.clone();
        if remove_records(&mut next, ids.iter().map(String::as_str)) == 0 {
            return Ok(());
        }

        write_atomic(&self.path, &next).await?;
        *current = next;
        Ok(())
    }
}

/// The temp file is flushed to disk before the rename, and the directory entry
/// after it, so a crash cannot leave a renamed but empty file behind.
async fn write_atomic(path: &Path, records: &BTreeMap<String, Vector>) -> StoreResult<()> {
    let stored: Vec<&Vector> = records.values().collect();
    let bytes = bincode::serialize(&stored)?;

    let tmp = path.with_extension(format!("{}.tmp", FILE_EXTENSION));
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    sync_dir(path).await
}

#[cfg(unix)]
async fn sync_dir(path: &Path) -> StoreResult<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::File::open(dir).await?.sync_all().await?;
    }
    Ok(())
}

// Directories cannot be opened as files here; the rename is as far as it goes.
#[cfg(not(unix))]
async fn sync_dir(_path: &Path) -> StoreResult<()> {
    Ok(())
}

#[cfg(test)]
mod file_test {
    use super::*;

    fn vector(id: &str, values: Vec<f32>) -> Vector {
        Vector { id: id.to_string(), values, metadata: None }
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("nested"));

        let opened = backend.open("vectors").await.unwrap();
        assert!(opened.is_new);
        assert!(opened.collection.path().exists());

        let reopened = backend.open("vectors").await.unwrap();
        assert!(!reopened.is_new);
        assert!(reopened.collection.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let collection = backend.open("vectors").await.unwrap().collection;
        collection.insert_one(&vector("a", vec![1.0, 0.0])).await.unwrap();
        collection
            .insert_many(&[vector("b", vec![0.0, 1.0]), vector("c", vec![1.0, 1.0])])
            .await
            .unwrap();
        collection.delete_one("b").await.unwrap();
        drop(collection);

        let reopened = backend.open("vectors").await.unwrap().collection;
        let mut ids: Vec<String> = reopened.get_all().await.unwrap().into_iter().map(|v| v.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_write_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let collection = backend.open("vectors").await.unwrap().collection;
        collection.insert_one(&vector("a", vec![1.0, 2.0])).await.unwrap();
        collection.insert_one(&vector("b", vec![3.0, 4.0])).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["vectors.dotdb"]);

        // The file holds the complete latest state
        let bytes = std::fs::read(collection.path()).unwrap();
        let stored: Vec<Vector> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(stored, vec![vector("a", vec![1.0, 2.0]), vector("b", vec![3.0, 4.0])]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        let collection = backend.open("vectors").await.unwrap().collection;
        collection.insert_one(&vector("a", vec![1.0])).await.unwrap();

        let result = collection
            .insert_many(&[vector("b", vec![2.0]), vector("a", vec![3.0])])
            .await;
        assert!(matches!(result, Err(PersistenceError::DuplicateId(_))));
        drop(collection);

        let reopened = backend.open("vectors").await.unwrap().collection;
        let all = reopened.get_all().await.unwrap();
        assert_eq!(all, vec![vector("a", vec![1.0])]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        for name in ["", "../escape", "a/b", ".hidden"] {
            assert!(backend.open(name).await.is_err(), "accepted '{}'", name);
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.dotdb"), b"\xff\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();

        let backend = FileBackend::new(dir.path());
        let result = backend.open("broken").await;
        assert!(matches!(result, Err(PersistenceError::Codec(_))));
    }
}
