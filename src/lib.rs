//! # DotDB - A Minimal Persistent Vector Database
//!
//! DotDB keeps fixed-dimension vectors in memory and searches them by cosine
//! similarity with a full linear scan. Every insert and delete is written to
//! a persistent backend first, so a new instance connecting to the same
//! store rebuilds the exact same index.
//!
//! ## Example
//!
//! ```
//! use dotdb::{DotDB, MemoryBackend};
//!
//! # #[tokio::main]
//! # async fn main() -> dotdb::Result<()> {
//! let mut db = DotDB::new(3, MemoryBackend::new())?;
//! db.connect("vectors").await?;
//!
//! // Insert vectors
//! let red = db.insert(vec![1.0, 0.0, 0.0], None).await?;
//! db.insert(vec![0.0, 1.0, 0.0], None).await?;
//! db.insert(vec![0.7, 0.7, 0.0], None).await?;
//!
//! // Search for similar vectors
//! let results = db.search(&[1.0, 0.0, 0.0], 2)?;
//! assert_eq!(results[0].vector.id, red); // Most similar vector
//! # Ok(())
//! # }
//! ```

pub mod config;
mod db;
pub mod embed;
pub mod error;
pub mod record;
pub mod sample;
pub mod server;
pub mod store;
pub mod vector;

// Re-export DotDB as the primary public API
pub use config::Config;
pub use db::DotDB;
pub use embed::{Embedder, HashEmbedder};
pub use error::{DotError, PersistenceError, Result};
pub use record::{Metadata, MetadataValue, NewVector, SearchResult, Vector};
pub use store::{Backend, Collection, FileBackend, MemoryBackend};
