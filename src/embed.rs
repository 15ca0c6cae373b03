//! Text embedding boundary and the document helpers built on it.
//!
//! The store itself only sees numbers. These helpers split text into
//! paragraphs, turn them into vectors through an [`Embedder`], and keep the
//! paragraph text as `text` metadata so results can be shown to a user.

use crate::db::DotDB;
use crate::error::{DotError, Result};
use crate::record::{NewVector, SearchResult};
use crate::store::Backend;

/// Prepended to search queries. Retrieval models such as bge expect queries
/// and passages to be phrased differently.
pub const QUERY_PREFIX: &str = "Represent this sentence for searching relevant passages: ";

pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_TOP_K: usize = 50;

/// Converts text into a fixed-length vector.
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Deterministic bag-of-words embedder based on feature hashing.
///
/// Not semantic: texts score high only when they share words. Useful where
/// no model is available.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(DotError::InvalidDimension(dimension));
        }
        Ok(HashEmbedder { dimension })
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Text without any word characters embeds to the zero vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dim = self.dimension as u64;
        let mut embedding = vec![0.0f32; self.dimension];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = fnv1a(word.to_lowercase().as_bytes());
            embedding[(hash % dim) as usize] += 1.0;
            embedding[((hash >> 16) % dim) as usize] += 0.5;
            embedding[((hash >> 32) % dim) as usize] += 0.25;
        }

        let norm = crate::vector::magnitude(&embedding);
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(embedding)
    }
}

// Stable across builds, unlike std's DefaultHasher.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x100000001b3)
    })
}

/// Splits on blank lines, trimming each paragraph and dropping empty ones.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Maps a user-supplied top-k onto `1..=max`; anything below 1 means `default`.
pub fn clamp_top_k(requested: i64, default: usize, max: usize) -> usize {
    if requested < 1 {
        default.min(max)
    } else {
        usize::try_from(requested).map_or(max, |k| k.min(max))
    }
}

/// Embeds each paragraph of `text` and stores them in one batch.
///
/// Returns `(id, paragraph)` pairs in paragraph order. Nothing is stored if
/// any paragraph fails to embed.
pub async fn add_document<B, E>(db: &mut DotDB<B>, embedder: &E, text: &str) -> Result<Vec<(String, String)>>
where
    B: Backend,
    E: Embedder + ?Sized,
{
    let paragraphs = split_paragraphs(text);

    let batch = paragraphs
        .iter()
        .map(|p| -> Result<NewVector> {
            Ok(NewVector::new(embedder.embed(p)?).with_metadata("text", *p))
        })
        .collect::<Result<Vec<_>>>()?;

    let ids = db.insert_many(batch).await?;

    Ok(ids
        .into_iter()
        .zip(paragraphs)
        .map(|(id, p)| (id, p.to_string()))
        .collect())
}

/// Embeds `query` with [`QUERY_PREFIX`] and searches the store.
pub fn search_text<B, E>(db: &DotDB<B>, embedder: &E, query: &str, top_k: usize) -> Result<Vec<SearchResult>>
where
    B: Backend,
    E: Embedder + ?Sized,
{
    let values = embedder.embed(&format!("{}{}", QUERY_PREFIX, query))?;
    db.search(&values, top_k)
}

/// Text metadata of a result, or "" when absent.
pub fn result_text(result: &SearchResult) -> &str {
    result
        .vector
        .metadata
        .as_ref()
        .and_then(|m| m.get("text"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod embed_test {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::vector::{dot_product, magnitude};

    #[test]
    fn test_split_paragraphs() {
        let text = "  first para\nstill first\n\n\n\nsecond  \n\n   \n\nthird";
        assert_eq!(split_paragraphs(text), vec!["first para\nstill first", "second", "third"]);
        assert!(split_paragraphs("   \n\n  ").is_empty());
    }

    #[test]
    fn test_clamp_top_k() {
        assert_eq!(clamp_top_k(0, DEFAULT_TOP_K, MAX_TOP_K), 5);
        assert_eq!(clamp_top_k(-3, DEFAULT_TOP_K, MAX_TOP_K), 5);
        assert_eq!(clamp_top_k(7, DEFAULT_TOP_K, MAX_TOP_K), 7);
        assert_eq!(clamp_top_k(500, DEFAULT_TOP_K, MAX_TOP_K), 50);
    }

    #[test]
    fn test_hash_embedder_is_normalized_and_deterministic() {
        let embedder = HashEmbedder::new(64).unwrap();
        let a = embedder.embed("The quick brown fox").unwrap();
        let b = embedder.embed("the QUICK brown fox!").unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((magnitude(&a) - 1.0).abs() < 1e-5);
        assert!(embedder.embed("  ...  ").unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_hash_embedder_shared_words_score_higher() {
        let embedder = HashEmbedder::new(256).unwrap();
        let query = embedder.embed("rust vector database").unwrap();
        let close = embedder.embed("a vector database written in rust").unwrap();
        let far = embedder.embed("baking sourdough bread at home").unwrap();

        assert!(dot_product(&query, &close) > dot_product(&query, &far));
    }

    #[tokio::test]
    async fn test_add_document_and_search_text() {
        let embedder = HashEmbedder::new(128).unwrap();
        let mut db = DotDB::new(128, MemoryBackend::new()).unwrap();
        db.connect("docs").await.unwrap();

        let added = add_document(
            &mut db,
            &embedder,
            "Cats purr when they are happy.\n\nPython is a programming language.",
        )
        .await
        .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(added[1].1, "Python is a programming language.");
        assert_eq!(db.count(), 2);

        let results = search_text(&db, &embedder, "which programming language", 1).unwrap();
        assert_eq!(result_text(&results[0]), "Python is a programming language.");
        assert_eq!(results[0].vector.id, added[1].0);
    }

    #[tokio::test]
    async fn test_add_document_with_wrong_embedder_dimension() {
        let embedder = HashEmbedder::new(8).unwrap();
        let mut db = DotDB::new(16, MemoryBackend::new()).unwrap();
        db.connect("docs").await.unwrap();

        let result = add_document(&mut db, &embedder, "hello").await;
        assert!(matches!(result, Err(DotError::DimensionMismatch { expected: 16, actual: 8 })));
        assert_eq!(db.count(), 0);
    }

    /// Refuses any text containing `marker`.
    struct RefusingEmbedder {
        inner: HashEmbedder,
        marker: &'static str,
    }

    impl Embedder for RefusingEmbedder {
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains(self.marker) {
                return Err(DotError::Embedding(format!("cannot embed '{}'", text)));
            }
            self.inner.embed(text)
        }
    }

    #[tokio::test]
    async fn test_add_document_embedding_failure_stores_nothing() {
        let embedder = RefusingEmbedder { inner: HashEmbedder::new(32).unwrap(), marker: "boom" };
        let mut db = DotDB::new(32, MemoryBackend::new()).unwrap();
        db.connect("docs").await.unwrap();
        add_document(&mut db, &embedder, "already here").await.unwrap();

        let result = add_document(&mut db, &embedder, "first is fine\n\nsecond goes boom\n\nthird").await;
        assert!(matches!(result, Err(DotError::Embedding(ref m)) if m.contains("boom")));
        assert_eq!(db.count(), 1);

        let result = search_text(&db, &embedder, "boom", 3);
        assert!(matches!(result, Err(DotError::Embedding(_))));
    }
}
