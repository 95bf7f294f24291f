//! Read-only access to the document index.
//!
//! The index is produced by an external indexer; Scout only queries it.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::{SqliteVectorStore, SCHEMA};

use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored unit of source document text plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk ID as assigned by the indexer.
    pub id: String,
    /// Text content of this chunk.
    pub content: String,
    /// Name of the source document.
    pub source: Option<String>,
    /// Page number within the source document.
    pub page: Option<i64>,
    /// Embedding vector.
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Source label for display, `Unknown` when the indexer recorded none.
    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or("Unknown")
    }

    /// Page label for display, `?` when the indexer recorded none.
    pub fn page_label(&self) -> String {
        self.page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary of one indexed source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    pub source: String,
    pub chunk_count: u32,
    /// Highest page number seen for the source.
    pub max_page: Option<i64>,
}

/// Trait for document index implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` chunks closest to `query_embedding`, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// List indexed source documents.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank chunks by similarity to the query, keeping the best `limit`.
///
/// Every chunk must have the query's dimension: a mismatch means the query
/// was embedded with a different model than the index.
pub(crate) fn rank<I>(query_embedding: &[f32], chunks: I, limit: usize) -> Result<Vec<SearchResult>>
where
    I: IntoIterator<Item = Chunk>,
{
    let mut results = Vec::new();
    for chunk in chunks {
        if chunk.embedding.len() != query_embedding.len() {
            return Err(ScoutError::VectorStore(format!(
                "query embedding has {} dimensions but chunk '{}' has {}; \
                 check embedding.model and embedding.dimensions against the index",
                query_embedding.len(),
                chunk.id,
                chunk.embedding.len()
            )));
        }
        let score = cosine_similarity(query_embedding, &chunk.embedding);
        results.push(SearchResult { chunk, score });
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    Ok(results)
}
