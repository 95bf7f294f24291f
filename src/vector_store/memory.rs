//! In-memory document index.
//!
//! Useful for testing and for small fixed corpora.

use super::{rank, Chunk, IndexedSource, SearchResult, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// In-memory vector store over a fixed set of chunks.
pub struct MemoryVectorStore {
    chunks: Vec<Chunk>,
}

impl MemoryVectorStore {
    /// Create a store over the given chunks.
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        rank(query_embedding, self.chunks.iter().cloned(), limit)
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let mut by_source: BTreeMap<String, IndexedSource> = BTreeMap::new();

        for chunk in &self.chunks {
            let name = chunk.source_label().to_string();
            let entry = by_source
                .entry(name.clone())
                .or_insert_with(|| IndexedSource {
                    source: name,
                    chunk_count: 0,
                    max_page: None,
                });

            entry.chunk_count += 1;
            entry.max_page = entry.max_page.max(chunk.page);
        }

        Ok(by_source.into_values().collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new(vec![
            Chunk {
                id: "a".to_string(),
                content: "Hello world".to_string(),
                source: Some("guide.pdf".to_string()),
                page: Some(1),
                embedding: vec![1.0, 0.0, 0.0],
            },
            Chunk {
                id: "b".to_string(),
                content: "Goodbye world".to_string(),
                source: Some("guide.pdf".to_string()),
                page: Some(2),
                embedding: vec![0.0, 1.0, 0.0],
            },
        ]);

        assert_eq!(store.chunk_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[0].max_page, Some(2));
    }

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let store = MemoryVectorStore::default();
        assert!(store.search(&[1.0], 4).await.unwrap().is_empty());
    }
}
