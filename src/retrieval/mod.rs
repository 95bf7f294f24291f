//! Retrieval client over the document index.
//!
//! Embeds a query, asks the vector store for the nearest chunks and formats
//! them as labeled text blocks for the agent to read.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::vector_store::{SearchResult, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Returned when the index has nothing for a query.
pub const NO_RESULTS: &str = "No relevant information found in company documents.";

/// Separator placed between formatted chunks.
pub const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Semantic search over the company document index.
pub struct DocumentSearch {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    retry: RetryPolicy,
}

impl DocumentSearch {
    /// Create a document search returning 4 chunks per query.
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            top_k: 4,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the number of chunks returned by `run`.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the retry policy for store queries.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Return the `k` chunks closest to `query`, best first.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .retry
            .run("vector search", || self.vector_store.search(&query_embedding, k))
            .await?;

        debug!("Retrieved {} chunks", results.len());
        Ok(results)
    }

    /// Search and format the results for the agent.
    pub async fn run(&self, query: &str) -> Result<String> {
        let results = self.search(query, self.top_k).await?;
        Ok(format_results(&results))
    }
}

/// Format results as labeled blocks, or the no-results sentinel.
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    results
        .iter()
        .map(|r| {
            format!(
                "[Source: {}, Page {}]\n{}",
                r.chunk.source_label(),
                r.chunk.page_label(),
                r.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
