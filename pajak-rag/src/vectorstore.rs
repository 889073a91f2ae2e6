//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for embedded chunks with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s. The ingestion
/// pipeline only ever creates, deletes, and appends to collections; there is
/// no per-chunk update or removal.
///
/// # Example
///
/// ```rust,ignore
/// use pajak_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("pajak_uu").await?;
/// store.add("pajak_uu", &chunks).await?;
/// let results = store.search("pajak_uu", &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str) -> Result<()>;

    /// Delete a named collection and all its data.
    ///
    /// Backends may report a missing collection as an error; callers that
    /// rebuild from scratch treat deletion as best-effort.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Append chunks to an existing collection. Chunks must have embeddings set.
    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending relevance score in `[0, 1]`.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// Read back up to `limit` stored chunks starting at `offset`, without
    /// embeddings, in the store's stable order.
    async fn fetch(&self, collection: &str, offset: usize, limit: usize) -> Result<Vec<Chunk>>;
}
