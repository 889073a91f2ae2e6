//! Ingestion pipeline: load → chunk → rebuild collection.
//!
//! Every run is a full, destructive rebuild. The collection is deleted
//! (best-effort), recreated, and repopulated in fixed-size batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pajak_rag::{IngestionPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::from_env()?)
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let report = pipeline.run().await?;
//! println!("{} chunks in {} batches", report.chunks, report.batches);
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::loader::{DocumentLoader, TypeLoad};
use crate::vectorstore::VectorStore;

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// Documents loaded (PDF pages count individually).
    pub documents: usize,
    /// Chunks uploaded.
    pub chunks: usize,
    /// Add calls made.
    pub batches: usize,
    /// Per-file-type load outcomes, in load order.
    pub load_reports: Vec<TypeLoad>,
}

/// Rebuilds a collection from the documents in the configured data directory.
pub struct IngestionPipeline {
    config: RagConfig,
    loader: DocumentLoader,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Load, chunk, delete, and repopulate the configured collection.
    ///
    /// An empty data directory is not an error: the old collection is still
    /// deleted and nothing is uploaded.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UploadError`] if a batch fails. Batches uploaded
    /// before the failure remain in the collection.
    pub async fn run(&self) -> Result<IngestReport> {
        let collection = self.config.collection.as_str();
        info!(collection, data_dir = %self.config.data_dir.display(), "starting ingestion");

        let loaded = self.loader.load();
        let chunks = self.chunker.chunk_all(&loaded.documents);
        let chunk_count = chunks.len();
        info!(documents = loaded.documents.len(), chunks = chunk_count, "split documents");

        if let Err(e) = self.vector_store.delete_collection(collection).await {
            warn!(collection, error = %e, "could not delete collection, continuing");
        } else {
            info!(collection, "deleted existing collection");
        }

        let batches = create_and_populate(
            self.vector_store.as_ref(),
            self.embedding_provider.as_ref(),
            collection,
            chunks,
            self.config.batch_size,
        )
        .await?;

        info!(collection, chunks = chunk_count, batches, "ingestion complete");

        Ok(IngestReport {
            documents: loaded.documents.len(),
            chunks: chunk_count,
            batches,
            load_reports: loaded.reports,
        })
    }
}

/// Create `collection` and upload `chunks` in order, `batch_size` at a time.
///
/// Each batch is embedded with `embedder` before it is added. The collection
/// is created right before the first batch, so an empty chunk list makes no
/// store calls at all. Returns the number of batches uploaded.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `batch_size` is zero, and
/// [`RagError::UploadError`] naming the one-based batch that failed.
pub async fn create_and_populate(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
    collection: &str,
    mut chunks: Vec<Chunk>,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
    }
    if chunks.is_empty() {
        info!(collection, "no chunks to upload");
        return Ok(0);
    }

    let total_batches = chunks.len().div_ceil(batch_size);

    for (i, batch) in chunks.chunks_mut(batch_size).enumerate() {
        let number = i + 1;
        let upload_err = |message: String| {
            error!(collection, batch = number, total_batches, %message, "batch upload failed");
            RagError::UploadError { batch: number, total_batches, message }
        };

        if i == 0 {
            store.create_collection(collection).await.map_err(|e| upload_err(e.to_string()))?;
        }

        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let embeddings =
            embedder.embed_batch(&texts).await.map_err(|e| upload_err(e.to_string()))?;
        if embeddings.len() != batch.len() {
            return Err(upload_err(format!(
                "{} returned {} embeddings for {} chunks",
                embedder.name(),
                embeddings.len(),
                batch.len()
            )));
        }
        for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        store.add(collection, batch).await.map_err(|e| upload_err(e.to_string()))?;
        info!(collection, batch = number, total_batches, size = batch.len(), "uploaded batch");
    }

    Ok(total_batches)
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `config`, `embedding_provider`, and `vector_store` are required. The
/// chunker defaults to a [`RecursiveChunker`] with the configured size and
/// overlap; the loader always reads `config.data_dir`.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::ConfigError("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });

        Ok(IngestionPipeline {
            loader: DocumentLoader::new(config.data_dir.clone()),
            config,
            chunker,
            embedding_provider,
            vector_store,
        })
    }
}
