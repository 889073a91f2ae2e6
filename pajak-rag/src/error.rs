//! Error types for the `pajak-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval, and export.
#[derive(Debug, Error)]
pub enum RagError {
    /// A required setting is missing or a value is out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A single source file could not be read or parsed.
    #[error("Failed to load {}: {message}", path.display())]
    LoadError {
        /// The file that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A batch upload failed. Batches before `batch` stay in the collection.
    #[error("Upload of batch {batch}/{total_batches} failed: {message}")]
    UploadError {
        /// One-based number of the failing batch.
        batch: usize,
        /// Total number of batches in the run.
        total_batches: usize,
        /// A description of the failure.
        message: String,
    },

    /// The chat model call failed.
    #[error("Model error ({provider}): {message}")]
    ModelError {
        /// The model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Writing or reading a collection export failed.
    #[error("Export error: {0}")]
    ExportError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
