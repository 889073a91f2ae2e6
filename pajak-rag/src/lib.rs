//! Retrieval-augmented question answering over Indonesian tax regulations.
//!
//! This crate provides:
//! - Directory loading of PDF, Markdown, and text documents
//! - Recursive character chunking with overlap and start offsets
//! - A batched, destructive rebuild of a vector-store collection
//! - Top-1 gated retrieval and answer synthesis with sources
//! - Collection export to JSON
//!
//! Backends sit behind the [`EmbeddingProvider`], [`VectorStore`], and
//! [`ChatModel`] traits. The `openai` feature provides OpenAI embeddings
//! and chat, the `chroma` feature a ChromaDB client. Both are on by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pajak_rag::{QueryOutcome, QueryPipeline, RagConfig};
//! use pajak_rag::chroma::ChromaVectorStore;
//! use pajak_rag::openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
//!
//! let config = RagConfig::from_env()?;
//! let pipeline = QueryPipeline::builder()
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&config)?))
//!     .vector_store(Arc::new(ChromaVectorStore::from_config(&config)))
//!     .chat_model(Arc::new(OpenAIChatModel::from_config(&config)?))
//!     .config(config)
//!     .build()?;
//!
//! if let QueryOutcome::Answered(answer) = pipeline.answer("Apa itu pajak?").await? {
//!     println!("{}", answer.text);
//! }
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod export;
pub mod ingest;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod query;
pub mod vectorstore;

#[cfg(feature = "chroma")]
pub mod chroma;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::{ChromaConnection, RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkMetadata, Document, DocumentMetadata, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use export::{
    CollectionSnapshot, Confirm, DumpOutcome, ExportFile, ExportedChunk, SourceStats, dump,
    fetch_snapshot, read_export, save_snapshot, write_export,
};
pub use ingest::{IngestReport, IngestionPipeline, IngestionPipelineBuilder, create_and_populate};
pub use inmemory::InMemoryVectorStore;
pub use llm::ChatModel;
pub use loader::{DocumentLoader, FileKind, LoadedDocuments, TypeLoad};
pub use query::{Answer, QueryOutcome, QueryPipeline, QueryPipelineBuilder, Source, build_prompt};
pub use vectorstore::VectorStore;
