//! Query pipeline: embed → retrieve → gate → answer.
//!
//! Retrieval returns the `k` nearest chunks. Only the top-1 relevance score
//! is compared with the threshold; when it passes, every retrieved chunk
//! becomes context for the chat model and a listed source.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::ChatModel;
use crate::vectorstore::VectorStore;

/// Joins retrieved chunk texts into one context block.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Prompt sent to the chat model. `{context}` and `{question}` are replaced.
pub const PROMPT_TEMPLATE: &str = "\nJawab pertanyaan hanya berdasarkan konteks berikut:\n\n{context}\n\n---\n\nJawab pertanyaan berdasarkan konteks di atas: {question}\n";

/// A chunk that contributed to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// File name of the chunk's source path, `Unknown` if it has none.
    pub filename: String,
    /// Zero-based page index for PDF chunks.
    pub page: Option<u32>,
    /// Relevance score in `[0, 1]`.
    pub relevance_score: f32,
    /// Full chunk text.
    pub text: String,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        Self {
            filename: result.chunk.metadata.file_name(),
            page: result.chunk.metadata.page,
            relevance_score: result.score,
            text: result.chunk.text.clone(),
        }
    }
}

/// A synthesized answer with its sources in retrieval order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// The chat model's reply.
    pub text: String,
    /// Retrieved chunks, most relevant first.
    pub sources: Vec<Source>,
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The top result passed the threshold and the model answered.
    Answered(Answer),
    /// Nothing was retrieved or the top result scored below the threshold.
    /// The chat model was not called.
    NoRelevantResult {
        /// Score of the top result, if any was retrieved.
        best_score: Option<f32>,
    },
}

/// Fill [`PROMPT_TEMPLATE`] with the joined result texts and the question.
pub fn build_prompt(results: &[SearchResult], question: &str) -> String {
    let context =
        results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_DELIMITER);
    // Substitute in one pass so braces inside the context are left alone.
    let (head, tail) = PROMPT_TEMPLATE.split_once("{context}").unwrap_or((PROMPT_TEMPLATE, ""));
    format!("{head}{context}{}", tail.replace("{question}", question))
}

/// Answers questions from a populated collection.
pub struct QueryPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chat_model: Arc<dyn ChatModel>,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer with the configured `top_k` and `relevance_threshold`.
    pub async fn answer(&self, query: &str) -> Result<QueryOutcome> {
        self.answer_with(query, self.config.top_k, self.config.relevance_threshold).await
    }

    /// Answer using the `k` nearest chunks, gated on the top score.
    ///
    /// # Errors
    ///
    /// Propagates embedding, search, and chat model failures unchanged.
    pub async fn answer_with(&self, query: &str, k: usize, threshold: f32) -> Result<QueryOutcome> {
        let collection = self.config.collection.as_str();
        info!(collection, k, threshold, "answering query");

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results = self.vector_store.search(collection, &query_embedding, k).await.map_err(|e| {
            error!(collection, error = %e, "vector store search failed");
            e
        })?;

        let best_score = results.first().map(|r| r.score);
        match best_score {
            Some(score) if score >= threshold => {
                debug!(best_score = score, results = results.len(), "top result passed threshold");
            }
            _ => {
                info!(?best_score, threshold, "no relevant result");
                return Ok(QueryOutcome::NoRelevantResult { best_score });
            }
        }

        let prompt = build_prompt(&results, query);
        debug!(model = self.chat_model.name(), prompt_len = prompt.len(), "calling chat model");
        let text = self.chat_model.complete(&prompt).await.map_err(|e| {
            error!(model = self.chat_model.name(), error = %e, "chat model failed");
            e
        })?;

        let sources: Vec<Source> = results.iter().map(Source::from).collect();
        info!(sources = sources.len(), "query answered");

        Ok(QueryOutcome::Answered(Answer { text, sources }))
    }
}

/// Builder for constructing a [`QueryPipeline`]. All fields are required.
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider. Must match the one used at ingestion.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the chat model.
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Build the [`QueryPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::ConfigError("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chat_model = self
            .chat_model
            .ok_or_else(|| RagError::ConfigError("chat_model is required".to_string()))?;

        Ok(QueryPipeline { config, embedding_provider, vector_store, chat_model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, ChunkMetadata};

    fn result(text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("{text}_0"),
                text: text.to_string(),
                metadata: ChunkMetadata::default(),
                embedding: Vec::new(),
            },
            score,
        }
    }

    #[test]
    fn prompt_joins_context_in_retrieval_order() {
        let prompt = build_prompt(&[result("A", 0.9), result("B", 0.8)], "Apa itu PPN?");
        assert_eq!(
            prompt,
            "\nJawab pertanyaan hanya berdasarkan konteks berikut:\n\nA\n\n---\n\nB\n\n---\n\n\
             Jawab pertanyaan berdasarkan konteks di atas: Apa itu PPN?\n"
        );
    }

    #[test]
    fn source_uses_unknown_for_missing_filename() {
        let source = Source::from(&result("isi", 0.75));
        assert_eq!(source.filename, "Unknown");
        assert_eq!(source.page, None);
        assert_eq!(source.relevance_score, 0.75);
    }
}
