//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pajak_rag::{
    ChatModel, Chunk, ChunkMetadata, EmbeddingProvider, InMemoryVectorStore, RagError, Result,
    SearchResult, VectorStore,
};

/// Deterministic embedder: hashes the text into a normalized vector.
pub struct HashEmbedder {
    pub dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut emb = vec![0.0f32; self.dimensions];
        for (i, v) in emb.iter_mut().enumerate() {
            // Keep the low bits so texts differing in one byte still diverge.
            *v = (((hash >> (i % 48)) & 0xffff) as f32).sin();
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// A store call, as observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Delete(String),
    Add { collection: String, ids: Vec<String> },
}

/// In-memory store that logs every mutating call and can fail on demand.
pub struct RecordingStore {
    inner: InMemoryVectorStore,
    calls: Mutex<Vec<Call>>,
    adds: AtomicUsize,
    /// One-based add call that fails, if any.
    fail_on_add: Option<usize>,
    /// Report deletion of a missing collection as an error, like Chroma does.
    strict_delete: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryVectorStore::new(),
            calls: Mutex::new(Vec::new()),
            adds: AtomicUsize::new(0),
            fail_on_add: None,
            strict_delete: false,
        }
    }

    pub fn failing_on_add(mut self, n: usize) -> Self {
        self.fail_on_add = Some(n);
        self
    }

    pub fn strict_delete(mut self) -> Self {
        self.strict_delete = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn add_count(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Add { .. })).count()
    }

    pub fn inner(&self) -> &InMemoryVectorStore {
        &self.inner
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn create_collection(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Create(name.to_string()));
        self.inner.create_collection(name).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Delete(name.to_string()));
        if self.strict_delete && !self.inner.collection_names().await.iter().any(|n| n == name) {
            return Err(RagError::VectorStoreError {
                backend: "recording".to_string(),
                message: format!("collection '{name}' does not exist"),
            });
        }
        self.inner.delete_collection(name).await
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let n = self.adds.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().unwrap().push(Call::Add {
            collection: collection.to_string(),
            ids: chunks.iter().map(|c| c.id.clone()).collect(),
        });
        if self.fail_on_add == Some(n) {
            return Err(RagError::VectorStoreError {
                backend: "recording".to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        self.inner.add(collection, chunks).await
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        self.inner.search(collection, embedding, top_k).await
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.inner.count(collection).await
    }

    async fn fetch(&self, collection: &str, offset: usize, limit: usize) -> Result<Vec<Chunk>> {
        self.inner.fetch(collection, offset, limit).await
    }
}

/// Store whose search always returns the same scored results.
pub struct StaticStore {
    pub results: Vec<SearchResult>,
}

impl StaticStore {
    pub fn with_scores(scores: &[f32]) -> Self {
        let results = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| SearchResult {
                chunk: Chunk {
                    id: format!("data/uu-kup.pdf#page={i}_0"),
                    text: format!("Isi pasal {i}"),
                    metadata: ChunkMetadata {
                        source: "data/uu-kup.pdf".to_string(),
                        page: Some(i as u32),
                        start_index: 0,
                        ..Default::default()
                    },
                    embedding: Vec::new(),
                },
                score,
            })
            .collect();
        Self { results }
    }
}

#[async_trait]
impl VectorStore for StaticStore {
    async fn create_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn add(&self, _collection: &str, _chunks: &[Chunk]) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        Ok(self.results.iter().take(top_k).cloned().collect())
    }

    async fn count(&self, _collection: &str) -> Result<usize> {
        Ok(self.results.len())
    }

    async fn fetch(&self, _collection: &str, offset: usize, limit: usize) -> Result<Vec<Chunk>> {
        Ok(self.results.iter().skip(offset).take(limit).map(|r| r.chunk.clone()).collect())
    }
}

/// Chat model that records prompts and answers with a fixed reply.
pub struct CountingChat {
    pub reply: String,
    prompts: Mutex<Vec<String>>,
}

impl CountingChat {
    pub fn new(reply: &str) -> Self {
        Self { reply: reply.to_string(), prompts: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for CountingChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}
