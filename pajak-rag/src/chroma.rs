//! ChromaDB vector store backend.
//!
//! Provides [`ChromaVectorStore`], which implements [`VectorStore`] against
//! the Chroma v2 REST API with `reqwest`. Both the managed cloud service
//! (tenant, database, and `x-chroma-token`) and self-hosted servers
//! (`host:port`, default tenant and database) are supported.
//!
//! Chroma reports distances; they are converted to relevance scores in
//! `[0, 1]` according to the collection's distance space.
//!
//! # Example
//!
//! ```rust,ignore
//! use pajak_rag::chroma::ChromaVectorStore;
//! use pajak_rag::config::ChromaConnection;
//!
//! let store = ChromaVectorStore::new(&ChromaConnection::local("http://localhost:8000")?);
//! store.create_collection("pajak_uu").await?;
//! store.add("pajak_uu", &chunks).await?;
//! let results = store.search("pajak_uu", &query_embedding, 3).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{ChromaConnection, RagConfig};
use crate::document::{Chunk, ChunkMetadata, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "chroma";

/// Collection metadata key holding the HNSW distance function.
const SPACE_KEY: &str = "hnsw:space";

/// Distance function of a Chroma collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSpace {
    /// Squared euclidean distance (Chroma's default).
    #[default]
    L2,
    /// Cosine distance.
    Cosine,
    /// Inner product.
    Ip,
}

impl DistanceSpace {
    fn as_str(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::Cosine => "cosine",
            Self::Ip => "ip",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "l2" => Some(Self::L2),
            "cosine" => Some(Self::Cosine),
            "ip" => Some(Self::Ip),
            _ => None,
        }
    }

    /// Convert a distance reported by Chroma into a relevance score.
    ///
    /// Values that fall outside `[0, 1]` are clamped and logged.
    pub fn relevance(self, distance: f32) -> f32 {
        let score = match self {
            Self::L2 => 1.0 - distance / std::f32::consts::SQRT_2,
            Self::Cosine => 1.0 - distance,
            Self::Ip => {
                if distance > 0.0 {
                    1.0 - distance
                } else {
                    -distance
                }
            }
        };
        if !(0.0..=1.0).contains(&score) {
            warn!(distance, score, space = self.as_str(), "relevance score outside [0, 1], clamping");
        }
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
struct CollectionInfo {
    id: String,
    space: DistanceSpace,
}

/// A [`VectorStore`] backed by [Chroma](https://www.trychroma.com/).
///
/// Collection IDs are looked up by name once and cached for the lifetime of
/// the store.
pub struct ChromaVectorStore {
    client: reqwest::Client,
    base_url: String,
    tenant: String,
    database: String,
    api_key: Option<String>,
    space: DistanceSpace,
    collections: RwLock<HashMap<String, CollectionInfo>>,
}

// ── Chroma API request/response types ──────────────────────────────

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
    #[serde(default)]
    metadata: Option<HashMap<String, Value>>,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a ChunkMetadata>,
}

#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<Value>>>,
}

impl ChromaVectorStore {
    /// Create a store for the given connection.
    pub fn new(connection: &ChromaConnection) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: connection.base_url(),
            tenant: connection.tenant().to_string(),
            database: connection.database().to_string(),
            api_key: connection.api_key().map(str::to_string),
            space: DistanceSpace::default(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store from the run configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(&config.chroma)
    }

    /// Override the server URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Distance space used for new collections.
    pub fn with_distance_space(mut self, space: DistanceSpace) -> Self {
        self.space = space;
        self
    }

    fn map_err(e: reqwest::Error) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.base_url, self.tenant, self.database
        )
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.collections_url()));
        match &self.api_key {
            Some(key) => builder.header("x-chroma-token", key),
            None => builder,
        }
    }

    /// Fail with the status and body of a non-success response.
    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("{action} returned {status}: {body}"),
        })
    }

    fn info_from(&self, response: CollectionResponse) -> CollectionInfo {
        let space = response
            .metadata
            .as_ref()
            .and_then(|m| m.get(SPACE_KEY))
            .and_then(Value::as_str)
            .and_then(DistanceSpace::parse)
            .unwrap_or(self.space);
        CollectionInfo { id: response.id, space }
    }

    /// Resolve a collection name to its ID, using the cache when possible.
    async fn collection(&self, name: &str) -> Result<CollectionInfo> {
        if let Some(info) = self.collections.read().await.get(name) {
            return Ok(info.clone());
        }

        let response =
            self.request(Method::GET, &format!("/{name}")).send().await.map_err(Self::map_err)?;
        let response = Self::check(response, &format!("get collection '{name}'")).await?;
        let body: CollectionResponse = response.json().await.map_err(Self::map_err)?;
        let info = self.info_from(body);

        debug!(collection = name, id = %info.id, "resolved chroma collection");
        self.collections.write().await.insert(name.to_string(), info.clone());
        Ok(info)
    }
}

fn parse_metadata(value: Option<Value>) -> ChunkMetadata {
    match value {
        Some(Value::Object(map)) => ChunkMetadata::from(map),
        Some(other) => {
            warn!(metadata = %other, "ignoring non-object chunk metadata");
            ChunkMetadata::default()
        }
        None => ChunkMetadata::default(),
    }
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    async fn create_collection(&self, name: &str) -> Result<()> {
        let body = json!({
            "name": name,
            "metadata": { "hnsw:space": self.space.as_str() },
            "get_or_create": true,
        });

        let response =
            self.request(Method::POST, "").json(&body).send().await.map_err(Self::map_err)?;
        let response = Self::check(response, &format!("create collection '{name}'")).await?;
        let created: CollectionResponse = response.json().await.map_err(Self::map_err)?;
        let info = self.info_from(created);

        debug!(collection = name, id = %info.id, "created chroma collection");
        self.collections.write().await.insert(name.to_string(), info);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);

        let response =
            self.request(Method::DELETE, &format!("/{name}")).send().await.map_err(Self::map_err)?;
        Self::check(response, &format!("delete collection '{name}'")).await?;

        debug!(collection = name, "deleted chroma collection");
        Ok(())
    }

    async fn add(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let info = self.collection(collection).await?;
        let body = AddRequest {
            ids: chunks.iter().map(|c| c.id.as_str()).collect(),
            embeddings: chunks.iter().map(|c| c.embedding.as_slice()).collect(),
            documents: chunks.iter().map(|c| c.text.as_str()).collect(),
            metadatas: chunks.iter().map(|c| &c.metadata).collect(),
        };

        let response = self
            .request(Method::POST, &format!("/{}/add", info.id))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        Self::check(response, &format!("add to collection '{collection}'")).await?;

        debug!(collection, count = chunks.len(), "added chunks to chroma");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let info = self.collection(collection).await?;
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": top_k,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .request(Method::POST, &format!("/{}/query", info.id))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let response = Self::check(response, &format!("query collection '{collection}'")).await?;
        let query: QueryResponse = response.json().await.map_err(Self::map_err)?;

        let ids = query.ids.into_iter().next().unwrap_or_default();
        let mut documents = query.documents.and_then(|d| d.into_iter().next()).unwrap_or_default();
        let mut metadatas = query.metadatas.and_then(|m| m.into_iter().next()).unwrap_or_default();
        let distances = query.distances.and_then(|d| d.into_iter().next()).unwrap_or_default();

        let mut results: Vec<SearchResult> = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let text = documents.get_mut(i).and_then(Option::take).unwrap_or_default();
                let metadata = parse_metadata(metadatas.get_mut(i).and_then(Option::take));
                let distance = distances.get(i).copied().flatten().unwrap_or(f32::MAX);
                SearchResult {
                    chunk: Chunk { id, text, metadata, embedding: Vec::new() },
                    score: info.space.relevance(distance),
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        debug!(collection, result_count = results.len(), "chroma query completed");
        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let info = self.collection(collection).await?;
        let response = self
            .request(Method::GET, &format!("/{}/count", info.id))
            .send()
            .await
            .map_err(Self::map_err)?;
        let response = Self::check(response, &format!("count collection '{collection}'")).await?;
        response.json::<usize>().await.map_err(Self::map_err)
    }

    async fn fetch(&self, collection: &str, offset: usize, limit: usize) -> Result<Vec<Chunk>> {
        let info = self.collection(collection).await?;
        let body = json!({
            "offset": offset,
            "limit": limit,
            "include": ["documents", "metadatas"],
        });

        let response = self
            .request(Method::POST, &format!("/{}/get", info.id))
            .json(&body)
            .send()
            .await
            .map_err(Self::map_err)?;
        let response = Self::check(response, &format!("get from collection '{collection}'")).await?;
        let page: GetResponse = response.json().await.map_err(Self::map_err)?;

        let mut documents = page.documents.unwrap_or_default();
        let mut metadatas = page.metadatas.unwrap_or_default();

        Ok(page
            .ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Chunk {
                id,
                text: documents.get_mut(i).and_then(Option::take).unwrap_or_default(),
                metadata: parse_metadata(metadatas.get_mut(i).and_then(Option::take)),
                embedding: Vec::new(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_distance_maps_into_unit_range() {
        assert_eq!(DistanceSpace::L2.relevance(0.0), 1.0);
        let mid = DistanceSpace::L2.relevance(std::f32::consts::SQRT_2 / 2.0);
        assert!((mid - 0.5).abs() < 1e-6);
        assert_eq!(DistanceSpace::L2.relevance(5.0), 0.0);
    }

    #[test]
    fn cosine_and_inner_product_relevance() {
        assert!((DistanceSpace::Cosine.relevance(0.15) - 0.85).abs() < 1e-6);
        assert!((DistanceSpace::Ip.relevance(0.25) - 0.75).abs() < 1e-6);
        assert!((DistanceSpace::Ip.relevance(-0.4) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn local_connection_uses_default_tenant() {
        let store = ChromaVectorStore::new(&ChromaConnection::local("localhost:9000").unwrap());
        assert_eq!(
            store.collections_url(),
            "http://localhost:9000/api/v2/tenants/default_tenant/databases/default_database/collections"
        );
        assert!(store.api_key.is_none());
    }

    #[test]
    fn metadata_from_other_writers_is_tolerated() {
        let meta = parse_metadata(Some(json!({
            "source": "data/uu-hpp.pdf",
            "page": 3,
            "start_index": 2800,
            "page_label": "4",
        })));
        assert_eq!(meta.page, Some(3));
        assert_eq!(meta.start_index, 2800);
        assert_eq!(meta.extra.get("page_label"), Some(&json!("4")));
        assert_eq!(parse_metadata(None), ChunkMetadata::default());
        assert_eq!(parse_metadata(Some(json!("flat"))), ChunkMetadata::default());
    }
}
