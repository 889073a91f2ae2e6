//! Configuration for ingestion and query runs.
//!
//! A [`RagConfig`] is built once at startup, either through
//! [`RagConfig::builder()`] or from environment variables with
//! [`RagConfig::from_env()`], and passed by reference to every component.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "pajak_uu";

/// Port used when a self-hosted Chroma host has none.
pub const DEFAULT_CHROMA_PORT: u16 = 8000;

/// Hosted Chroma endpoint.
pub const CHROMA_CLOUD_URL: &str = "https://api.trychroma.com";

/// Default OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// How to reach the Chroma server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChromaConnection {
    /// Managed Chroma Cloud, addressed by tenant, database, and API key.
    Cloud {
        /// Value sent in the `x-chroma-token` header.
        api_key: String,
        /// Tenant name.
        tenant: String,
        /// Database name.
        database: String,
    },
    /// Self-hosted Chroma server.
    Local {
        /// Host name or address.
        host: String,
        /// TCP port.
        port: u16,
        /// Use TLS (`https` scheme in the configured host).
        ssl: bool,
    },
}

impl ChromaConnection {
    /// Parse a self-hosted endpoint such as `http://localhost:8000`.
    ///
    /// The scheme is stripped (an `https` scheme turns on TLS) and the port
    /// defaults to [`DEFAULT_CHROMA_PORT`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the host is empty or the port is
    /// not a valid number.
    pub fn local(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (ssl, rest) = match raw.split_once("://") {
            Some((scheme, rest)) => (scheme.eq_ignore_ascii_case("https"), rest),
            None => (false, raw),
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    RagError::ConfigError(format!("invalid port '{port}' in CHROMA_HOST '{raw}'"))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_CHROMA_PORT),
        };

        if host.is_empty() {
            return Err(RagError::ConfigError(format!("CHROMA_HOST '{raw}' has no host")));
        }

        Ok(Self::Local { host: host.to_string(), port, ssl })
    }

    /// Base URL of the Chroma HTTP API.
    pub fn base_url(&self) -> String {
        match self {
            Self::Cloud { .. } => CHROMA_CLOUD_URL.to_string(),
            Self::Local { host, port, ssl } => {
                let scheme = if *ssl { "https" } else { "http" };
                format!("{scheme}://{host}:{port}")
            }
        }
    }

    /// Tenant the collections live in.
    pub fn tenant(&self) -> &str {
        match self {
            Self::Cloud { tenant, .. } => tenant,
            Self::Local { .. } => "default_tenant",
        }
    }

    /// Database the collections live in.
    pub fn database(&self) -> &str {
        match self {
            Self::Cloud { database, .. } => database,
            Self::Local { .. } => "default_database",
        }
    }

    /// API token, only present in cloud mode.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::Cloud { api_key, .. } => Some(api_key),
            Self::Local { .. } => None,
        }
    }
}

impl Default for ChromaConnection {
    fn default() -> Self {
        Self::Local { host: "localhost".to_string(), port: DEFAULT_CHROMA_PORT, ssl: false }
    }
}

/// Configuration parameters for ingestion and querying.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// OpenAI API key, used for both embeddings and chat.
    pub openai_api_key: String,
    /// OpenAI API base URL.
    pub openai_base_url: String,
    /// Embedding model. Must match the model the collection was built with.
    pub embedding_model: String,
    /// Chat model used to synthesize answers.
    pub chat_model: String,
    /// Chroma endpoint.
    pub chroma: ChromaConnection,
    /// Name of the collection rebuilt by ingestion and searched by queries.
    pub collection: String,
    /// Directory scanned for source documents.
    pub data_dir: PathBuf,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks per upload call.
    pub batch_size: usize,
    /// Number of chunks retrieved per query.
    pub top_k: usize,
    /// Minimum top-1 relevance score required to call the chat model.
    pub relevance_threshold: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: OPENAI_API_BASE.to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            chroma: ChromaConnection::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            data_dir: PathBuf::from("data"),
            chunk_size: 3000,
            chunk_overlap: 200,
            batch_size: 100,
            top_k: 3,
            relevance_threshold: 0.7,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// `OPENAI_API_KEY` is always required. `CHROMA_MODE` selects `cloud`
    /// (the default, requiring `CHROMA_API_KEY`, `CHROMA_TENANT` and
    /// `CHROMA_DATABASE`) or `local` (requiring `CHROMA_HOST`). Empty values
    /// count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] naming the first missing or
    /// malformed variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str, why: &str| {
            get(key).ok_or_else(|| RagError::ConfigError(format!("{key} is not set ({why})")))
        };

        let defaults = RagConfig::default();
        let mut builder = RagConfig::builder()
            .openai_api_key(require("OPENAI_API_KEY", "needed for embeddings and chat")?);

        let mode = get("CHROMA_MODE").unwrap_or_else(|| "cloud".to_string()).to_lowercase();
        let chroma = match mode.as_str() {
            "cloud" => ChromaConnection::Cloud {
                api_key: require("CHROMA_API_KEY", "required when CHROMA_MODE=cloud")?,
                tenant: require("CHROMA_TENANT", "required when CHROMA_MODE=cloud")?,
                database: require("CHROMA_DATABASE", "required when CHROMA_MODE=cloud")?,
            },
            "local" => ChromaConnection::local(&require(
                "CHROMA_HOST",
                "required when CHROMA_MODE=local, e.g. http://localhost:8000",
            )?)?,
            other => {
                return Err(RagError::ConfigError(format!(
                    "CHROMA_MODE must be 'cloud' or 'local', got '{other}'"
                )));
            }
        };
        builder = builder.chroma(chroma);

        if let Some(url) = get("OPENAI_BASE_URL") {
            builder = builder.openai_base_url(url);
        }
        if let Some(model) = get("OPENAI_EMBEDDING_MODEL") {
            builder = builder.embedding_model(model);
        }
        if let Some(model) = get("OPENAI_CHAT_MODEL") {
            builder = builder.chat_model(model);
        }
        if let Some(collection) = get("CHROMA_COLLECTION") {
            builder = builder.collection(collection);
        }
        if let Some(dir) = get("DATA_PATH") {
            builder = builder.data_dir(dir);
        }

        builder
            .chunk_size(parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?)
            .chunk_overlap(parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?)
            .batch_size(parse_or(&get, "BATCH_SIZE", defaults.batch_size)?)
            .top_k(parse_or(&get, "TOP_K", defaults.top_k)?)
            .relevance_threshold(parse_or(
                &get,
                "RELEVANCE_THRESHOLD",
                defaults.relevance_threshold,
            )?)
            .build()
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| RagError::ConfigError(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the OpenAI API key.
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = key.into();
        self
    }

    /// Set the OpenAI API base URL.
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.openai_base_url = url.into();
        self
    }

    /// Set the embedding model.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the chat model.
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    /// Set the Chroma endpoint.
    pub fn chroma(mut self, chroma: ChromaConnection) -> Self {
        self.config.chroma = chroma;
        self
    }

    /// Set the collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the directory scanned for documents.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks per upload call.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the top-1 relevance threshold.
    pub fn relevance_threshold(mut self, threshold: f32) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `batch_size == 0` or `top_k == 0`
    /// - `relevance_threshold` is outside `[0, 1]`
    /// - `collection` is empty
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&config.relevance_threshold) {
            return Err(RagError::ConfigError(format!(
                "relevance_threshold ({}) must be within [0, 1]",
                config.relevance_threshold
            )));
        }
        if config.collection.is_empty() {
            return Err(RagError::ConfigError("collection name must not be empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn local_host_strips_scheme_and_parses_port() {
        let conn = ChromaConnection::local("http://chroma.internal:8123").unwrap();
        assert_eq!(
            conn,
            ChromaConnection::Local { host: "chroma.internal".into(), port: 8123, ssl: false }
        );
        assert_eq!(conn.base_url(), "http://chroma.internal:8123");
    }

    #[test]
    fn local_host_defaults_port() {
        let conn = ChromaConnection::local("localhost").unwrap();
        assert_eq!(conn.base_url(), "http://localhost:8000");

        let conn = ChromaConnection::local("https://vectors.example.com/").unwrap();
        assert_eq!(conn.base_url(), "https://vectors.example.com:8000");
    }

    #[test]
    fn local_host_rejects_bad_port() {
        let err = ChromaConnection::local("http://localhost:eighty").unwrap_err();
        assert!(err.to_string().contains("invalid port"));
    }

    #[test]
    fn missing_openai_key_is_reported_first() {
        let err = RagConfig::from_lookup(lookup(&[("CHROMA_MODE", "local")])).unwrap_err();
        assert!(matches!(err, RagError::ConfigError(ref m) if m.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn cloud_mode_is_default_and_names_missing_variable() {
        let err = RagConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHROMA_API_KEY", "ck-test"),
            ("CHROMA_TENANT", ""),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CHROMA_TENANT"));
    }

    #[test]
    fn local_mode_requires_host() {
        let err = RagConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHROMA_MODE", "LOCAL"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CHROMA_HOST"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = RagConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHROMA_MODE", "embedded"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CHROMA_MODE"));
    }

    #[test]
    fn cloud_config_with_overrides() {
        let config = RagConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHROMA_API_KEY", "ck-test"),
            ("CHROMA_TENANT", "tenant-1"),
            ("CHROMA_DATABASE", "pajak"),
            ("CHUNK_SIZE", "1000"),
            ("CHUNK_OVERLAP", "100"),
            ("RELEVANCE_THRESHOLD", "0.5"),
        ]))
        .unwrap();

        assert_eq!(config.chroma.tenant(), "tenant-1");
        assert_eq!(config.chroma.api_key(), Some("ck-test"));
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.relevance_threshold, 0.5);
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn malformed_number_names_variable() {
        let err = RagConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CHROMA_MODE", "local"),
            ("CHROMA_HOST", "localhost:8000"),
            ("BATCH_SIZE", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn builder_rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(200).chunk_overlap(200).build().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn builder_rejects_zero_batch_size() {
        assert!(RagConfig::builder().batch_size(0).build().is_err());
    }
}
