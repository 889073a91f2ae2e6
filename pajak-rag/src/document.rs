//! Data types for documents, chunks, and search results.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Where a [`Document`] came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentMetadata {
    /// Path of the source file as it was scanned.
    pub source: String,
    /// Zero-based page index for PDF pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// A loaded source document (a whole text file or a single PDF page).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier derived from the source path and page.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Source metadata.
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document for a whole file.
    pub fn from_file(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: source.clone(),
            text: text.into(),
            metadata: DocumentMetadata { source, page: None },
        }
    }

    /// Create a document for one page of a paginated file.
    pub fn from_page(source: impl Into<String>, page: u32, text: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: format!("{source}#page={page}"),
            text: text.into(),
            metadata: DocumentMetadata { source, page: Some(page) },
        }
    }
}

/// Metadata stored with every chunk in the vector store.
///
/// Serializes as a flat JSON object. Keys other than `source`, `page`, and
/// `start_index` are kept in `extra`, and so is a known key whose stored
/// value has the wrong type, so a read-back never loses what was stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ChunkMetadata {
    /// Path of the source file.
    pub source: String,
    /// Zero-based page index, inherited from the parent document.
    pub page: Option<u32>,
    /// Character offset of the chunk within the parent document text.
    pub start_index: usize,
    /// Any other stored keys, written back unchanged.
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    /// File name component of `source`, or `Unknown` when there is none.
    pub fn file_name(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

impl From<Map<String, Value>> for ChunkMetadata {
    fn from(mut map: Map<String, Value>) -> Self {
        let source = take_typed(&mut map, "source", |v| v.as_str().map(str::to_string));
        let page = take_typed(&mut map, "page", |v| v.as_u64().and_then(|p| u32::try_from(p).ok()));
        let start_index =
            take_typed(&mut map, "start_index", |v| v.as_u64().and_then(|i| usize::try_from(i).ok()));

        Self {
            source: source.unwrap_or_default(),
            page,
            start_index: start_index.unwrap_or_default(),
            extra: map,
        }
    }
}

impl From<ChunkMetadata> for Map<String, Value> {
    fn from(metadata: ChunkMetadata) -> Self {
        let mut map = Map::new();
        map.insert("source".into(), Value::from(metadata.source));
        if let Some(page) = metadata.page {
            map.insert("page".into(), Value::from(page));
        }
        map.insert("start_index".into(), Value::from(metadata.start_index));
        // A mistyped known key overrides the default written above.
        map.extend(metadata.extra);
        map
    }
}

/// Remove `key` from `map` if `convert` accepts its value. A present value
/// that does not convert stays in the map.
fn take_typed<T>(
    map: &mut Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = map.get(key)?;
    match convert(value) {
        Some(typed) => {
            map.remove(key);
            Some(typed)
        }
        None => {
            warn!(key, value = %value, "stored chunk metadata has an unexpected type");
            None
        }
    }
}

/// A segment of a [`Document`], optionally carrying its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus the start offset.
    pub metadata: ChunkMetadata,
    /// Empty until the ingestion pipeline embeds the chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Relevance in `[0, 1]`, higher is more relevant.
    pub score: f32,
}
