//! Reading a whole collection back and saving it as JSON.
//!
//! Used to inspect what an ingestion run actually stored. The export file has
//! the shape
//!
//! ```json
//! { "total_chunks": 2, "collection": "pajak_uu",
//!   "chunks": [ { "id": "...", "content": "...", "metadata": { "source": "...", "start_index": 0 } } ] }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, ChunkMetadata};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Chunks fetched per store call.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Question asked before an export file is written.
pub const SAVE_PROMPT: &str = "Save all chunks to JSON file? (y/n)";

/// Asks the user for a yes/no decision.
pub trait Confirm {
    /// Return `true` to proceed.
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Every chunk stored in a collection, in the store's order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    /// Collection name.
    pub collection: String,
    /// Stored chunks, without embeddings.
    pub chunks: Vec<Chunk>,
}

impl CollectionSnapshot {
    /// Chunk counts per source file name.
    pub fn source_stats(&self) -> SourceStats {
        SourceStats::from_chunks(&self.chunks)
    }
}

/// Page through a collection and collect every chunk.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if `page_size` is zero, and propagates
/// store errors, including a missing collection.
pub async fn fetch_snapshot(
    store: &dyn VectorStore,
    collection: &str,
    page_size: usize,
) -> Result<CollectionSnapshot> {
    if page_size == 0 {
        return Err(RagError::ConfigError("page_size must be greater than zero".to_string()));
    }

    let total = store.count(collection).await?;
    info!(collection, total, "fetching collection");

    let mut chunks = Vec::with_capacity(total);
    let mut offset = 0;
    while offset < total {
        let limit = page_size.min(total - offset);
        debug!(collection, offset, limit, "fetching page");
        let page = store.fetch(collection, offset, limit).await?;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        chunks.extend(page);
    }

    Ok(CollectionSnapshot { collection: collection.to_string(), chunks })
}

/// Number of chunks per source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceStats {
    /// `(file name, chunk count)`, largest first, ties by name.
    pub entries: Vec<(String, usize)>,
}

impl SourceStats {
    /// Count chunks by the file name of their source.
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for chunk in chunks {
            *counts.entry(chunk.metadata.file_name()).or_default() += 1;
        }

        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }
}

/// One chunk in an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedChunk {
    /// Chunk id.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Stored metadata.
    pub metadata: ChunkMetadata,
}

/// On-disk export of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    /// Always equal to `chunks.len()`.
    pub total_chunks: usize,
    /// Collection name.
    pub collection: String,
    /// Exported chunks in store order.
    pub chunks: Vec<ExportedChunk>,
}

impl From<&CollectionSnapshot> for ExportFile {
    fn from(snapshot: &CollectionSnapshot) -> Self {
        let chunks: Vec<ExportedChunk> = snapshot
            .chunks
            .iter()
            .map(|chunk| ExportedChunk {
                id: chunk.id.clone(),
                content: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            })
            .collect();
        Self { total_chunks: chunks.len(), collection: snapshot.collection.clone(), chunks }
    }
}

/// Write an export file as pretty-printed UTF-8 JSON.
pub fn write_export(export: &ExportFile, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, export)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read an export file back.
///
/// # Errors
///
/// Returns [`RagError::ExportError`] if `total_chunks` disagrees with the
/// number of chunks in the file.
pub fn read_export(path: &Path) -> Result<ExportFile> {
    let export: ExportFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    if export.total_chunks != export.chunks.len() {
        return Err(RagError::ExportError(format!(
            "{} declares {} chunks but contains {}",
            path.display(),
            export.total_chunks,
            export.chunks.len()
        )));
    }
    Ok(export)
}

/// What [`dump`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// The collection has no chunks; nothing was asked or written.
    Empty,
    /// The user declined; nothing was written.
    Declined {
        /// Chunks that would have been saved.
        count: usize,
    },
    /// The export file was written.
    Saved {
        /// Chunks saved.
        count: usize,
        /// Where the file was written.
        path: PathBuf,
    },
}

/// Ask for confirmation and, if given, write `snapshot` to `path`.
pub fn save_snapshot(
    snapshot: &CollectionSnapshot,
    path: &Path,
    confirm: &mut impl Confirm,
) -> Result<DumpOutcome> {
    let count = snapshot.chunks.len();
    if count == 0 {
        info!(collection = %snapshot.collection, "collection is empty, nothing to save");
        return Ok(DumpOutcome::Empty);
    }
    if !confirm.confirm(SAVE_PROMPT) {
        info!(count, "export declined");
        return Ok(DumpOutcome::Declined { count });
    }

    write_export(&ExportFile::from(snapshot), path)?;
    info!(count, path = %path.display(), "saved export");
    Ok(DumpOutcome::Saved { count, path: path.to_path_buf() })
}

/// Fetch the whole collection and save it to `path` after confirmation.
pub async fn dump(
    store: &dyn VectorStore,
    collection: &str,
    path: &Path,
    confirm: &mut impl Confirm,
) -> Result<DumpOutcome> {
    let snapshot = fetch_snapshot(store, collection, DEFAULT_PAGE_SIZE).await?;
    save_snapshot(&snapshot, path, confirm)
}
