//! Loading source documents from a data directory.
//!
//! [`DocumentLoader`] scans the top level of a directory for PDF, Markdown,
//! and plain-text files, in that order. Each file type is loaded
//! independently and reports a [`TypeLoad`] outcome, so a broken PDF never
//! prevents the Markdown and text files from being ingested.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// A supported source file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// PDF, one document per page.
    Pdf,
    /// Markdown, one document per file.
    Markdown,
    /// Plain UTF-8 text, one document per file.
    Text,
}

impl FileKind {
    /// Load order.
    pub const ALL: [FileKind; 3] = [FileKind::Pdf, FileKind::Markdown, FileKind::Text];

    /// File extension matched by this kind, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Markdown => write!(f, "Markdown"),
            Self::Text => write!(f, "TXT"),
        }
    }
}

/// Outcome of loading one file type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeLoad {
    /// Files were found and loaded.
    Loaded {
        /// The file type.
        kind: FileKind,
        /// Number of documents produced (pages, for PDFs).
        count: usize,
    },
    /// No files of this type exist. Not an error.
    NotFound {
        /// The file type.
        kind: FileKind,
    },
    /// A file of this type failed to load; the type contributed nothing.
    Failed {
        /// The file type.
        kind: FileKind,
        /// Why loading failed.
        message: String,
    },
}

/// All documents found in a directory plus a per-type report.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocuments {
    /// Documents in PDF, Markdown, TXT order.
    pub documents: Vec<Document>,
    /// One entry per [`FileKind`], in load order.
    pub reports: Vec<TypeLoad>,
}

/// Reads PDF, Markdown, and TXT files from a directory.
///
/// # Example
///
/// ```rust,ignore
/// use pajak_rag::DocumentLoader;
///
/// let loaded = DocumentLoader::new("data").load();
/// println!("{} documents", loaded.documents.len());
/// ```
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    dir: PathBuf,
}

impl DocumentLoader {
    /// Create a loader for the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load every supported file type. Never fails as a whole.
    pub fn load(&self) -> LoadedDocuments {
        info!(dir = %self.dir.display(), "loading documents");

        let mut loaded = LoadedDocuments::default();
        for kind in FileKind::ALL {
            let report = match self.files(kind) {
                Ok(files) if files.is_empty() => {
                    info!(%kind, "no files found");
                    TypeLoad::NotFound { kind }
                }
                Ok(files) => match load_files(kind, &files) {
                    Ok(documents) => {
                        let count = documents.len();
                        info!(%kind, files = files.len(), count, "loaded documents");
                        loaded.documents.extend(documents);
                        TypeLoad::Loaded { kind, count }
                    }
                    Err(e) => {
                        warn!(%kind, error = %e, "failed to load file type, skipping");
                        TypeLoad::Failed { kind, message: e.to_string() }
                    }
                },
                Err(e) => {
                    warn!(%kind, error = %e, "failed to scan for files, skipping");
                    TypeLoad::Failed { kind, message: e.to_string() }
                }
            };
            loaded.reports.push(report);
        }

        info!(total = loaded.documents.len(), "documents loaded");
        loaded
    }

    /// Load all files of one type. The first failing file fails the type.
    pub fn load_kind(&self, kind: FileKind) -> Result<Vec<Document>> {
        load_files(kind, &self.files(kind)?)
    }

    /// Files with the kind's extension at the top level of the directory, sorted.
    fn files(&self, kind: FileKind) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(RagError::LoadError {
                path: self.dir.clone(),
                message: "directory does not exist".to_string(),
            });
        }

        let mut files = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file() && !is_hidden(entry))
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == kind.extension()))
            .map(|entry| entry.into_path())
            .collect::<Vec<_>>();

        files.sort();
        Ok(files)
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn load_files(kind: FileKind, files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for path in files {
        match kind {
            FileKind::Pdf => documents.extend(load_pdf(path)?),
            FileKind::Markdown | FileKind::Text => documents.push(load_text(path)?),
        }
    }
    Ok(documents)
}

fn load_text(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| RagError::LoadError { path: path.to_path_buf(), message: e.to_string() })?;
    Ok(Document::from_file(path.to_string_lossy(), text))
}

/// One document per page; `page` is zero-based.
fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let load_err =
        |e: lopdf::Error| RagError::LoadError { path: path.to_path_buf(), message: e.to_string() };

    let pdf = lopdf::Document::load(path).map_err(load_err)?;
    let source = path.to_string_lossy();

    pdf.get_pages()
        .keys()
        .map(|&page_number| {
            let text = pdf.extract_text(&[page_number]).map_err(load_err)?;
            Ok(Document::from_page(source.as_ref(), page_number - 1, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_types_are_reported_not_raised() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("uu-ppn.md"), "# UU PPN\n\nPajak Pertambahan Nilai").unwrap();

        let loaded = DocumentLoader::new(temp.path()).load();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(
            loaded.reports,
            vec![
                TypeLoad::NotFound { kind: FileKind::Pdf },
                TypeLoad::Loaded { kind: FileKind::Markdown, count: 1 },
                TypeLoad::NotFound { kind: FileKind::Text },
            ]
        );
    }

    #[test]
    fn types_load_in_fixed_order_and_sorted_within_type() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.txt"), "teks b").unwrap();
        fs::write(temp.path().join("a.txt"), "teks a").unwrap();
        fs::write(temp.path().join("z.md"), "markdown z").unwrap();
        fs::write(temp.path().join("ignored.docx"), "nope").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested/deep.txt"), "not scanned").unwrap();

        let loaded = DocumentLoader::new(temp.path()).load();
        let texts: Vec<&str> = loaded.documents.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["markdown z", "teks a", "teks b"]);
        assert!(loaded.documents.iter().all(|d| d.metadata.page.is_none()));
    }

    #[test]
    fn hidden_files_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(".draft.md"), "belum final").unwrap();
        fs::write(temp.path().join("final.md"), "sudah final").unwrap();

        let loaded = DocumentLoader::new(temp.path()).load();
        let texts: Vec<&str> = loaded.documents.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, ["sudah final"]);
        assert_eq!(loaded.reports[1], TypeLoad::Loaded { kind: FileKind::Markdown, count: 1 });
    }

    #[test]
    fn broken_type_does_not_block_others() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("rusak.pdf"), b"this is not a pdf").unwrap();
        fs::write(temp.path().join("catatan.txt"), "tetap dimuat").unwrap();

        let loaded = DocumentLoader::new(temp.path()).load();
        assert!(matches!(loaded.reports[0], TypeLoad::Failed { kind: FileKind::Pdf, .. }));
        assert_eq!(loaded.reports[2], TypeLoad::Loaded { kind: FileKind::Text, count: 1 });
        assert_eq!(loaded.documents.len(), 1);
    }

    #[test]
    fn invalid_utf8_fails_its_type() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("latin1.txt"), [0x50, 0x61, 0xff, 0xfe]).unwrap();

        let loaded = DocumentLoader::new(temp.path()).load();
        assert!(matches!(loaded.reports[2], TypeLoad::Failed { kind: FileKind::Text, .. }));
        assert!(loaded.documents.is_empty());
    }

    #[test]
    fn missing_directory_yields_empty_result() {
        let temp = tempfile::tempdir().unwrap();
        let loaded = DocumentLoader::new(temp.path().join("absent")).load();
        assert!(loaded.documents.is_empty());
        assert!(loaded.reports.iter().all(|r| matches!(r, TypeLoad::Failed { .. })));
    }
}
