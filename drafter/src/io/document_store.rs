//! Source document ingestion: citation index, chunks and per-document metadata.
//!
//! A [`DocumentStore`] owns its load-once state. The first caller of
//! [`DocumentStore::corpus`] reads the directory; concurrent first callers
//! block on the load guard and then share the same [`Corpus`]. A failed load
//! is not cached, so a later call retries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::chunker::{DocumentChunk, chunk_document};
use crate::core::citations::{Citation, document_title, parse_citations, section_headings};
use crate::io::settings::DrafterSettings;

/// File extensions treated as source documents.
pub const ELIGIBLE_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

/// Fatal ingestion failures. Not retried within a run.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("source documents directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("no eligible documents (.md, .markdown, .txt) in {}", .0.display())]
    NoDocuments(PathBuf),
    #[error("read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Metadata for one ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub title: String,
    pub citation_count: usize,
    pub sections: Vec<String>,
}

/// An anchor id defined more than once; the later definition replaced the earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateAnchor {
    pub source_id: String,
    pub kept_document: String,
    pub replaced_document: String,
}

/// Immutable view of an ingested directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    citations: BTreeMap<String, Citation>,
    chunks: Vec<DocumentChunk>,
    documents: Vec<DocumentMetadata>,
    duplicates: Vec<DuplicateAnchor>,
}

impl Corpus {
    /// Build a corpus from `(file name, contents)` pairs, in the given order.
    pub fn from_documents<'a, I>(documents: I, chunk_size: usize) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut corpus = Corpus::default();
        for (filename, content) in documents {
            corpus.ingest(filename, content, chunk_size);
        }
        corpus
    }

    fn ingest(&mut self, filename: &str, content: &str, chunk_size: usize) {
        let document_name = document_name(filename);
        let citations = parse_citations(content, document_name);
        let citation_count = citations
            .iter()
            .map(|citation| citation.source_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        for citation in citations {
            let source_id = citation.source_id.clone();
            if let Some(replaced) = self.citations.insert(source_id.clone(), citation) {
                warn!(
                    source_id = %source_id,
                    kept = document_name,
                    replaced = %replaced.document_name,
                    "duplicate source anchor, keeping latest definition"
                );
                self.duplicates.push(DuplicateAnchor {
                    source_id,
                    kept_document: document_name.to_string(),
                    replaced_document: replaced.document_name,
                });
            }
        }

        let chunks = chunk_document(content, document_name, chunk_size);
        debug!(
            document = document_name,
            citations = citation_count,
            chunks = chunks.len(),
            "ingested document"
        );
        self.chunks.extend(chunks);
        self.documents.push(DocumentMetadata {
            filename: filename.to_string(),
            title: document_title(content),
            citation_count,
            sections: section_headings(content),
        });
    }

    pub fn citation(&self, source_id: &str) -> Option<&Citation> {
        self.citations.get(source_id)
    }

    /// Every citation keyed by source id.
    pub fn citation_index(&self) -> &BTreeMap<String, Citation> {
        &self.citations
    }

    /// All chunks, in document then chunk order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn documents(&self) -> &[DocumentMetadata] {
        &self.documents
    }

    pub fn duplicate_anchors(&self) -> &[DuplicateAnchor] {
        &self.duplicates
    }
}

/// File stem, used as the document name in chunk ids and retrieval.
fn document_name(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
}

/// Load-once store over a directory of source documents.
#[derive(Debug)]
pub struct DocumentStore {
    dir: PathBuf,
    chunk_size: usize,
    corpus: OnceLock<Corpus>,
    load_lock: Mutex<()>,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            dir: dir.into(),
            chunk_size,
            corpus: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &DrafterSettings) -> Self {
        Self::new(
            settings.source_documents_dir.clone(),
            settings.chunk_size_chars,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ingest the directory if it has not been ingested yet.
    pub fn load(&self) -> Result<(), IngestionError> {
        self.corpus().map(|_| ())
    }

    /// The loaded corpus, ingesting on first use.
    pub fn corpus(&self) -> Result<&Corpus, IngestionError> {
        if let Some(corpus) = self.corpus.get() {
            return Ok(corpus);
        }
        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(corpus) = self.corpus.get() {
            return Ok(corpus);
        }
        let corpus = read_corpus(&self.dir, self.chunk_size)?;
        Ok(self.corpus.get_or_init(|| corpus))
    }
}

#[instrument(skip_all, fields(dir = %dir.display()))]
fn read_corpus(dir: &Path, chunk_size: usize) -> Result<Corpus, IngestionError> {
    if !dir.is_dir() {
        return Err(IngestionError::MissingDirectory(dir.to_path_buf()));
    }
    let files = eligible_files(dir)?;
    if files.is_empty() {
        return Err(IngestionError::NoDocuments(dir.to_path_buf()));
    }

    let mut contents = Vec::with_capacity(files.len());
    for (filename, path) in files {
        let content = fs::read_to_string(&path)
            .map_err(|source| IngestionError::Read { path, source })?;
        contents.push((filename, content));
    }

    let corpus = Corpus::from_documents(
        contents
            .iter()
            .map(|(filename, content)| (filename.as_str(), content.as_str())),
        chunk_size,
    );
    info!(
        documents = corpus.documents.len(),
        citations = corpus.citations.len(),
        chunks = corpus.chunks.len(),
        duplicates = corpus.duplicates.len(),
        "loaded source documents"
    );
    Ok(corpus)
}

/// Eligible files sorted by file name.
fn eligible_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, IngestionError> {
    let read_err = |source| IngestionError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let eligible = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ELIGIBLE_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            });
        if !eligible {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
            warn!(path = %path.display(), "skipping non UTF-8 file name");
            continue;
        };
        files.push((filename.to_string(), path.clone()));
    }
    files.sort();
    Ok(files)
}
