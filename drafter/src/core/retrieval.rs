//! Deterministic context selection for the generation prompt.
//!
//! There is no similarity search: chunks are selected by document name and
//! passed to the model in corpus order.

use thiserror::Error;

use crate::core::chunker::DocumentChunk;
use crate::core::types::ContractType;

/// Separator line placed between rendered chunks.
pub const CHUNK_SEPARATOR: &str = "\n---\n";

/// Bounds on how much source text reaches the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    /// Maximum chunks rendered into the context.
    pub max_context_chunks: usize,
    /// Chunks taken from the head of the corpus when no document matches.
    pub fallback_chunks: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            max_context_chunks: 15,
            fallback_chunks: 20,
        }
    }
}

/// Context could not be assembled; the run stops before any generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextRetrievalError {
    #[error("document store unavailable: {0}")]
    Store(String),
    #[error("no source chunks available for {0}")]
    Empty(ContractType),
}

/// Select chunks belonging to `document_name`, falling back to the corpus head.
///
/// The result is already capped at `limits.max_context_chunks`.
pub fn select_chunks<'a>(
    chunks: &'a [DocumentChunk],
    document_name: Option<&str>,
    limits: RetrievalLimits,
) -> Vec<&'a DocumentChunk> {
    let mut selected: Vec<&DocumentChunk> = match document_name {
        Some(name) => chunks
            .iter()
            .filter(|chunk| chunk.document_name == name)
            .collect(),
        None => Vec::new(),
    };
    if selected.is_empty() {
        selected = chunks.iter().take(limits.fallback_chunks).collect();
    }
    selected.truncate(limits.max_context_chunks);
    selected
}

/// Render selected chunks as prompt context.
///
/// Each chunk is preceded by a `[Sources: ...]` line listing its anchor ids
/// (or `N/A`), and chunks are separated by [`CHUNK_SEPARATOR`].
pub fn render_context(chunks: &[&DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let sources = if chunk.source_ids.is_empty() {
                "N/A".to_string()
            } else {
                chunk
                    .source_ids
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!("[Sources: {sources}]\n{}\n", chunk.text)
        })
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
