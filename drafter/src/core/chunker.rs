//! Section-then-paragraph chunking of source documents.
//!
//! Chunk ids are a pure function of the document name and its text, so the
//! same corpus always yields the same chunk set.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::citations::anchor_ids;

/// Default chunk size threshold, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// A bounded slice of a document, with the anchor ids it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub text: String,
    pub document_name: String,
    pub source_ids: BTreeSet<String>,
}

/// Split `content` into retrieval chunks.
///
/// Sections (split before each `## ` heading line) at or below `chunk_size`
/// characters become one chunk each. Larger sections are split on blank-line
/// paragraph boundaries, accumulating paragraphs until the next one would push
/// the chunk past `chunk_size`.
pub fn chunk_document(content: &str, document_name: &str, chunk_size: usize) -> Vec<DocumentChunk> {
    let mut chunks = Vec::new();
    for (section_idx, section) in split_sections(content).into_iter().enumerate() {
        if char_len(section) <= chunk_size {
            push_chunk(
                &mut chunks,
                format!("{document_name}::chunk_{section_idx}"),
                section,
                document_name,
            );
            continue;
        }

        let mut current = String::new();
        let mut sub_idx = 0usize;
        for paragraph in section.split("\n\n") {
            if !current.is_empty() && char_len(&current) + char_len(paragraph) > chunk_size {
                push_chunk(
                    &mut chunks,
                    format!("{document_name}::chunk_{section_idx}_{sub_idx}"),
                    &current,
                    document_name,
                );
                current.clear();
                sub_idx += 1;
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        push_chunk(
            &mut chunks,
            format!("{document_name}::chunk_{section_idx}_{sub_idx}"),
            &current,
            document_name,
        );
    }
    chunks
}

fn push_chunk(chunks: &mut Vec<DocumentChunk>, chunk_id: String, text: &str, document_name: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    chunks.push(DocumentChunk {
        chunk_id,
        text: text.to_string(),
        document_name: document_name.to_string(),
        source_ids: anchor_ids(text).map(str::to_string).collect(),
    });
}

/// Split before every newline that is followed by `##` and whitespace.
///
/// The separating newline is dropped; `###` and deeper headings do not split.
fn split_sections(content: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    for (idx, _) in content.match_indices('\n') {
        let rest = &content[idx + 1..];
        let starts_section = rest
            .strip_prefix("##")
            .and_then(|after| after.chars().next())
            .is_some_and(char::is_whitespace);
        if starts_section {
            sections.push(&content[start..idx]);
            start = idx + 1;
        }
    }
    sections.push(&content[start..]);
    sections
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sections_become_single_chunks() {
        let content = "# Title\nIntro [SourceID: I-1]\n## One\nBody [SourceID: O-1] [SourceID: O-2]\n### Sub\nmore\n## Two\nTail";
        let chunks = chunk_document(content, "doc", DEFAULT_CHUNK_SIZE);
        let ids: Vec<_> = chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["doc::chunk_0", "doc::chunk_1", "doc::chunk_2"]);
        assert!(chunks[1].text.starts_with("## One"));
        assert!(chunks[1].text.contains("### Sub"));
        assert_eq!(
            chunks[1].source_ids,
            BTreeSet::from(["O-1".to_string(), "O-2".to_string()])
        );
        assert!(chunks[2].source_ids.is_empty());
    }

    #[test]
    fn oversized_section_splits_on_paragraphs() {
        let para_a = format!("[SourceID: A] {}", "a".repeat(30));
        let para_b = format!("[SourceID: B] {}", "b".repeat(30));
        let para_c = "c".repeat(10);
        let content = format!("{para_a}\n\n{para_b}\n\n{para_c}");

        let chunks = chunk_document(&content, "doc", 60);
        let ids: Vec<_> = chunks.iter().map(|chunk| chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["doc::chunk_0_0", "doc::chunk_0_1"]);
        assert_eq!(chunks[0].text, para_a);
        assert_eq!(chunks[0].source_ids, BTreeSet::from(["A".to_string()]));
        assert_eq!(chunks[1].text, format!("{para_b}\n\n{para_c}"));
        assert_eq!(chunks[1].source_ids, BTreeSet::from(["B".to_string()]));
    }

    #[test]
    fn empty_sections_are_skipped_but_keep_index() {
        let chunks = chunk_document("\n## One\nbody", "doc", DEFAULT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "doc::chunk_1");
    }

    #[test]
    fn chunking_is_deterministic() {
        let content = "## A\n[SourceID: X] text\n\n## B\nmore";
        assert_eq!(
            chunk_document(content, "doc", 10),
            chunk_document(content, "doc", 10)
        );
    }
}
