//! Citation anchor parsing for source documents.
//!
//! Anchors look like `[SourceID: DPA-7.1]`. The citable text of an anchor runs
//! from just after it to the next anchor, heading, horizontal rule, or end of
//! document, whichever comes first.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Section assigned to text that appears before any second-level heading.
pub const DEFAULT_SECTION: &str = "Introduction";

/// Title assigned to documents without a first-level heading.
pub const UNTITLED: &str = "Untitled";

pub(crate) static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[SourceID:\s*([^\]]+)\]").unwrap());

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+(.+)$").unwrap());

/// One resolved anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub source_id: String,
    pub text: String,
    pub document_name: String,
    pub section_heading: String,
}

struct Heading<'a> {
    start: usize,
    level: usize,
    title: &'a str,
}

fn headings(content: &str) -> impl Iterator<Item = Heading<'_>> {
    HEADING_RE.captures_iter(content).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(Heading {
            start: whole.start(),
            level: caps.get(1)?.as_str().len(),
            title: caps.get(2)?.as_str().trim(),
        })
    })
}

/// First level-one heading, or [`UNTITLED`].
pub fn document_title(content: &str) -> String {
    headings(content)
        .find(|heading| heading.level == 1)
        .map_or_else(|| UNTITLED.to_string(), |heading| heading.title.to_string())
}

/// Level-two headings in document order.
pub fn section_headings(content: &str) -> Vec<String> {
    headings(content)
        .filter(|heading| heading.level == 2)
        .map(|heading| heading.title.to_string())
        .collect()
}

/// Ids of every anchor in `text`, in order of appearance.
pub fn anchor_ids(text: &str) -> impl Iterator<Item = &str> {
    ANCHOR_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|id| id.as_str().trim()))
}

/// Parse every anchor in `content` into citations, in document order.
///
/// Anchors whose extracted text is empty are dropped. If the same id occurs
/// twice in one document both entries are returned; the caller decides which
/// one wins.
pub fn parse_citations(content: &str, document_name: &str) -> Vec<Citation> {
    let sections: Vec<(usize, &str)> = headings(content)
        .filter(|heading| heading.level == 2)
        .map(|heading| (heading.start, heading.title))
        .collect();
    let anchors: Vec<_> = ANCHOR_RE.captures_iter(content).collect();

    let mut citations = Vec::new();
    for (i, caps) in anchors.iter().enumerate() {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = anchors
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(content.len(), |next| next.start());

        let text = anchor_text(&content[whole.end()..end]);
        if text.is_empty() {
            continue;
        }

        let section = sections
            .iter()
            .take_while(|(start, _)| *start < whole.start())
            .last()
            .map_or(DEFAULT_SECTION, |&(_, title)| title);

        citations.push(Citation {
            source_id: id.as_str().trim().to_string(),
            text,
            document_name: document_name.to_string(),
            section_heading: section.to_string(),
        });
    }
    citations
}

/// Text up to the first heading or `---` line.
fn anchor_text(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .trim()
        .lines()
        .take_while(|line| {
            let stripped = line.trim();
            !stripped.starts_with('#') && stripped != "---"
        })
        .collect();
    lines.join("\n").trim().to_string()
}
