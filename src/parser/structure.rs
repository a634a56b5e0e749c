//! Recovers the numbered section tree from a flat protocol document.

use super::options::ParseOptions;
use crate::model::{
    DocElement, ProtocolDocument, Section, SectionId, SectionItem, SectionTree, TableItem,
};
use flate2::Crc;
use log::{debug, info};
use regex::Regex;

/// Headings that end the parsed body.
const STOP_HEADINGS: [&str; 4] = ["appendices", "appendix", "附录", "attachments"];

/// Paragraphs shorter than this stop parsing if they merely contain a stop heading.
const STOP_CONTAINS_MAX_LEN: usize = 50;

/// Vocabulary headings have at most this many words.
const MAX_TITLE_WORDS: usize = 6;

/// Canonical section titles and their synthetic indices, checked in order.
const TITLE_INDEX: [(&str, u32); 18] = [
    ("Purpose", 1),
    ("Scope", 2),
    ("Background", 3),
    ("Test Method Summary", 4),
    ("References", 5),
    ("Definitions", 6),
    ("Responsibility", 7),
    ("Materials", 8),
    ("Device Under Test Configuration", 9),
    ("Test Consumables", 10),
    ("Equipment", 11),
    ("General Instructions", 12),
    ("Procedure", 13),
    ("Test Method", 14),
    ("Test Setup", 15),
    ("Test Execution", 16),
    ("Data Analysis", 17),
    ("Acceptance Criteria", 18),
];

/// How a paragraph was recognized as a heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heading {
    /// Numbered heading such as `3.1 Setup`
    Numbered { id: SectionId, title: String },
    /// Vocabulary heading such as `PURPOSE`
    Titled { id: SectionId },
}

/// Turns a protocol document into a [`SectionTree`].
pub struct DocumentStructureParser {
    options: ParseOptions,
    numbered: Vec<Regex>,
}

impl DocumentStructureParser {
    /// Create a parser with the given options.
    pub fn new(options: ParseOptions) -> Self {
        let numbered = [
            r"^(\d+\.\d+)\s+(.*)$",
            r"^(\d+\.\d+)(?:\.\s*|$)(.*)$",
            r"^(\d+\.\d+)\s*:\s*(.*)$",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();
        Self { options, numbered }
    }

    /// Build the section tree.
    ///
    /// Content before the first heading is dropped; everything after an
    /// appendices heading is ignored.
    pub fn parse(&self, document: &ProtocolDocument) -> SectionTree {
        let mut tree = SectionTree::new();
        let mut current: Option<SectionId> = None;

        for element in &document.elements {
            match element {
                DocElement::Paragraph(raw) => {
                    let text = raw.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if self.options.stop_at_appendices && is_stop_heading(text) {
                        info!("Stopping section parsing at '{}'", text);
                        break;
                    }
                    match self.classify(text) {
                        Some(Heading::Numbered { id, title }) => {
                            let section = if id.is_main() {
                                Section::main(title)
                            } else {
                                Section::sub(text)
                            };
                            debug!("Section {} from numbered heading", id);
                            tree.insert(id.clone(), section);
                            current = Some(id);
                        }
                        Some(Heading::Titled { id }) => {
                            debug!("Section {} from title '{}'", id, text);
                            tree.insert(id.clone(), Section::main(text));
                            current = Some(id);
                        }
                        None => {
                            if let Some(section) = current.as_ref().and_then(|id| tree.get_mut(id)) {
                                section.push(SectionItem::Text(text.to_string()));
                            }
                        }
                    }
                }
                DocElement::Table(cells) => {
                    if !self.options.extract_tables {
                        continue;
                    }
                    if let Some(section) = current.as_ref().and_then(|id| tree.get_mut(id)) {
                        section.push(SectionItem::Table(TableItem::from_cells(cells)));
                    }
                }
            }
        }

        info!("Parsed {} protocol sections", tree.len());
        tree
    }

    /// Decide whether a trimmed paragraph is a heading.
    pub fn classify(&self, text: &str) -> Option<Heading> {
        for re in &self.numbered {
            if let Some(caps) = re.captures(text) {
                let id = caps.get(1).and_then(|m| SectionId::parse(m.as_str()))?;
                let title = caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                return Some(Heading::Numbered { id, title });
            }
        }

        if text.chars().count() < self.options.max_title_len
            && text.split_whitespace().count() <= MAX_TITLE_WORDS
        {
            let lower = text
                .trim_start_matches(|c: char| !c.is_alphabetic())
                .to_lowercase();
            let known = TITLE_INDEX
                .iter()
                .any(|(title, _)| lower.starts_with(&title.to_lowercase()));
            if known {
                return Some(Heading::Titled {
                    id: SectionId::main(section_index(text)),
                });
            }
        }
        None
    }
}

impl Default for DocumentStructureParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

/// Whether a paragraph opens the appendices.
pub fn is_stop_heading(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    STOP_HEADINGS.iter().any(|stop| {
        lower == *stop
            || lower.starts_with(&format!("{} ", stop))
            || lower.starts_with(&format!("{}:", stop))
            || (lower.contains(stop) && lower.chars().count() < STOP_CONTAINS_MAX_LEN)
    })
}

/// Synthetic major index for a vocabulary heading.
///
/// Unknown titles get a stable index in `20..120` derived from a CRC-32.
pub fn section_index(title: &str) -> u32 {
    let lower = title.to_lowercase();
    TITLE_INDEX
        .iter()
        .find(|(name, _)| lower.contains(&name.to_lowercase()))
        .map(|(_, index)| *index)
        .unwrap_or_else(|| {
            let mut crc = Crc::new();
            crc.update(lower.as_bytes());
            crc.sum() % 100 + 20
        })
}
