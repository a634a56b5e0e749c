//! Protocol section tree.

use super::Record;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Number of table rows shown in prompt previews.
const TABLE_PREVIEW_ROWS: usize = 3;

/// Dotted numeric section identifier such as `1.0` or `4.12`.
///
/// Ordering is numeric on `(major, minor)`, never lexical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionId {
    major: u32,
    minor: u32,
    label: String,
}

impl SectionId {
    /// Create an identifier from its numeric parts.
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            label: format!("{}.{}", major, minor),
        }
    }

    /// Parse an identifier like `3.2`, keeping the original spelling.
    pub fn parse(label: &str) -> Option<Self> {
        let (major, minor) = label.trim().split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
            label: label.trim().to_string(),
        })
    }

    /// Synthetic main-section identifier `<index>.0`.
    pub fn main(index: u32) -> Self {
        Self::new(index, 0)
    }

    /// Major component.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Minor component.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Main sections end in `.0` and own a title.
    pub fn is_main(&self) -> bool {
        self.minor == 0
    }

    /// Identifier as written in the document.
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl Ord for SectionId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, &self.label).cmp(&(other.major, other.minor, &other.label))
    }
}

impl PartialOrd for SectionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A table captured inside a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableItem {
    /// Column headers from the first table row
    pub headers: Vec<String>,
    /// Data rows
    pub rows: Vec<Record>,
}

impl TableItem {
    /// Build from raw cell text; the first row supplies the headers.
    pub fn from_cells(cells: &[Vec<String>]) -> Self {
        let Some((first, rest)) = cells.split_first() else {
            return Self::default();
        };
        let headers: Vec<String> = first
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() {
                    format!("Column_{}", i + 1)
                } else {
                    h.to_string()
                }
            })
            .collect();
        let rows = rest
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(|c| c.trim().to_string()).collect();
                Record::from_row(&headers, &cells)
            })
            .collect();
        Self { headers, rows }
    }
}

/// Ordered content inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionItem {
    /// Paragraph text
    Text(String),
    /// Table rows
    Table(TableItem),
}

/// A protocol section.
///
/// Sub-sections start as a bare heading (`Leaf`); the first appended item
/// turns the heading into the first content item of a `Node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    /// Heading text with no content yet
    Leaf { text: String },
    /// Section with ordered content
    Node {
        title: Option<String>,
        items: Vec<SectionItem>,
    },
}

impl Section {
    /// A titled main section.
    pub fn main(title: impl Into<String>) -> Self {
        Section::Node {
            title: Some(title.into()),
            items: Vec::new(),
        }
    }

    /// A sub-section holding only its heading.
    pub fn sub(heading: impl Into<String>) -> Self {
        Section::Leaf {
            text: heading.into(),
        }
    }

    /// Append a content item, promoting a leaf into a node.
    pub fn push(&mut self, item: SectionItem) {
        match self {
            Section::Node { items, .. } => items.push(item),
            Section::Leaf { text } => {
                let heading = std::mem::take(text);
                *self = Section::Node {
                    title: None,
                    items: vec![SectionItem::Text(heading), item],
                };
            }
        }
    }

    /// Section title, if this is a titled node.
    pub fn title(&self) -> Option<&str> {
        match self {
            Section::Node { title, .. } => title.as_deref(),
            Section::Leaf { .. } => None,
        }
    }

    /// Content items. A leaf reports its heading as the single item.
    pub fn items(&self) -> Vec<SectionItem> {
        match self {
            Section::Node { items, .. } => items.clone(),
            Section::Leaf { text } => vec![SectionItem::Text(text.clone())],
        }
    }

    /// Concatenated text items.
    pub fn text(&self) -> String {
        match self {
            Section::Leaf { text } => text.clone(),
            Section::Node { items, .. } => items
                .iter()
                .filter_map(|item| match item {
                    SectionItem::Text(t) => Some(t.as_str()),
                    SectionItem::Table(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Sections keyed and ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTree {
    sections: BTreeMap<SectionId, Section>,
}

impl SectionTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section, replacing any earlier one with the same identifier.
    pub fn insert(&mut self, id: SectionId, section: Section) {
        self.sections.insert(id, section);
    }

    /// Look up a section.
    pub fn get(&self, id: &SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, id: &SectionId) -> Option<&mut Section> {
        self.sections.get_mut(id)
    }

    /// Identifiers in ascending numeric order.
    pub fn ids(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.keys()
    }

    /// Sections in ascending numeric order.
    pub fn iter(&self) -> impl Iterator<Item = (&SectionId, &Section)> {
        self.sections.iter()
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Check if no section was found.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// First main section whose title contains `needle`, case-insensitive.
    pub fn find_by_title(&self, needle: &str) -> Option<(&SectionId, &Section)> {
        let needle = needle.to_lowercase();
        self.sections.iter().find(|(_, section)| {
            section
                .title()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
    }

    /// Text of the main section matching `needle` and its sub-sections.
    pub fn section_text(&self, needle: &str) -> Option<String> {
        let (id, section) = self.find_by_title(needle)?;
        let major = id.major();
        let mut parts = vec![section.text()];
        parts.extend(
            self.sections
                .iter()
                .filter(|(sub, _)| sub.major() == major && !sub.is_main())
                .map(|(_, s)| s.text()),
        );
        let text = parts
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        (!text.is_empty()).then_some(text)
    }

    /// Render the tree as compact text for generation prompts.
    pub fn format_for_prompt(&self) -> String {
        let mut parts = Vec::with_capacity(self.sections.len());
        for (id, section) in &self.sections {
            let mut out = String::new();
            match section {
                Section::Leaf { text } => {
                    out.push_str(&format!("## {}\n{}\n", id, text));
                }
                Section::Node { title, items } => {
                    match title {
                        Some(title) => out.push_str(&format!("## {}: {}\n", id, title)),
                        None => out.push_str(&format!("## {}\n", id)),
                    }
                    for item in items {
                        match item {
                            SectionItem::Text(text) => {
                                out.push_str(text);
                                out.push('\n');
                            }
                            SectionItem::Table(table) => out.push_str(&preview_table(table)),
                        }
                    }
                }
            }
            parts.push(out);
        }
        parts.join("\n")
    }
}

fn preview_table(table: &TableItem) -> String {
    if table.rows.is_empty() {
        return "### Empty table\n".to_string();
    }
    let mut out = String::from("### Table content:\n");
    for (i, row) in table.rows.iter().take(TABLE_PREVIEW_ROWS).enumerate() {
        out.push_str(&format!("Row {}: {}\n", i + 1, row));
    }
    if table.rows.len() > TABLE_PREVIEW_ROWS {
        out.push_str(&format!("... ({} rows total)\n", table.rows.len()));
    }
    out
}
