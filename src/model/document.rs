//! Flat protocol document as read from the Word container.

use serde::{Deserialize, Serialize};

/// A top-level body element in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocElement {
    /// Paragraph text with runs concatenated
    Paragraph(String),
    /// Table cells, row by row
    Table(Vec<Vec<String>>),
}

/// The protocol document: paragraphs and tables in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDocument {
    /// Body elements
    pub elements: Vec<DocElement>,
}

impl ProtocolDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from elements.
    pub fn from_elements(elements: Vec<DocElement>) -> Self {
        Self { elements }
    }

    /// Append a paragraph.
    pub fn push_paragraph(&mut self, text: impl Into<String>) {
        self.elements.push(DocElement::Paragraph(text.into()));
    }

    /// Append a table.
    pub fn push_table(&mut self, rows: Vec<Vec<String>>) {
        self.elements.push(DocElement::Table(rows));
    }

    /// Number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, DocElement::Paragraph(_)))
            .count()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, DocElement::Table(_)))
            .count()
    }

    /// Flat text of the whole document.
    ///
    /// Tables are written as pipe-delimited rows with a separator after the
    /// first row so they keep their markdown shape.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for element in &self.elements {
            match element {
                DocElement::Paragraph(text) => {
                    if !text.trim().is_empty() {
                        lines.push(text.trim().to_string());
                    }
                }
                DocElement::Table(rows) => {
                    for (i, row) in rows.iter().enumerate() {
                        let cells: Vec<String> =
                            row.iter().map(|c| c.replace('\n', " ").trim().to_string()).collect();
                        lines.push(format!("| {} |", cells.join(" | ")));
                        if i == 0 {
                            lines.push(format!("|{}|", vec![" --- "; cells.len()].join("|")));
                        }
                    }
                }
            }
        }
        lines.join("\n")
    }
}
