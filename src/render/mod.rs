//! Rendering helpers shared by the orchestrator and the template assembler.

mod cleanup;
mod table;

pub use cleanup::{CleanupOptions, CleanupPipeline, CleanupPreset};
pub use table::{
    chronology_table, contains_markdown_table, extract_non_table_text, extract_protocol_tables,
    is_separator_line, is_table_line, parse_markdown_table, segment_content, MarkdownTable,
    Segment, CHRONOLOGY_HEADERS,
};

use crate::model::ContentBlock;

/// Tag generated text by shape.
pub fn classify_content(text: impl Into<String>) -> ContentBlock {
    let text = text.into();
    if contains_markdown_table(&text) {
        ContentBlock::Table(text)
    } else {
        ContentBlock::Text(text)
    }
}
