//! Protocol document parsing.
//!
//! [`DocxReader`] turns a Word container into a flat list of paragraphs and
//! tables; [`DocumentStructureParser`] recovers the numbered section tree.

mod docx;
mod options;
mod structure;

pub use docx::{parse_document_xml, DocxReader};
pub(crate) use docx::{read_part, DOCUMENT_PART};
pub use options::{ErrorMode, ExtractionOptions, ParseOptions};
pub use structure::{is_stop_heading, section_index, DocumentStructureParser, Heading};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .lenient()
            .text_only()
            .with_max_title_len(60)
            .with_appendices();

        assert_eq!(options.error_mode, ErrorMode::Lenient);
        assert!(!options.extract_tables);
        assert_eq!(options.max_title_len, 60);
        assert!(!options.stop_at_appendices);
    }

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(options.stop_at_appendices);
        assert!(options.extract_tables);

        let extraction = ExtractionOptions::default();
        assert!(extraction.parallel);
        assert_eq!(extraction.dut_max_columns, 20);
        assert!(!ExtractionOptions::new().sequential().parallel);
    }
}
