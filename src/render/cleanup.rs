//! Cleanup of generated markdown before it is written into the report.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Section titles that the template already prints.
const SECTION_TITLES: [&str; 7] = [
    "REFERENCES",
    "TEST PROCEDURE SUMMARY",
    "ACRONYMS",
    "DEFINITIONS",
    "PURPOSE",
    "SCOPE",
    "TEST METHOD LOSS INVESTIGATIONS",
];

/// Template instruction phrases echoed back by generation.
const INSTRUCTION_PHRASES: [&str; 5] = [
    "List in this section",
    "This section",
    "Use this section",
    "Include in this section",
    "Document in this section",
];

/// Cleanup preset levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPreset {
    /// Minimal cleanup: Unicode NFC normalization only
    Minimal,
    /// Document cleanup: plain text suitable for the report body
    #[default]
    Document,
}

/// Options for text cleanup.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,

    /// Fix ligatures (fi, fl, etc.)
    pub fix_ligatures: bool,

    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_char: bool,

    /// Remove standalone lines repeating a template section title
    pub remove_section_titles: bool,

    /// Remove echoed template instructions
    pub remove_instructions: bool,

    /// Strip heading markers, emphasis, links and code formatting
    pub strip_markdown: bool,

    /// Drop blank lines entirely
    pub remove_blank_lines: bool,

    /// Maximum consecutive newlines (0 = unlimited)
    pub max_consecutive_newlines: u8,
}

impl CleanupOptions {
    /// Create options from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        match preset {
            CleanupPreset::Minimal => Self::minimal(),
            CleanupPreset::Document => Self::document(),
        }
    }

    /// Minimal cleanup options.
    pub fn minimal() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: false,
            remove_replacement_char: false,
            remove_section_titles: false,
            remove_instructions: false,
            strip_markdown: false,
            remove_blank_lines: false,
            max_consecutive_newlines: 0,
        }
    }

    /// Document cleanup options.
    pub fn document() -> Self {
        Self {
            normalize_unicode: true,
            fix_ligatures: true,
            remove_replacement_char: true,
            remove_section_titles: true,
            remove_instructions: true,
            strip_markdown: true,
            remove_blank_lines: true,
            max_consecutive_newlines: 2,
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::document()
    }
}

/// Markdown cleanup pipeline.
#[derive(Debug, Clone)]
pub struct CleanupPipeline {
    options: CleanupOptions,
    section_titles: Vec<Regex>,
    instructions: Regex,
    heading: Regex,
    bold: Regex,
    italic: Regex,
    link: Regex,
    code_block: Regex,
    inline_code: Regex,
    blank_line: Regex,
    ligature_map: Vec<(&'static str, &'static str)>,
}

impl CleanupPipeline {
    /// Create a new cleanup pipeline with the given options.
    pub fn new(options: CleanupOptions) -> Self {
        let section_titles = SECTION_TITLES
            .iter()
            .map(|title| {
                Regex::new(&format!(
                    r"(?mi)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\d+\.\d*[ \t]*)?{}[ \t]*:?[ \t]*$\n?",
                    regex::escape(title)
                ))
                .unwrap()
            })
            .collect();
        let phrases = INSTRUCTION_PHRASES
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            options,
            section_titles,
            instructions: Regex::new(&format!(r"(?i)(?:{})[^.\n]*\.?", phrases)).unwrap(),
            heading: Regex::new(r"(?m)^#{1,6}\s+").unwrap(),
            bold: Regex::new(r"\*\*(.*?)\*\*").unwrap(),
            italic: Regex::new(r"\*(.*?)\*").unwrap(),
            link: Regex::new(r"\[([^\]]+)\]\([^\)]+\)").unwrap(),
            code_block: Regex::new(r"(?s)```[A-Za-z0-9_-]*\n?(.*?)```").unwrap(),
            inline_code: Regex::new(r"`([^`]+)`").unwrap(),
            blank_line: Regex::new(r"(?m)^[ \t]*\n").unwrap(),
            ligature_map: vec![
                ("\u{FB00}", "ff"),
                ("\u{FB01}", "fi"),
                ("\u{FB02}", "fl"),
                ("\u{FB03}", "ffi"),
                ("\u{FB04}", "ffl"),
            ],
        }
    }

    /// Create a pipeline from a preset.
    pub fn from_preset(preset: CleanupPreset) -> Self {
        Self::new(CleanupOptions::from_preset(preset))
    }

    /// Process text through the cleanup pipeline.
    pub fn process(&self, text: &str) -> String {
        let mut result = text.replace("\r\n", "\n");

        // Stage 1: character-level normalization
        if self.options.normalize_unicode {
            result = result.nfc().collect();
        }
        if self.options.fix_ligatures {
            for (ligature, replacement) in &self.ligature_map {
                result = result.replace(ligature, replacement);
            }
        }
        if self.options.remove_replacement_char {
            result = result.replace('\u{FFFD}', "");
        }

        // Stage 2: template echoes
        if self.options.remove_section_titles {
            for re in &self.section_titles {
                result = re.replace_all(&result, "").to_string();
            }
        }
        if self.options.remove_instructions {
            result = self.instructions.replace_all(&result, "").to_string();
        }

        // Stage 3: markdown formatting
        if self.options.strip_markdown {
            result = self.heading.replace_all(&result, "").to_string();
            result = self.code_block.replace_all(&result, "$1").to_string();
            result = self.bold.replace_all(&result, "$1").to_string();
            result = self.italic.replace_all(&result, "$1").to_string();
            result = self.link.replace_all(&result, "$1").to_string();
            result = self.inline_code.replace_all(&result, "$1").to_string();
        }

        // Stage 4: line spacing
        if self.options.max_consecutive_newlines > 0 {
            result = self.limit_newlines(&result);
        }
        if self.options.remove_blank_lines {
            result = self.blank_line.replace_all(&result, "").to_string();
        }

        result.trim().to_string()
    }

    fn limit_newlines(&self, text: &str) -> String {
        let max = self.options.max_consecutive_newlines as usize;
        let pattern = format!(r"\n{{{},}}", max + 1);
        let re = Regex::new(&pattern).unwrap();
        let replacement = "\n".repeat(max);
        re.replace_all(text, replacement.as_str()).to_string()
    }
}

impl Default for CleanupPipeline {
    fn default() -> Self {
        Self::new(CleanupOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_normalization() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Minimal);
        let text = "cafe\u{0301}";
        assert_eq!(pipeline.process(text), "caf\u{00E9}");
    }

    #[test]
    fn test_removes_section_titles() {
        let pipeline = CleanupPipeline::default();
        let text = "REFERENCES\n| Document No. | Title |\n| --- | --- |\n## 4.0 Scope\nThe scope text.";
        assert_eq!(
            pipeline.process(text),
            "| Document No. | Title |\n| --- | --- |\nThe scope text."
        );
    }

    #[test]
    fn test_keeps_titles_inside_sentences() {
        let pipeline = CleanupPipeline::default();
        assert_eq!(
            pipeline.process("The purpose of this report is clear."),
            "The purpose of this report is clear."
        );
    }

    #[test]
    fn test_removes_instruction_phrases() {
        let pipeline = CleanupPipeline::default();
        let text = "List in this section all references used. DOC-1 applies.";
        assert_eq!(pipeline.process(text), "DOC-1 applies.");
    }

    #[test]
    fn test_strips_markdown() {
        let pipeline = CleanupPipeline::default();
        let text = "# Heading\n**Bold** and *italic* with [link](http://x) and `code`.";
        assert_eq!(
            pipeline.process(text),
            "Heading\nBold and italic with link and code."
        );
    }

    #[test]
    fn test_removes_blank_lines() {
        let pipeline = CleanupPipeline::default();
        assert_eq!(pipeline.process("a\n\n\n\nb\n  \nc"), "a\nb\nc");
    }

    #[test]
    fn test_ligature_fix() {
        let pipeline = CleanupPipeline::default();
        assert_eq!(pipeline.process("ﬁnding ﬂowers"), "finding flowers");
    }

    #[test]
    fn test_minimal_keeps_markdown() {
        let pipeline = CleanupPipeline::from_preset(CleanupPreset::Minimal);
        assert_eq!(pipeline.process("**Bold**\n\nNext"), "**Bold**\n\nNext");
    }
}
