//! Parsing options and configuration.

/// Options for parsing protocol documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Stop at the first appendices/attachments heading
    pub stop_at_appendices: bool,

    /// Longest paragraph treated as a vocabulary heading (characters)
    pub max_title_len: usize,

    /// Whether tables are kept as section content
    pub extract_tables: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip undecodable elements).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Keep parsing past appendices headings.
    pub fn with_appendices(mut self) -> Self {
        self.stop_at_appendices = false;
        self
    }

    /// Set the longest paragraph considered as a vocabulary heading.
    pub fn with_max_title_len(mut self, len: usize) -> Self {
        self.max_title_len = len;
        self
    }

    /// Text only: drop tables from section content.
    pub fn text_only(mut self) -> Self {
        self.extract_tables = false;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            stop_at_appendices: true,
            max_title_len: 100,
            extract_tables: true,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip invalid content and continue
    Lenient,
}

/// Options for the spreadsheet extraction engine.
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    /// Extract workbooks in parallel
    pub parallel: bool,

    /// Widest row kept when formatting DUT sheets
    pub dut_max_columns: usize,

    /// Records shown in prompt previews
    pub preview_rows: usize,
}

impl ExtractionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_dut_max_columns(mut self, columns: usize) -> Self {
        self.dut_max_columns = columns;
        self
    }

    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            dut_max_columns: 20,
            preview_rows: 3,
        }
    }
}
