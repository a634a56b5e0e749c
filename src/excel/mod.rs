//! Spreadsheet extraction engine.
//!
//! Each uploaded workbook is scanned for worksheets belonging to known
//! categories. Matching sheets are handed to the [`SheetExtractor`] registered
//! for their family and the results are merged into one [`ExcelData`].
//!
//! # Example
//!
//! ```no_run
//! use dvtreport::excel::ExcelExtractionEngine;
//! use dvtreport::model::SourceFile;
//!
//! let engine = ExcelExtractionEngine::default();
//! let data = engine.extract_files(&[SourceFile::new("logs.xlsx", "uploads/logs.xlsx")]);
//! println!("Sheets found: {:?}", data.summary.sheets_found);
//! ```

mod attachment;
mod dut;
mod logs;
mod sheet;
mod test_article;

pub use attachment::{
    attachment_filename, raw_data_slot, write_attachment, AttachmentPolicy, LOG_DATA_LABEL,
    RAW_DATA_LABEL,
};
pub use dut::{count_unique_duts, format_dut_sheets, NO_DUT_DATA};
pub use logs::{
    format_records, format_test_method_losses, RecordExtractor, TestMethodLossExtractor,
    NO_DEFECTIVE_UNITS_DATA, NO_DEVIATIONS_DATA, NO_LOG_DATA, NO_TML_DATA, TML_FIELDS,
};
pub use sheet::{
    cell_to_string, normalize_sheet_name, range_to_sheet, read_workbook, sheet_headers,
    sheet_to_records,
};
pub use test_article::{
    classify_result, format_test_articles, ResultClass, TestArticleExtractor,
    NO_TEST_ARTICLE_DATA,
};

use crate::error::Result;
use crate::model::{
    DutSheet, ExcelData, RawSheet, SheetCategory, SheetFamily, SourceFile, WorksheetExtraction,
};
use crate::parser::ExtractionOptions;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for worksheet extractors.
///
/// Implement this trait to normalize a new worksheet family.
pub trait SheetExtractor: Send + Sync {
    /// Family handled by this extractor.
    fn family(&self) -> SheetFamily;

    /// Name of this extractor.
    fn name(&self) -> &str;

    /// Normalize one sheet. `None` means the sheet holds nothing usable.
    fn extract(
        &self,
        sheet: &RawSheet,
        category: SheetCategory,
        source: &SourceFile,
    ) -> Option<WorksheetExtraction>;

    /// Category of a sheet name, if it belongs to this family.
    fn category_for(&self, sheet_name: &str) -> Option<SheetCategory> {
        normalize_sheet_name(sheet_name).filter(|c| c.family() == self.family())
    }
}

/// Registry for worksheet extractors, keyed by family.
pub struct ExtractorRegistry {
    extractors: HashMap<SheetFamily, Arc<dyn SheetExtractor>>,
    by_name: HashMap<String, Arc<dyn SheetExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the built-in extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TestArticleExtractor::new()));
        registry.register(Arc::new(RecordExtractor::logs()));
        registry.register(Arc::new(RecordExtractor::deviations()));
        registry.register(Arc::new(RecordExtractor::defective_units()));
        registry.register(Arc::new(TestMethodLossExtractor));
        registry
    }

    /// Register an extractor, replacing any earlier one for the same family.
    pub fn register(&mut self, extractor: Arc<dyn SheetExtractor>) {
        self.extractors.insert(extractor.family(), extractor.clone());
        self.by_name.insert(extractor.name().to_lowercase(), extractor);
    }

    /// Get the extractor for a family.
    pub fn get(&self, family: SheetFamily) -> Option<Arc<dyn SheetExtractor>> {
        self.extractors.get(&family).cloned()
    }

    /// Get an extractor by name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn SheetExtractor>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if a family has an extractor.
    pub fn supports(&self, family: SheetFamily) -> bool {
        self.extractors.contains_key(&family)
    }

    /// Extractor and category for a sheet name.
    pub fn resolve(&self, sheet_name: &str) -> Option<(Arc<dyn SheetExtractor>, SheetCategory)> {
        let category = normalize_sheet_name(sheet_name)?;
        let extractor = self.get(category.family())?;
        Some((extractor, category))
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Extractions from one workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookExtraction {
    pub extractions: Vec<WorksheetExtraction>,
    /// Sheet used for the device configuration section
    pub dut_sheet: Option<DutSheet>,
}

/// Locates and normalizes known worksheets across uploaded workbooks.
pub struct ExcelExtractionEngine {
    registry: ExtractorRegistry,
    options: ExtractionOptions,
}

impl ExcelExtractionEngine {
    /// Create an engine with the built-in extractors.
    pub fn new(options: ExtractionOptions) -> Self {
        Self::with_registry(ExtractorRegistry::with_defaults(), options)
    }

    /// Create an engine with a custom registry.
    pub fn with_registry(registry: ExtractorRegistry, options: ExtractionOptions) -> Self {
        Self { registry, options }
    }

    /// Engine options.
    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Extract every workbook and merge the results in upload order.
    ///
    /// A workbook that cannot be opened is recorded in the parsing summary
    /// and does not stop the others.
    pub fn extract_files(&self, files: &[SourceFile]) -> ExcelData {
        let results: Vec<Result<WorkbookExtraction>> = if self.options.parallel {
            files.par_iter().map(|f| self.extract_workbook(f)).collect()
        } else {
            files.iter().map(|f| self.extract_workbook(f)).collect()
        };

        let mut data = ExcelData::new();
        for (file, result) in files.iter().zip(results) {
            data.summary.files_processed += 1;
            match result {
                Ok(workbook) => {
                    for extraction in workbook.extractions {
                        data.insert(extraction);
                    }
                    data.dut_sheets.extend(workbook.dut_sheet);
                }
                Err(e) => {
                    warn!("Error processing {}: {}", file.filename, e);
                    data.summary
                        .errors
                        .push(format!("Error processing {}: {}", file.filename, e));
                }
            }
        }
        info!(
            "Processed {} workbooks, found sheets: {:?}",
            data.summary.files_processed, data.summary.sheets_found
        );
        data
    }

    /// Open one workbook and extract its known sheets.
    pub fn extract_workbook(&self, file: &SourceFile) -> Result<WorkbookExtraction> {
        let sheets = read_workbook(&file.path)?;
        Ok(self.extract_sheets(&sheets, file))
    }

    /// Extract known sheets from already-read worksheets.
    ///
    /// Unrecognized sheets are ignored; a family without a registered
    /// extractor yields nothing.
    pub fn extract_sheets(&self, sheets: &[RawSheet], source: &SourceFile) -> WorkbookExtraction {
        let mut workbook = WorkbookExtraction::default();
        for sheet in sheets {
            let Some((extractor, category)) = self.registry.resolve(&sheet.name) else {
                continue;
            };
            if category == SheetCategory::TestArticleLog && workbook.dut_sheet.is_none() {
                workbook.dut_sheet = Some(DutSheet {
                    source: source.clone(),
                    sheet: sheet.clone(),
                });
            }
            if let Some(extraction) = extractor.extract(sheet, category, source) {
                workbook.extractions.push(extraction);
            }
        }
        workbook
    }
}

impl Default for ExcelExtractionEngine {
    fn default() -> Self {
        Self::new(ExtractionOptions::default())
    }
}

/// Test-article summary followed by the DUT worksheets, bounded by `options`.
pub fn format_preview(data: &ExcelData, options: &ExtractionOptions) -> String {
    format!(
        "{}\n{}",
        format_test_articles(data.test_articles.as_ref(), options.preview_rows),
        format_dut_sheets(&data.dut_sheets, options.dut_max_columns)
    )
}
