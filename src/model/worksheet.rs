//! Worksheet extraction results and sampling statistics.

use super::Record;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Worksheet families handled by the extraction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetFamily {
    TestArticles,
    Logs,
    Deviations,
    DefectiveUnits,
    TestMethodLosses,
}

/// Canonical worksheet categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetCategory {
    TestArticleLog,
    EquipmentLog,
    SoftwareLog,
    MaterialLog,
    Deviations,
    ProtocolDeviations,
    DeviationLog,
    DefectiveUnits,
    DefectiveUnitInvestigations,
    FailedUnits,
    TestMethodLosses,
}

impl SheetCategory {
    /// All categories in lookup order.
    pub const ALL: [SheetCategory; 11] = [
        SheetCategory::TestArticleLog,
        SheetCategory::EquipmentLog,
        SheetCategory::SoftwareLog,
        SheetCategory::MaterialLog,
        SheetCategory::Deviations,
        SheetCategory::ProtocolDeviations,
        SheetCategory::DeviationLog,
        SheetCategory::DefectiveUnits,
        SheetCategory::DefectiveUnitInvestigations,
        SheetCategory::FailedUnits,
        SheetCategory::TestMethodLosses,
    ];

    /// The three log categories in report order.
    pub const LOGS: [SheetCategory; 3] = [
        SheetCategory::EquipmentLog,
        SheetCategory::SoftwareLog,
        SheetCategory::MaterialLog,
    ];

    /// Canonical uppercase sheet name.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            SheetCategory::TestArticleLog => "TEST ARTICLE LOG & TEST RESULTS",
            SheetCategory::EquipmentLog => "EQUIPMENT LOG",
            SheetCategory::SoftwareLog => "SOFTWARE LOG",
            SheetCategory::MaterialLog => "MATERIAL LOG",
            SheetCategory::Deviations => "DEVIATIONS",
            SheetCategory::ProtocolDeviations => "PROTOCOL DEVIATIONS",
            SheetCategory::DeviationLog => "DEVIATION LOG",
            SheetCategory::DefectiveUnits => "DEFECTIVE UNITS",
            SheetCategory::DefectiveUnitInvestigations => "DEFECTIVE UNIT INVESTIGATIONS",
            SheetCategory::FailedUnits => "FAILED UNITS",
            SheetCategory::TestMethodLosses => "TEST METHOD LOSSES",
        }
    }

    /// Family this category belongs to.
    pub fn family(&self) -> SheetFamily {
        match self {
            SheetCategory::TestArticleLog => SheetFamily::TestArticles,
            SheetCategory::EquipmentLog | SheetCategory::SoftwareLog | SheetCategory::MaterialLog => {
                SheetFamily::Logs
            }
            SheetCategory::Deviations
            | SheetCategory::ProtocolDeviations
            | SheetCategory::DeviationLog => SheetFamily::Deviations,
            SheetCategory::DefectiveUnits
            | SheetCategory::DefectiveUnitInvestigations
            | SheetCategory::FailedUnits => SheetFamily::DefectiveUnits,
            SheetCategory::TestMethodLosses => SheetFamily::TestMethodLosses,
        }
    }
}

/// Uploaded file a worksheet came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Name as uploaded
    pub filename: String,
    /// Staged location on disk
    pub path: PathBuf,
}

impl SourceFile {
    /// Create a source reference.
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            path: path.into(),
        }
    }
}

/// Cell text of one worksheet; the first row holds the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSheet {
    /// Sheet name as found in the workbook
    pub name: String,
    /// Rows of trimmed cell text
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    /// Create a sheet from rows.
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Number of rows including the header row.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Sampling statistics for test-article results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleStatistics {
    /// Test articles recorded (unique keys)
    pub initial_sample_size: usize,
    /// Result cells classified as test method loss
    pub test_method_losses: usize,
    /// `initial_sample_size - test_method_losses`, clamped at zero
    pub actual_sample_size: usize,
    /// Result cells equal to FAIL
    pub defective_units: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Non-empty result cells
    pub total_tests_performed: usize,
    /// Set when losses exceeded the initial sample size
    pub clamped: bool,
}

impl SampleStatistics {
    /// Derive statistics from raw counts.
    pub fn derive(
        initial_sample_size: usize,
        test_method_losses: usize,
        pass_count: usize,
        fail_count: usize,
        total_tests_performed: usize,
    ) -> Self {
        let clamped = test_method_losses > initial_sample_size;
        Self {
            initial_sample_size,
            test_method_losses,
            actual_sample_size: initial_sample_size.saturating_sub(test_method_losses),
            defective_units: fail_count,
            pass_count,
            fail_count,
            total_tests_performed,
            clamped,
        }
    }
}

/// One normalized worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetExtraction {
    /// Canonical category
    pub category: SheetCategory,
    /// Sheet name as found in the workbook
    pub source_sheet: String,
    /// Originating upload
    pub source: SourceFile,
    /// Column headers in order
    pub columns: Vec<String>,
    /// Records kept
    pub records: Vec<Record>,
    /// Natural keys parallel to `records` for keyed sheets
    pub keys: Vec<String>,
    /// Primary key column for keyed sheets
    pub key_column: Option<String>,
    /// Columns holding test results
    pub result_columns: Vec<String>,
    /// Derived statistics for test-article sheets
    pub statistics: Option<SampleStatistics>,
}

impl WorksheetExtraction {
    /// Create an unkeyed extraction.
    pub fn new(
        category: SheetCategory,
        source_sheet: impl Into<String>,
        source: SourceFile,
        columns: Vec<String>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            category,
            source_sheet: source_sheet.into(),
            source,
            columns,
            records,
            keys: Vec::new(),
            key_column: None,
            result_columns: Vec::new(),
            statistics: None,
        }
    }

    /// Canonical sheet name.
    pub fn sheet_name(&self) -> &'static str {
        self.category.canonical_name()
    }

    /// Number of records kept.
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Check if no record was kept.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Key/record pairs for keyed sheets.
    pub fn keyed(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.keys.iter().map(String::as_str).zip(self.records.iter())
    }
}

/// Outcome of processing all uploaded workbooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingSummary {
    pub files_processed: usize,
    /// Canonical names of sheets found
    pub sheets_found: Vec<String>,
    /// One message per workbook that could not be processed
    pub errors: Vec<String>,
}

/// A worksheet selected for DUT configuration, with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutSheet {
    pub source: SourceFile,
    pub sheet: RawSheet,
}

/// Everything extracted from the uploaded spreadsheets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcelData {
    pub test_articles: Option<WorksheetExtraction>,
    pub logs: Vec<WorksheetExtraction>,
    pub deviations: Vec<WorksheetExtraction>,
    pub defective_units: Vec<WorksheetExtraction>,
    pub test_method_losses: Vec<WorksheetExtraction>,
    /// Raw sheets used for the device configuration section
    pub dut_sheets: Vec<DutSheet>,
    pub summary: ParsingSummary,
}

impl ExcelData {
    /// Create an empty data set.
    pub fn new() -> Self {
        Self::default()
    }

    /// File an extraction under its family.
    ///
    /// A later sheet with the same canonical name replaces the earlier one.
    pub fn insert(&mut self, extraction: WorksheetExtraction) {
        let name = extraction.sheet_name().to_string();
        if !self.summary.sheets_found.contains(&name) {
            self.summary.sheets_found.push(name);
        }
        let bucket = match extraction.category.family() {
            SheetFamily::TestArticles => {
                self.test_articles = Some(extraction);
                return;
            }
            SheetFamily::Logs => &mut self.logs,
            SheetFamily::Deviations => &mut self.deviations,
            SheetFamily::DefectiveUnits => &mut self.defective_units,
            SheetFamily::TestMethodLosses => &mut self.test_method_losses,
        };
        match bucket
            .iter_mut()
            .find(|e| e.category == extraction.category)
        {
            Some(slot) => *slot = extraction,
            None => bucket.push(extraction),
        }
    }

    /// Extraction for one log category.
    pub fn log(&self, category: SheetCategory) -> Option<&WorksheetExtraction> {
        self.logs.iter().find(|e| e.category == category)
    }

    /// Test-article statistics, zeroed when no sheet was found.
    pub fn statistics(&self) -> SampleStatistics {
        self.test_articles
            .as_ref()
            .and_then(|t| t.statistics)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(category: SheetCategory, rows: usize) -> WorksheetExtraction {
        let columns = vec!["Item".to_string()];
        let records = (0..rows)
            .map(|i| Record::from_row(&columns, &[format!("item {}", i)]))
            .collect();
        WorksheetExtraction::new(
            category,
            category.canonical_name(),
            SourceFile::new("logs.xlsx", "/tmp/logs.xlsx"),
            columns,
            records,
        )
    }

    #[test]
    fn test_statistics_clamp_negative_sample() {
        let stats = SampleStatistics::derive(2, 3, 0, 0, 3);
        assert_eq!(stats.actual_sample_size, 0);
        assert!(stats.clamped);

        let stats = SampleStatistics::derive(50, 2, 47, 1, 50);
        assert_eq!(stats.actual_sample_size, 48);
        assert_eq!(stats.defective_units, 1);
        assert!(!stats.clamped);
    }

    #[test]
    fn test_insert_replaces_same_category() {
        let mut data = ExcelData::new();
        data.insert(extraction(SheetCategory::EquipmentLog, 2));
        data.insert(extraction(SheetCategory::SoftwareLog, 1));
        data.insert(extraction(SheetCategory::EquipmentLog, 6));

        assert_eq!(data.logs.len(), 2);
        assert_eq!(data.log(SheetCategory::EquipmentLog).unwrap().row_count(), 6);
        assert_eq!(data.summary.sheets_found, vec!["EQUIPMENT LOG", "SOFTWARE LOG"]);
    }

    #[test]
    fn test_category_families() {
        assert_eq!(SheetCategory::FailedUnits.family(), SheetFamily::DefectiveUnits);
        assert_eq!(SheetCategory::DeviationLog.family(), SheetFamily::Deviations);
        assert_eq!(SheetCategory::MaterialLog.family(), SheetFamily::Logs);
    }
}
