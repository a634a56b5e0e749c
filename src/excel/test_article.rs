//! Test-article log: keyed records, result columns and sample statistics.

use super::sheet::{find_column, sheet_headers};
use super::SheetExtractor;
use crate::model::{
    RawSheet, Record, SampleStatistics, SheetCategory, SheetFamily, SourceFile,
    WorksheetExtraction,
};
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;

/// Sentence used when no test-article sheet was found.
pub const NO_TEST_ARTICLE_DATA: &str = "No test article data found.";

/// Outcome of one test-result cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Pass,
    Fail,
    TestMethodLoss,
    Other,
}

/// Classify a test-result cell.
pub fn classify_result(value: &str) -> ResultClass {
    let upper = value.trim().to_uppercase();
    if upper.contains("TML") || upper.contains("TEST METHOD LOSS") {
        ResultClass::TestMethodLoss
    } else if upper == "FAIL" {
        ResultClass::Fail
    } else if upper == "PASS" {
        ResultClass::Pass
    } else {
        ResultClass::Other
    }
}

/// Extracts the test-article log keyed by DUT serial number.
pub struct TestArticleExtractor {
    result_column: Regex,
}

impl TestArticleExtractor {
    pub fn new() -> Self {
        Self {
            result_column: Regex::new(r"(?i)^test result").unwrap(),
        }
    }

    /// Locate the primary key column.
    ///
    /// `dut serial` headers win over plain `serial number` headers.
    pub fn key_column(headers: &[String]) -> Option<usize> {
        find_column(headers, |h| h.contains("dut serial number") || h.contains("dut serial"))
            .or_else(|| find_column(headers, |h| h.contains("serial number")))
    }

    fn statistics(records: &[Record], result_columns: &[String]) -> SampleStatistics {
        let (mut pass, mut fail, mut tml, mut total) = (0, 0, 0, 0);
        for record in records {
            for column in result_columns {
                let value = record.value(column);
                if value.trim().is_empty() {
                    continue;
                }
                total += 1;
                match classify_result(value) {
                    ResultClass::Pass => pass += 1,
                    ResultClass::Fail => fail += 1,
                    ResultClass::TestMethodLoss => tml += 1,
                    ResultClass::Other => {}
                }
            }
        }
        let stats = SampleStatistics::derive(records.len(), tml, pass, fail, total);
        if stats.clamped {
            warn!(
                "Test method losses ({}) exceed recorded units ({}); actual sample size clamped to 0",
                tml,
                records.len()
            );
        }
        stats
    }
}

impl Default for TestArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetExtractor for TestArticleExtractor {
    fn family(&self) -> SheetFamily {
        SheetFamily::TestArticles
    }

    fn name(&self) -> &str {
        "test-articles"
    }

    fn extract(
        &self,
        sheet: &RawSheet,
        category: SheetCategory,
        source: &SourceFile,
    ) -> Option<WorksheetExtraction> {
        if sheet.row_count() < 2 {
            debug!("Test article sheet '{}' has no data rows", sheet.name);
            return None;
        }
        let headers = sheet_headers(sheet);
        let result_columns: Vec<String> = headers
            .iter()
            .filter(|h| self.result_column.is_match(h))
            .cloned()
            .collect();

        let mut extraction = WorksheetExtraction::new(
            category,
            sheet.name.clone(),
            source.clone(),
            headers.clone(),
            Vec::new(),
        );
        extraction.result_columns = result_columns;

        let Some(key_index) = Self::key_column(&headers) else {
            warn!(
                "No serial number column in '{}' ({}); test article data left empty",
                sheet.name, source.filename
            );
            extraction.statistics = Some(SampleStatistics::default());
            return Some(extraction);
        };
        extraction.key_column = Some(headers[key_index].clone());

        let mut slots: HashMap<String, usize> = HashMap::new();
        for row in sheet.rows.iter().skip(1) {
            let record = Record::from_row(&headers, row);
            let key = row.get(key_index).map(|k| k.trim()).unwrap_or("");
            if key.is_empty() || !record.has_data() {
                continue;
            }
            match slots.get(key) {
                Some(&slot) => {
                    warn!(
                        "Duplicate serial number '{}' in '{}'; later row replaces earlier",
                        key, sheet.name
                    );
                    extraction.records[slot] = record;
                }
                None => {
                    slots.insert(key.to_string(), extraction.records.len());
                    extraction.keys.push(key.to_string());
                    extraction.records.push(record);
                }
            }
        }

        extraction.statistics = Some(Self::statistics(
            &extraction.records,
            &extraction.result_columns,
        ));
        debug!(
            "Extracted {} test articles from '{}'",
            extraction.records.len(),
            sheet.name
        );
        Some(extraction)
    }
}

/// Render test-article data for generation prompts.
pub fn format_test_articles(extraction: Option<&WorksheetExtraction>, preview: usize) -> String {
    let Some(extraction) = extraction.filter(|e| !e.is_empty()) else {
        return NO_TEST_ARTICLE_DATA.to_string();
    };
    let stats = extraction.statistics.unwrap_or_default();
    let mut lines = vec![
        format!("=== {} ===", extraction.sheet_name()),
        format!(
            "Primary Key: {}",
            extraction.key_column.as_deref().unwrap_or("None")
        ),
        format!("Total DUT Units: {}", extraction.row_count()),
        format!("Columns: {}", extraction.columns.join(", ")),
        format!("Test Result Columns: {}", extraction.result_columns.join(", ")),
        String::new(),
        "Test Result Analysis:".to_string(),
        format!("- Initial Sample Size: {}", stats.initial_sample_size),
        format!("- Test Method Losses: {}", stats.test_method_losses),
        format!("- Actual Sample Size: {}", stats.actual_sample_size),
        format!("- Defective Units: {}", stats.defective_units),
        format!("- Pass Count: {}", stats.pass_count),
        format!("- Fail Count: {}", stats.fail_count),
        format!("- Total Tests Performed: {}", stats.total_tests_performed),
        String::new(),
        "Sample Records:".to_string(),
    ];
    for (i, (key, record)) in extraction.keyed().take(preview).enumerate() {
        lines.push(format!("DUT {} ({}): {}", i + 1, key, record));
    }
    if extraction.row_count() > preview {
        lines.push(format!(
            "... and {} more DUT units",
            extraction.row_count() - preview
        ));
    }
    lines.join("\n")
}
