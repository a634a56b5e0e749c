//! Record-style worksheets: equipment/software/material logs, deviations,
//! defective units and test method losses.

use super::sheet::{sheet_headers, sheet_to_records};
use super::SheetExtractor;
use crate::model::{
    RawSheet, Record, SheetCategory, SheetFamily, SourceFile, WorksheetExtraction,
};
use log::debug;

pub const NO_DEVIATIONS_DATA: &str = "No deviations data found.";
pub const NO_DEFECTIVE_UNITS_DATA: &str = "No defective units data found.";
pub const NO_LOG_DATA: &str = "No equipment, software, or material log data found.";
pub const NO_TML_DATA: &str = "No test method loss data found.";

/// Column identifying the kind of protocol note on the TML sheet.
pub const NOTE_TYPE_COLUMN: &str = "PROTOCOL NOTE TYPE";

/// Fields listed per investigation in TML prompts.
pub const TML_FIELDS: [&str; 6] = [
    "#",
    "PROTOCOL NOTE TYPE",
    "TEST UNIT SN or ID",
    "PROTOCOL STEP / SECTION",
    "REPLACEMENT(S)",
    "OBSERVATIONS",
];

/// Generic header-row extractor for one record-style family.
pub struct RecordExtractor {
    family: SheetFamily,
    name: &'static str,
}

impl RecordExtractor {
    /// Equipment, software and material logs.
    pub fn logs() -> Self {
        Self {
            family: SheetFamily::Logs,
            name: "logs",
        }
    }

    /// Deviation sheets.
    pub fn deviations() -> Self {
        Self {
            family: SheetFamily::Deviations,
            name: "deviations",
        }
    }

    /// Defective and failed unit sheets.
    pub fn defective_units() -> Self {
        Self {
            family: SheetFamily::DefectiveUnits,
            name: "defective-units",
        }
    }
}

impl SheetExtractor for RecordExtractor {
    fn family(&self) -> SheetFamily {
        self.family
    }

    fn name(&self) -> &str {
        self.name
    }

    fn extract(
        &self,
        sheet: &RawSheet,
        category: SheetCategory,
        source: &SourceFile,
    ) -> Option<WorksheetExtraction> {
        let (columns, records) = sheet_to_records(sheet);
        debug!("Extracted {} rows from '{}'", records.len(), sheet.name);
        Some(WorksheetExtraction::new(
            category,
            sheet.name.clone(),
            source.clone(),
            columns,
            records,
        ))
    }
}

/// Test method loss sheet: keeps only rows noted as test method losses.
pub struct TestMethodLossExtractor;

impl SheetExtractor for TestMethodLossExtractor {
    fn family(&self) -> SheetFamily {
        SheetFamily::TestMethodLosses
    }

    fn name(&self) -> &str {
        "test-method-losses"
    }

    fn extract(
        &self,
        sheet: &RawSheet,
        category: SheetCategory,
        source: &SourceFile,
    ) -> Option<WorksheetExtraction> {
        let columns = sheet_headers(sheet);
        let note_column = columns
            .iter()
            .find(|c| c.trim().eq_ignore_ascii_case(NOTE_TYPE_COLUMN))
            .cloned();
        let records: Vec<Record> = sheet
            .rows
            .iter()
            .skip(1)
            .map(|row| Record::from_row(&columns, row))
            .filter(|record| {
                record.has_data()
                    && note_column.as_deref().is_some_and(|c| {
                        record.value(c).to_lowercase().contains("test method loss")
                    })
            })
            .collect();
        debug!(
            "Kept {} test method loss rows from '{}'",
            records.len(),
            sheet.name
        );
        Some(WorksheetExtraction::new(
            category,
            sheet.name.clone(),
            source.clone(),
            columns,
            records,
        ))
    }
}

/// Singular/plural nouns used when listing a family's records.
fn family_nouns(family: SheetFamily) -> (&'static str, &'static str) {
    match family {
        SheetFamily::Deviations => ("Deviation", "deviations"),
        SheetFamily::DefectiveUnits => ("Defective Unit", "defective units"),
        SheetFamily::TestMethodLosses => ("Test Method Loss", "test method losses"),
        SheetFamily::Logs | SheetFamily::TestArticles => ("Item", "items"),
    }
}

/// Render record-style sheets for prompts.
///
/// `limit` caps the records listed per sheet; `None` lists them all.
pub fn format_records(extractions: &[WorksheetExtraction], limit: Option<usize>) -> String {
    let populated: Vec<&WorksheetExtraction> =
        extractions.iter().filter(|e| !e.is_empty()).collect();
    let Some(first) = populated.first() else {
        return match extractions.first().map(|e| e.category.family()) {
            Some(SheetFamily::Deviations) => NO_DEVIATIONS_DATA,
            Some(SheetFamily::DefectiveUnits) => NO_DEFECTIVE_UNITS_DATA,
            Some(SheetFamily::TestMethodLosses) => NO_TML_DATA,
            _ => NO_LOG_DATA,
        }
        .to_string();
    };
    let (singular, plural) = family_nouns(first.category.family());

    let mut lines = Vec::new();
    for extraction in populated {
        lines.push(format!("\n=== {} ===", extraction.sheet_name()));
        lines.push(format!("Found {} {}", extraction.row_count(), plural));
        lines.push(format!("Columns: {}", extraction.columns.join(", ")));
        let shown = limit.unwrap_or(usize::MAX);
        for (i, record) in extraction.records.iter().take(shown).enumerate() {
            lines.push(format!("  {} {}: {}", singular, i + 1, record));
        }
        if extraction.row_count() > shown {
            lines.push(format!(
                "  ... and {} more {}",
                extraction.row_count() - shown,
                plural
            ));
        }
    }
    lines.join("\n")
}

/// Render test method loss investigations for prompts.
pub fn format_test_method_losses(extractions: &[WorksheetExtraction]) -> Option<String> {
    let records: Vec<&Record> = extractions.iter().flat_map(|e| e.records.iter()).collect();
    if records.is_empty() {
        return None;
    }
    let mut out = format!("TEST METHOD LOSSES Data:\n{}\n", "=".repeat(50));
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("\nInvestigation #{}:\n", i + 1));
        for field in TML_FIELDS {
            out.push_str(&format!("- {}: {}\n", field, record.value(field)));
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, data: &[&[&str]]) -> RawSheet {
        RawSheet::new(
            name,
            data.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn source() -> SourceFile {
        SourceFile::new("logs.xlsx", "/tmp/logs.xlsx")
    }

    #[test]
    fn test_tml_rows_filtered_by_note_type() {
        let sheet = raw(
            "TEST METHOD LOSSES",
            &[
                &["#", "PROTOCOL NOTE TYPE", "TEST UNIT SN or ID", "OBSERVATIONS"],
                &["1", "Test Method Loss", "10000001", "Fixture slipped"],
                &["2", "Deviation", "10000002", "Late start"],
                &["", "", "", ""],
            ],
        );
        let extraction = TestMethodLossExtractor
            .extract(&sheet, SheetCategory::TestMethodLosses, &source())
            .unwrap();
        assert_eq!(extraction.row_count(), 1);

        let text = format_test_method_losses(&[extraction]).unwrap();
        assert!(text.starts_with("TEST METHOD LOSSES Data:\n=================================================="));
        assert!(text.contains("Investigation #1:\n- #: 1\n- PROTOCOL NOTE TYPE: Test Method Loss"));
        assert!(text.contains("- REPLACEMENT(S): \n"));
    }

    #[test]
    fn test_format_records_empty_messages() {
        let empty = RecordExtractor::deviations()
            .extract(&raw("DEVIATIONS", &[&["Deviation", "Impact"]]), SheetCategory::Deviations, &source())
            .unwrap();
        assert_eq!(format_records(&[empty], Some(3)), NO_DEVIATIONS_DATA);
        assert_eq!(format_records(&[], Some(3)), NO_LOG_DATA);
    }

    #[test]
    fn test_format_records_preview() {
        let extraction = RecordExtractor::deviations()
            .extract(
                &raw(
                    "Protocol Deviations",
                    &[&["ID", "Description"], &["1", "a"], &["2", "b"], &["3", "c"], &["4", "d"]],
                ),
                SheetCategory::ProtocolDeviations,
                &source(),
            )
            .unwrap();
        let text = format_records(&[extraction.clone()], Some(3));
        assert!(text.contains("=== PROTOCOL DEVIATIONS ==="));
        assert!(text.contains("Found 4 deviations"));
        assert!(text.contains("  Deviation 3: {ID: 3, Description: c}"));
        assert!(text.ends_with("  ... and 1 more deviations"));

        let all = format_records(&[extraction], None);
        assert!(all.contains("  Deviation 4: {ID: 4, Description: d}"));
    }
}
