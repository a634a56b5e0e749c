//! Device-under-test sheet formatting and unique serial counting.

use crate::model::DutSheet;
use std::collections::HashSet;

/// Text used when no test-article sheet was uploaded.
pub const NO_DUT_DATA: &str = "No test article data found in uploaded files.";

/// Rows containing any of these are header rows, not units.
const HEADER_KEYWORDS: [&str; 4] = ["DUT PART NUMBER", "PART NUMBER", "SERIAL NUMBER", "LOT NUMBER"];

/// Shortest accepted serial number.
const MIN_SERIAL_LEN: usize = 8;

/// Render test-article sheets as pipe-delimited rows.
pub fn format_dut_sheets(sheets: &[DutSheet], max_columns: usize) -> String {
    let mut out = String::new();
    for dut in sheets {
        out.push_str(&format!("\n=== WORKSHEET: {} ===\n", dut.sheet.name));
        for row in &dut.sheet.rows {
            let cells: Vec<&str> = row.iter().take(max_columns).map(String::as_str).collect();
            if cells.iter().any(|c| !c.trim().is_empty()) {
                out.push_str(&cells.join(" | "));
                out.push('\n');
            }
        }
    }
    if out.trim().is_empty() {
        NO_DUT_DATA.to_string()
    } else {
        out
    }
}

/// Count distinct serial numbers in pipe-delimited DUT rows.
///
/// The second column of each non-header row is a candidate; it counts when it
/// is all digits and at least eight long. The result is never below one.
pub fn count_unique_duts(text: &str) -> usize {
    let mut serials: HashSet<&str> = HashSet::new();
    for line in text.lines() {
        if !line.contains('|') || line.starts_with("===") {
            continue;
        }
        let upper = line.to_uppercase();
        if HEADER_KEYWORDS.iter().any(|k| upper.contains(k)) {
            continue;
        }
        let Some(candidate) = line.split('|').nth(1).map(str::trim) else {
            continue;
        };
        if candidate.len() >= MIN_SERIAL_LEN && candidate.chars().all(|c| c.is_ascii_digit()) {
            serials.insert(candidate);
        }
    }
    serials.len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawSheet, SourceFile};

    fn dut_sheet(rows: Vec<Vec<&str>>) -> DutSheet {
        DutSheet {
            source: SourceFile::new("data.xlsx", "/tmp/data.xlsx"),
            sheet: RawSheet::new(
                "TEST ARTICLE LOG & TEST RESULTS",
                rows.into_iter()
                    .map(|r| r.into_iter().map(String::from).collect())
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_format_dut_sheets() {
        let sheet = dut_sheet(vec![
            vec!["DUT Part Number", "DUT Serial Number", "Test Result"],
            vec!["", "", ""],
            vec!["PN-1", "10000001", "PASS"],
        ]);
        let text = format_dut_sheets(&[sheet], 20);
        assert_eq!(
            text,
            "\n=== WORKSHEET: TEST ARTICLE LOG & TEST RESULTS ===\nDUT Part Number | DUT Serial Number | Test Result\nPN-1 | 10000001 | PASS\n"
        );
        assert_eq!(format_dut_sheets(&[], 20), NO_DUT_DATA);
    }

    #[test]
    fn test_format_caps_columns() {
        let sheet = dut_sheet(vec![vec!["a", "b", "c"]]);
        assert!(format_dut_sheets(&[sheet], 2).contains("a | b\n"));
    }

    #[test]
    fn test_count_unique_duts() {
        let text = "\n=== WORKSHEET: LOG ===\n\
                    DUT Part Number | DUT Serial Number | Result\n\
                    PN-1 | 10000001 | PASS\n\
                    PN-1 | 10000002 | PASS\n\
                    PN-1 | 10000001 | FAIL\n\
                    PN-1 | 1234 | PASS\n\
                    PN-1 | 1000000A | PASS\n";
        assert_eq!(count_unique_duts(text), 2);
    }

    #[test]
    fn test_count_is_at_least_one() {
        assert_eq!(count_unique_duts(""), 1);
        assert_eq!(count_unique_duts(NO_DUT_DATA), 1);
    }

    #[test]
    fn test_count_twelve_units() {
        let mut text = String::from("Part | Serial Number\n");
        for i in 0..12 {
            text.push_str(&format!("PN | {}\n", 20000000 + i));
        }
        assert_eq!(count_unique_duts(&text), 12);
    }
}
