//! Workbook reading, sheet-name normalization and generic row extraction.

use crate::error::Result;
use crate::model::{RawSheet, Record, SheetCategory};
use calamine::{open_workbook_auto, Data, Range, Reader};
use log::{debug, warn};
use std::path::Path;

/// Read every worksheet of a workbook as trimmed cell text.
///
/// A sheet that cannot be decoded is skipped; a workbook that cannot be
/// opened is an error.
pub fn read_workbook(path: &Path) -> Result<Vec<RawSheet>> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => sheets.push(range_to_sheet(&name, &range)),
            Err(e) => warn!("Skipping unreadable sheet '{}' in {}: {}", name, path.display(), e),
        }
    }
    debug!("Read {} sheets from {}", sheets.len(), path.display());
    Ok(sheets)
}

/// Convert a calamine range into a [`RawSheet`].
pub fn range_to_sheet(name: &str, range: &Range<Data>) -> RawSheet {
    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    RawSheet::new(name, rows)
}

/// Stringify one cell. Empty cells become empty strings.
pub fn cell_to_string(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    };
    text.trim().to_string()
}

/// Map a worksheet name onto a canonical category.
///
/// Exact canonical names win; otherwise substring heuristics apply.
pub fn normalize_sheet_name(name: &str) -> Option<SheetCategory> {
    let upper = name.trim().to_uppercase();
    if let Some(category) = SheetCategory::ALL
        .into_iter()
        .find(|c| c.canonical_name() == upper)
    {
        return Some(category);
    }

    let has = |needle: &str| upper.contains(needle);

    if has("TEST ARTICLE LOG")
        || has("TEST RESULTS")
        || (has("TEST ARTICLE") && has("LOG"))
    {
        return Some(SheetCategory::TestArticleLog);
    }
    if has("TEST METHOD LOSS") {
        return Some(SheetCategory::TestMethodLosses);
    }
    if has("DEVIATION") {
        return Some(if has("PROTOCOL") {
            SheetCategory::ProtocolDeviations
        } else if has("LOG") {
            SheetCategory::DeviationLog
        } else {
            SheetCategory::Deviations
        });
    }
    if has("DEFECTIVE") && has("UNIT") {
        return Some(if has("INVESTIGATION") {
            SheetCategory::DefectiveUnitInvestigations
        } else {
            SheetCategory::DefectiveUnits
        });
    }
    if has("FAILED") && has("UNIT") {
        return Some(SheetCategory::FailedUnits);
    }
    if has("LOG") {
        for (word, category) in [
            ("EQUIPMENT", SheetCategory::EquipmentLog),
            ("SOFTWARE", SheetCategory::SoftwareLog),
            ("MATERIAL", SheetCategory::MaterialLog),
        ] {
            if has(word) {
                return Some(category);
            }
        }
    }
    None
}

/// Header row with blanks synthesized as `Column<N>` (1-based).
pub fn sheet_headers(sheet: &RawSheet) -> Vec<String> {
    sheet
        .rows
        .first()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, h)| {
                    if h.is_empty() {
                        format!("Column{}", i + 1)
                    } else {
                        h.clone()
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Generic sheet-to-records conversion.
///
/// Rows after the header become records when at least one cell holds text.
pub fn sheet_to_records(sheet: &RawSheet) -> (Vec<String>, Vec<Record>) {
    let headers = sheet_headers(sheet);
    let records = sheet
        .rows
        .iter()
        .skip(1)
        .map(|row| Record::from_row(&headers, row))
        .filter(Record::has_data)
        .collect();
    (headers, records)
}

/// Index of the first header matching `pred`.
pub(crate) fn find_column<F>(headers: &[String], pred: F) -> Option<usize>
where
    F: Fn(&str) -> bool,
{
    headers.iter().position(|h| pred(&h.to_lowercase()))
}
