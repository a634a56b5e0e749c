//! Attachment threshold policy and spreadsheet copies.

use crate::error::Result;
use crate::model::{
    AttachmentDescriptor, ExcelData, ReportConfig, SheetCategory, SourceFile, TaskKind,
    WorksheetExtraction,
};
use log::info;
use std::fs;
use std::path::Path;

/// Label used for raw-data spreadsheet attachments.
pub const RAW_DATA_LABEL: &str = "Raw Data";

/// Label for log overflow when the raw-data name already holds another workbook.
pub const LOG_DATA_LABEL: &str = "Equipment Raw Data";

/// When a dataset moves out of the report body into an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    /// Unique test articles rendered inline at most
    pub dut_threshold: usize,
    /// Items per log category rendered inline at most
    pub log_threshold: usize,
}

impl AttachmentPolicy {
    pub fn new(dut_threshold: usize, log_threshold: usize) -> Self {
        Self {
            dut_threshold,
            log_threshold,
        }
    }

    /// More than `dut_threshold` unique test articles.
    pub fn dut_overflow(&self, unique_duts: usize) -> bool {
        unique_duts > self.dut_threshold
    }

    /// First log category with more than `log_threshold` items.
    pub fn log_overflow<'a>(&self, data: &'a ExcelData) -> Option<&'a WorksheetExtraction> {
        SheetCategory::LOGS
            .iter()
            .filter_map(|c| data.log(*c))
            .find(|e| e.row_count() > self.log_threshold)
    }

    /// Whether a log category is too large to render inline.
    pub fn log_too_large(&self, rows: usize) -> bool {
        rows > self.log_threshold
    }
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(10, 5)
    }
}

/// `<report-number> rev<revision> Attachment - <label>.xlsx`
pub fn attachment_filename(config: &ReportConfig, label: &str) -> String {
    format!(
        "{} rev{} Attachment - {}.xlsx",
        config.report_number, config.revision, label
    )
}

/// Attachment filename for a raw-data copy of `source`.
///
/// Returns the filename and whether that copy was already written. A different
/// workbook already attached under the raw-data name moves this copy to
/// `alternate_label`.
pub fn raw_data_slot(
    config: &ReportConfig,
    written: &[AttachmentDescriptor],
    source: &SourceFile,
    alternate_label: &str,
) -> (String, bool) {
    let filename = attachment_filename(config, RAW_DATA_LABEL);
    match written.iter().find(|a| a.filename == filename) {
        None => (filename, false),
        Some(existing) if existing.source == source.path => (filename, true),
        Some(_) => (attachment_filename(config, alternate_label), false),
    }
}

/// Copy the originating spreadsheet verbatim into the attachments directory.
pub fn write_attachment(
    source: &SourceFile,
    dir: &Path,
    filename: &str,
    origin: TaskKind,
) -> Result<AttachmentDescriptor> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    fs::copy(&source.path, &path)?;
    let size = fs::metadata(&path)?.len();
    info!("Wrote attachment {} ({} bytes) from {}", filename, size, source.filename);
    Ok(AttachmentDescriptor {
        filename: filename.to_string(),
        path,
        source: source.path.clone(),
        size,
        origin,
    })
}
