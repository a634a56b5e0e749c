//! Equipment, software and material summary.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::Prompt;
use crate::excel::{
    format_records, raw_data_slot, write_attachment, AttachmentPolicy, LOG_DATA_LABEL,
};
use crate::model::{ExcelData, SheetCategory, TaskKind, TaskResult, WorksheetExtraction};
use crate::render::MarkdownTable;
use log::warn;

/// Content used when no log sheet holds any item.
pub const NO_LOG_CONTENT: &str =
    "No equipment, software, or material log data was found in the uploaded files.";

pub const CALIBRATED: &str = "All equipment used in this testing was verified as calibrated at the time of use.";
pub const NOT_CALIBRATED: &str = "Equipment calibration status was not verified at the time of use.";

/// Bullet title, item noun and log name per category.
const CATEGORY_LABELS: [(SheetCategory, &str, &str, &str); 3] = [
    (SheetCategory::EquipmentLog, "Equipment Used", "equipment", "equipment log"),
    (SheetCategory::SoftwareLog, "Software Used", "software", "software log"),
    (SheetCategory::MaterialLog, "Materials Used", "materials", "material log"),
];

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::Equipment;
    let policy = orchestrator.config().attachments;
    let counts = item_counts(&ctx.excel);
    let total: usize = counts.iter().sum();

    if total == 0 {
        return TaskResult::generated(task, NO_LOG_CONTENT)
            .with_metadata("equipment_count", 0)
            .with_metadata("software_count", 0)
            .with_metadata("material_count", 0);
    }

    let mut attachment = None;
    let attachment_name = policy.log_overflow(&ctx.excel).map(|extraction| {
        let (filename, written) = raw_data_slot(
            &ctx.config,
            ctx.attachments(),
            &extraction.source,
            LOG_DATA_LABEL,
        );
        if !written {
            match write_attachment(&extraction.source, ctx.attachments_dir(), &filename, task) {
                Ok(descriptor) => attachment = Some(descriptor),
                Err(e) => warn!("Could not write log attachment {}: {}", filename, e),
            }
        }
        filename
    });

    let calibration = if ctx.config.device.calibration_verified {
        CALIBRATED
    } else {
        NOT_CALIBRATED
    };
    let mut prompt = Prompt::new(
        "Summarize the equipment, software and materials used during testing.",
    )
    .context("CALIBRATION", calibration)
    .context(
        "LOG DATA",
        format_records(&ctx.excel.logs, Some(policy.log_threshold)),
    )
    .rule("Start with the calibration statement")
    .rule("Use one markdown table per category");
    if let Some(filename) = &attachment_name {
        prompt = prompt.rule(format!(
            "Categories with more than {} items are provided in attachment {}",
            policy.log_threshold, filename
        ));
    }

    let result = match orchestrator.ask(task, &prompt.build()).await {
        Ok(content) => {
            let content = match &attachment_name {
                Some(filename) if !content.contains(filename.as_str()) => format!(
                    "{}\n\nDetailed equipment, software, and material information is provided in {}.",
                    content, filename
                ),
                _ => content,
            };
            TaskResult::generated(task, content)
        }
        Err(e) => fallback(
            task,
            organize_logs(&ctx.excel, calibration, &policy, attachment_name.as_deref()),
            &e,
        ),
    };

    let result = result
        .with_metadata("equipment_count", counts[0])
        .with_metadata("software_count", counts[1])
        .with_metadata("material_count", counts[2]);
    match attachment {
        Some(descriptor) => result.with_attachment(descriptor),
        None => result,
    }
}

/// Item counts for the equipment, software and material logs.
pub fn item_counts(data: &ExcelData) -> [usize; 3] {
    SheetCategory::LOGS.map(|c| data.log(c).map_or(0, WorksheetExtraction::row_count))
}

/// Deterministic per-category presentation of the log sheets.
pub fn organize_logs(
    data: &ExcelData,
    calibration: &str,
    policy: &AttachmentPolicy,
    attachment: Option<&str>,
) -> String {
    let mut parts = vec![calibration.to_string()];
    for (category, title, noun, log_name) in CATEGORY_LABELS {
        let mut block = format!("• {}\n", title);
        match data.log(category).filter(|e| !e.is_empty()) {
            None => block.push_str(&format!("No {} were recorded in the {}.", noun, log_name)),
            Some(extraction) if policy.log_too_large(extraction.row_count()) => {
                block.push_str(&format!(
                    "Detailed {} information is provided in the attachment.",
                    noun
                ));
            }
            Some(extraction) => {
                block.push_str(&format!("The {} recorded the following items:\n", log_name));
                block.push_str(&log_table(extraction).to_markdown());
            }
        }
        parts.push(block);
    }
    if let Some(filename) = attachment {
        parts.push(format!(
            "Detailed equipment, software, and material information is provided in {}.",
            filename
        ));
    }
    parts.join("\n\n")
}

fn log_table(extraction: &WorksheetExtraction) -> MarkdownTable {
    let mut table = MarkdownTable::new(extraction.columns.iter().map(String::as_str));
    for record in &extraction.records {
        table = table.with_row(extraction.columns.iter().map(|c| record.value(c)));
    }
    table
}
