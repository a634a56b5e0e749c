//! Device under test configuration.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::Prompt;
use crate::excel::{
    attachment_filename, count_unique_duts, format_dut_sheets, write_attachment, RAW_DATA_LABEL,
};
use crate::model::{DeviceConfig, TaskKind, TaskResult};
use crate::render::MarkdownTable;
use log::warn;

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::DeviceConfiguration;
    let config = orchestrator.config();
    let dut_text = format_dut_sheets(&ctx.excel.dut_sheets, config.dut_max_columns);
    let unit_count = count_unique_duts(&dut_text);
    let overflow = config.attachments.dut_overflow(unit_count);

    let mut attachment = None;
    let mut attachment_name = None;
    if overflow {
        let filename = attachment_filename(&ctx.config, RAW_DATA_LABEL);
        if let Some(dut) = ctx.excel.dut_sheets.first() {
            match write_attachment(&dut.source, ctx.attachments_dir(), &filename, task) {
                Ok(descriptor) => attachment = Some(descriptor),
                Err(e) => warn!("Could not write DUT attachment {}: {}", filename, e),
            }
        }
        attachment_name = Some(filename);
    }

    let mut prompt = Prompt::new("Describe the configuration of the units tested.")
        .context("DEVICE HANDLING", handling_statement(&ctx.config.device))
        .context("TEST ARTICLE DATA", dut_text.clone());
    prompt = match &attachment_name {
        Some(filename) => prompt.rule(format!(
            "There are {} units; do not list them, refer to attachment {}",
            unit_count, filename
        )),
        None => prompt.rule("Present the units as a table: | Part Number | Serial Number | Lot Number |"),
    };

    let result = match orchestrator.ask(task, &prompt.build()).await {
        Ok(content) => {
            let content = match &attachment_name {
                Some(filename) if !content.contains(filename.as_str()) => format!(
                    "{}\n\nDetailed test unit information is provided in {}.",
                    content, filename
                ),
                _ => content,
            };
            TaskResult::generated(task, content)
        }
        Err(e) => {
            let content = match &attachment_name {
                Some(filename) => summary_fallback(&ctx.config.device, unit_count, filename),
                None => table_fallback(&ctx.config.device),
            };
            fallback(task, content, &e)
        }
    };

    let result = result
        .with_metadata("test_article_count", unit_count)
        .with_metadata(
            "presentation",
            if overflow { "summary" } else { "detailed_table" },
        );
    match attachment {
        Some(descriptor) => result.with_attachment(descriptor),
        None => result,
    }
}

/// Sterilization and modification statement.
pub fn handling_statement(device: &DeviceConfig) -> String {
    let sterilized = if device.units_sterilized {
        "sterilized"
    } else {
        "not sterilized"
    };
    let modification = if device.units_modified {
        let description = device.modification_description.trim();
        if description.is_empty() {
            "Modifications were made.".to_string()
        } else {
            format!("Modifications were made: {}", description)
        }
    } else {
        "No modifications were made outside normal manufacturing processes.".to_string()
    };
    format!("The test units were {}. {}", sterilized, modification)
}

fn table_fallback(device: &DeviceConfig) -> String {
    let table = MarkdownTable::new(["Part Number", "Serial Number", "Lot Number"])
        .with_row(["TBD", "TBD", "TBD"]);
    format!("{}\n\n{}", handling_statement(device), table.to_markdown())
}

fn summary_fallback(device: &DeviceConfig, unit_count: usize, filename: &str) -> String {
    format!(
        "{}\n\nA total of {} test units were used in this testing, more than can be listed \
         in this report. Part, serial and lot numbers are provided in {}.",
        handling_statement(device),
        unit_count,
        filename
    )
}
