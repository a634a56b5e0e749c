//! Deviation, defective unit and test method loss narratives.
//!
//! All three share one shape: a fixed sentence when the source sheets are
//! empty, otherwise generated investigations whose headers are renumbered
//! `PREFIX #1`, `PREFIX #2`, ... in order of appearance.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt};
use crate::excel::{format_records, format_test_method_losses};
use crate::model::{Record, TaskKind, TaskResult, WorksheetExtraction};
use regex::Regex;

pub const NO_DEVIATIONS: &str = "No deviations.";
pub const NO_DEFECTIVE_UNITS: &str = "No defective unit in the execution of this test.";
pub const NO_TEST_METHOD_LOSSES: &str = "No test method loss occurred in the execution of this test.";

/// Column headers that name an investigation in fallback listings.
const TITLE_COLUMNS: [&str; 5] = ["title", "description", "observation", "summary", "issue"];

/// How one narrative family is validated and renumbered.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeStyle {
    /// Header prefix, e.g. `DEVIATION`
    pub prefix: &'static str,
    /// Title used when a header carries none
    pub default_title: &'static str,
    /// Titles shorter than this are replaced by the default
    pub min_title_len: usize,
    /// Header patterns, matched case-insensitively at line start
    pub header_patterns: &'static [&'static str],
    /// Phrase meaning the narrative is empty
    pub none_phrase: &'static str,
    /// Sentence used for an empty narrative
    pub none_sentence: &'static str,
    /// Metadata key for the item count
    pub count_key: &'static str,
}

pub const DEVIATION_STYLE: NarrativeStyle = NarrativeStyle {
    prefix: "DEVIATION",
    default_title: "Protocol deviation",
    min_title_len: 5,
    header_patterns: &[r"DEVIATION\s*#?\d+", r"DEV\s*#?\d+", r"\d+\.(?:\s|$)"],
    none_phrase: "no deviations",
    none_sentence: NO_DEVIATIONS,
    count_key: "deviation_count",
};

pub const DEFECTIVE_UNIT_STYLE: NarrativeStyle = NarrativeStyle {
    prefix: "DEFECTIVE UNIT INVESTIGATION",
    default_title: "Defective unit",
    min_title_len: 1,
    header_patterns: &[
        r"DEFECTIVE\s+UNIT\s+INVESTIGATION\s*#?\d*",
        r"INVESTIGATION\s*#?\d+",
        r"DEFECTIVE\s+UNIT\s*#?\d+",
        r"\d+\.(?:\s|$)",
    ],
    none_phrase: "no defective unit",
    none_sentence: NO_DEFECTIVE_UNITS,
    count_key: "investigation_count",
};

pub const TEST_METHOD_LOSS_STYLE: NarrativeStyle = NarrativeStyle {
    prefix: "TEST METHOD LOSS INVESTIGATION",
    default_title: "Test method loss",
    min_title_len: 1,
    header_patterns: &[
        r"TEST\s+METHOD\s+LOSS\s+INVESTIGATION\s*#?\d*",
        r"INVESTIGATION\s*#?\d+",
        r"TML\s*#?\d+",
        r"\d+\.(?:\s|$)",
    ],
    none_phrase: "no test method loss",
    none_sentence: NO_TEST_METHOD_LOSSES,
    count_key: "investigation_count",
};

pub(crate) async fn deviations(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let records = populated_records(&ctx.excel.deviations);
    let data = format_records(&ctx.excel.deviations, None);
    narrative(
        orchestrator,
        TaskKind::ProtocolDeviations,
        &DEVIATION_STYLE,
        &records,
        (!records.is_empty()).then_some(data),
        "Write a numbered account of each protocol deviation below, with its impact on the test.",
    )
    .await
}

pub(crate) async fn defective_units(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let records = populated_records(&ctx.excel.defective_units);
    let data = format_records(&ctx.excel.defective_units, None);
    narrative(
        orchestrator,
        TaskKind::DefectiveUnits,
        &DEFECTIVE_UNIT_STYLE,
        &records,
        (!records.is_empty()).then_some(data),
        "Write an investigation summary for each defective unit below: failure, root cause and disposition.",
    )
    .await
}

pub(crate) async fn test_method_losses(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let records = populated_records(&ctx.excel.test_method_losses);
    narrative(
        orchestrator,
        TaskKind::TestMethodLosses,
        &TEST_METHOD_LOSS_STYLE,
        &records,
        format_test_method_losses(&ctx.excel.test_method_losses),
        "Write an investigation summary for each test method loss below: unit, protocol step, observations and replacement.",
    )
    .await
}

async fn narrative(
    orchestrator: &ContentGenerationOrchestrator,
    task: TaskKind,
    style: &NarrativeStyle,
    records: &[&Record],
    data: Option<String>,
    instruction: &str,
) -> TaskResult {
    let Some(data) = data else {
        return TaskResult::generated(task, style.none_sentence).with_metadata(style.count_key, 0);
    };

    let limit = orchestrator.config().limits.deviations_content;
    let prompt = Prompt::new(instruction)
        .context("RECORDS", truncate_chars(&data, limit))
        .rule(format!("Start each item with {} #<n>: <title>", style.prefix))
        .rule("Plain text, no markdown emphasis")
        .build();

    let result = match orchestrator.ask(task, &prompt).await {
        Ok(output) => TaskResult::generated(task, validate_narrative(&output, style)),
        Err(e) => fallback(task, listing(records, style), &e),
    };
    result.with_metadata(style.count_key, records.len())
}

fn populated_records(extractions: &[WorksheetExtraction]) -> Vec<&Record> {
    extractions
        .iter()
        .flat_map(|e| e.records.iter())
        .filter(|r| r.has_data())
        .collect()
}

/// Normalize generated narrative text.
///
/// A "nothing to report" answer collapses to the fixed sentence. Otherwise
/// emphasis is stripped, headers are renumbered and blank-line runs collapse.
pub fn validate_narrative(output: &str, style: &NarrativeStyle) -> String {
    if output.to_lowercase().contains(style.none_phrase) {
        return style.none_sentence.to_string();
    }
    let text = strip_emphasis(output);
    let text = strip_leading_title(&text, style);
    let text = renumber_headers(&text, style);
    collapse_blank_lines(&text)
}

/// Rewrite headers as `PREFIX #n: title`, numbering from one.
pub fn renumber_headers(text: &str, style: &NarrativeStyle) -> String {
    let header = Regex::new(&format!(
        r"(?i)^(?:{})\s*[:\-]?\s*(.*)$",
        style.header_patterns.join("|")
    ))
    .unwrap();

    let mut number = 0;
    let mut lines = Vec::new();
    for line in text.lines() {
        let bare = line.trim().trim_start_matches('#').trim();
        match header.captures(bare) {
            Some(caps) => {
                number += 1;
                let title = caps.get(1).map_or("", |m| m.as_str()).trim();
                let title = if title.chars().count() < style.min_title_len {
                    style.default_title
                } else {
                    title
                };
                lines.push(format!("{} #{}: {}", style.prefix, number, title));
            }
            None => lines.push(line.trim_end().to_string()),
        }
    }
    lines.join("\n")
}

/// Drop a leading heading that repeats the section title.
fn strip_leading_title(text: &str, style: &NarrativeStyle) -> String {
    let plural = format!("{}S", style.prefix);
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty()).peekable();
    if let Some(first) = lines.peek() {
        let bare = first.trim().trim_start_matches('#').trim();
        if bare.eq_ignore_ascii_case(&plural) {
            lines.next();
        }
    }
    lines.collect::<Vec<_>>().join("\n")
}

fn strip_emphasis(text: &str) -> String {
    let bold = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    let italic = Regex::new(r"\*([^*\n]+)\*").unwrap();
    let text = bold.replace_all(text, "$1");
    italic.replace_all(&text, "$1").replace("**", "")
}

fn collapse_blank_lines(text: &str) -> String {
    let blank_run = Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").unwrap();
    blank_run.replace_all(text.trim(), "\n\n").to_string()
}

/// Deterministic listing of the source records.
fn listing(records: &[&Record], style: &NarrativeStyle) -> String {
    let mut blocks = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let title = record
            .iter()
            .find(|(header, value)| {
                let header = header.to_lowercase();
                !value.trim().is_empty() && TITLE_COLUMNS.iter().any(|c| header.contains(c))
            })
            .map(|(_, value)| value.trim())
            .filter(|t| t.chars().count() >= style.min_title_len)
            .unwrap_or(style.default_title);
        let mut block = format!("{} #{}: {}", style.prefix, i + 1, title);
        for (header, value) in record.iter().filter(|(_, v)| !v.trim().is_empty()) {
            block.push_str(&format!("\n{}: {}", header.trim(), value.trim()));
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}
