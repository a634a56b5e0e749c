//! Acronyms and definitions, scanned from the finished report text.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt, TRUNCATION_MARKER};
use crate::error::TaskError;
use crate::model::{TaskKind, TaskResult};
use crate::render::{parse_markdown_table, MarkdownTable};
use log::warn;
use regex::Regex;

const ACRONYMS_MARKER: &str = "ACRONYMS_CONTENT:";
const DEFINITIONS_MARKER: &str = "DEFINITIONS_CONTENT:";

/// Report sections scanned, in report order.
const REPORT_ORDER: [TaskKind; 10] = [
    TaskKind::ScopePurpose,
    TaskKind::References,
    TaskKind::ProcedureSummary,
    TaskKind::DeviceConfiguration,
    TaskKind::Equipment,
    TaskKind::TestResultSummary,
    TaskKind::ProtocolDeviations,
    TaskKind::DefectiveUnits,
    TaskKind::TestMethodLosses,
    TaskKind::Conclusion,
];

/// Words that mark a line as worth scanning for terms.
const TECHNICAL_KEYWORDS: [&str; 13] = [
    "test",
    "protocol",
    "device",
    "measurement",
    "configuration",
    "equipment",
    "procedure",
    "specification",
    "requirement",
    "analysis",
    "validation",
    "verification",
    "compliance",
];

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::AcronymsDefinitions;
    let limits = &orchestrator.config().limits;
    let report = complete_report(ctx);
    let scan = if report.chars().count() <= limits.complete_report {
        report
    } else {
        bound_report(&report, limits.acronym_prefilter)
    };

    let prompt = Prompt::new(
        "List the acronyms and the technical terms used in the report below.",
    )
    .context("REPORT", scan)
    .rule(format!(
        "Start the acronyms with {} and the definitions with {}",
        ACRONYMS_MARKER, DEFINITIONS_MARKER
    ))
    .rule("Use markdown tables: | Acronym | Definition | and | Term | Definition |")
    .build();

    let outcome = orchestrator
        .ask(task, &prompt)
        .await
        .and_then(|output| split_acronyms(&output));

    let (result, acronyms, definitions) = match outcome {
        Ok((acronyms, definitions)) => (
            TaskResult::generated(task, format!("{}\n\n{}", acronyms, definitions)),
            acronyms,
            definitions,
        ),
        Err(e) => {
            let (acronyms, definitions) = fallback_tables();
            (
                fallback(task, format!("{}\n\n{}", acronyms, definitions), &e),
                acronyms,
                definitions,
            )
        }
    };
    result
        .with_metadata("acronyms_count", entry_count(&acronyms))
        .with_metadata("definitions_count", entry_count(&definitions))
        .with_metadata("acronyms_content", acronyms)
        .with_metadata("definitions_content", definitions)
}

/// Every completed section joined in report order.
fn complete_report(ctx: &RequestContext) -> String {
    REPORT_ORDER
        .iter()
        .filter_map(|task| ctx.content(*task))
        .filter(|c| !c.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Keep lines likely to hold acronyms or technical terms.
pub fn prefilter_lines(text: &str) -> String {
    let acronym = Regex::new(r"\b[A-Z]{2,}\b").unwrap();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            acronym.is_match(line)
                || line.starts_with('#')
                || (line.chars().any(char::is_alphabetic) && *line == line.to_uppercase())
                || TECHNICAL_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefilter, then cut to `limit` characters with a marker.
pub fn bound_report(report: &str, limit: usize) -> String {
    let filtered = prefilter_lines(report);
    if filtered.chars().count() <= limit {
        return filtered;
    }
    format!("{}{}", truncate_chars(&filtered, limit), TRUNCATION_MARKER)
}

/// Split output into acronym and definition content.
///
/// Marker lines are preferred; standalone `Acronyms` / `Definitions`
/// headings are accepted too.
pub fn split_acronyms(output: &str) -> Result<(String, String), TaskError> {
    if let Some((_, rest)) = output.split_once(ACRONYMS_MARKER) {
        if let Some((acronyms, definitions)) = rest.split_once(DEFINITIONS_MARKER) {
            return non_empty(acronyms, definitions);
        }
    }

    let heading = |line: &str, name: &str| {
        line.trim()
            .trim_start_matches('#')
            .trim()
            .trim_matches('*')
            .trim_end_matches(':')
            .trim()
            .eq_ignore_ascii_case(name)
    };
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.iter().position(|l| heading(l, "acronyms"));
    let split = lines.iter().position(|l| heading(l, "definitions"));
    match (start, split) {
        (Some(a), Some(d)) if a < d => non_empty(&lines[a + 1..d].join("\n"), &lines[d + 1..].join("\n")),
        _ => Err(TaskError::Malformed(
            "no acronym and definition sections".to_string(),
        )),
    }
}

/// Both halves empty is an error; a single empty half takes its fallback table.
fn non_empty(acronyms: &str, definitions: &str) -> Result<(String, String), TaskError> {
    let (acronyms, definitions) = (acronyms.trim(), definitions.trim());
    if acronyms.is_empty() && definitions.is_empty() {
        return Err(TaskError::EmptyResponse);
    }
    let (fallback_acronyms, fallback_definitions) = fallback_tables();
    let acronyms = if acronyms.is_empty() {
        warn!("Generated acronyms were empty, using the standard table");
        fallback_acronyms
    } else {
        acronyms.to_string()
    };
    let definitions = if definitions.is_empty() {
        warn!("Generated definitions were empty, using the standard table");
        fallback_definitions
    } else {
        definitions.to_string()
    };
    Ok((acronyms, definitions))
}

/// Table rows, or non-empty lines when there is no table.
fn entry_count(content: &str) -> usize {
    match parse_markdown_table(content) {
        Some(table) => table.row_count(),
        None => content.lines().filter(|l| !l.trim().is_empty()).count(),
    }
}

fn fallback_tables() -> (String, String) {
    let acronyms = MarkdownTable::new(["Acronym", "Definition"])
        .with_row(["DVT", "Design Verification Testing"])
        .with_row(["DUT", "Device Under Test"])
        .with_row(["TBD", "To Be Determined"]);
    let definitions = MarkdownTable::new(["Term", "Definition"])
        .with_row(["Protocol", "Test procedure document"])
        .with_row(["Conditioning", "Environmental preparation phase"]);
    (acronyms.to_markdown(), definitions.to_markdown())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefilter_keeps_relevant_lines() {
        let text = "The DUT was inspected.\nnothing here\n\nSeal testing followed.\nSUMMARY\n# Heading";
        assert_eq!(
            prefilter_lines(text),
            "The DUT was inspected.\nSeal testing followed.\nSUMMARY\n# Heading"
        );
    }

    #[test]
    fn test_bound_report_marks_truncation() {
        let report = "DVT line\n".repeat(100);
        let bounded = bound_report(&report, 20);
        assert!(bounded.ends_with(TRUNCATION_MARKER));
        assert_eq!(bounded.chars().count(), 20 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_split_on_markers() {
        let output = "ACRONYMS_CONTENT:\n| Acronym | Definition |\n|---|---|\n| DVT | Design Verification Testing |\nDEFINITIONS_CONTENT:\n| Term | Definition |\n|---|---|\n| Lot | A batch |";
        let (acronyms, definitions) = split_acronyms(output).unwrap();
        assert_eq!(entry_count(&acronyms), 1);
        assert!(definitions.contains("| Lot | A batch |"));
    }

    #[test]
    fn test_split_on_headings() {
        let output = "## Acronyms\nDVT: Design Verification Testing\n**Definitions:**\nLot: A batch";
        let (acronyms, definitions) = split_acronyms(output).unwrap();
        assert_eq!(acronyms, "DVT: Design Verification Testing");
        assert_eq!(definitions, "Lot: A batch");
        assert!(split_acronyms("just text").is_err());
    }

    #[test]
    fn test_empty_half_takes_fallback_table() {
        let output = "ACRONYMS_CONTENT:\n| Acronym | Definition |\n|---|---|\n| DVT | Design Verification Testing |\nDEFINITIONS_CONTENT:\n";
        let (acronyms, definitions) = split_acronyms(output).unwrap();
        assert!(acronyms.contains("| DVT | Design Verification Testing |"));
        assert_eq!(definitions, fallback_tables().1);

        let (acronyms, definitions) =
            split_acronyms("## Acronyms\n\n## Definitions\nLot: A batch").unwrap();
        assert_eq!(acronyms, fallback_tables().0);
        assert_eq!(definitions, "Lot: A batch");

        assert!(matches!(
            split_acronyms("ACRONYMS_CONTENT:\n  \nDEFINITIONS_CONTENT:\n"),
            Err(TaskError::EmptyResponse)
        ));
    }

    #[test]
    fn test_fallback_tables() {
        let (acronyms, definitions) = fallback_tables();
        assert_eq!(entry_count(&acronyms), 3);
        assert_eq!(entry_count(&definitions), 2);
        assert!(definitions.contains("| Conditioning | Environmental preparation phase |"));
    }
}
