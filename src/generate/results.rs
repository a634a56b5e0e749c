//! Test result summary table.
//!
//! Acceptance criteria come from the capability; every statistic comes from
//! the test-article sheet. Attribute data gets an actual confidence computed
//! as `1 - defective_units / actual_sample_size`; variable data leaves the
//! tolerance interval columns for manual completion.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt};
use crate::error::TaskError;
use crate::model::{SampleStatistics, TaskKind, TaskResult, TestDataType};
use crate::render::MarkdownTable;
use regex::Regex;
use serde::Deserialize;

pub const ATTRIBUTE_HEADERS: [&str; 8] = [
    "REQ ID",
    "Acceptance Criteria",
    "Confidence / Reliability",
    "Initial Sample Size",
    "Test Method Losses",
    "Actual Sample Size",
    "Defective Units",
    "Actual Confidence/ Reliability",
];

pub const VARIABLE_HEADERS: [&str; 8] = [
    "REQ ID",
    "Acceptance Criteria",
    "Confidence / Reliability",
    "Initial Sample Size",
    "Test Method Losses",
    "Actual Sample Size",
    "Tolerance Interval",
    "Confidence / Reliability",
];

const DEFAULT_NOTE: &str =
    "*Note: Default template generated. Please update with actual Acceptance Criteria data.*";

/// One acceptance criterion identified in the protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AcceptanceCriterion {
    pub req_id: String,
    pub acceptance_criteria: String,
    pub confidence_reliability: String,
}

impl AcceptanceCriterion {
    fn placeholder() -> Self {
        Self {
            req_id: "TBD".to_string(),
            acceptance_criteria: "TBD (Please update with actual acceptance criteria)".to_string(),
            confidence_reliability: "90%/90%".to_string(),
        }
    }
}

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::TestResultSummary;
    let limit = orchestrator.config().limits.protocol_analysis;
    let stats = ctx.excel.statistics();
    let data_type = ctx.config.test_data_type;

    let protocol = ctx
        .sections
        .section_text("acceptance criteria")
        .unwrap_or_else(|| ctx.sections.format_for_prompt());
    let prompt = Prompt::new("Identify every acceptance criterion in the protocol below.")
        .context("PROTOCOL", truncate_chars(&protocol, limit))
        .rule("Answer with a JSON array of objects with keys req_id, acceptance_criteria, confidence_reliability")
        .rule("confidence_reliability is written as confidence%/reliability%, for example 95%/90%")
        .build();

    let outcome = orchestrator.ask(task, &prompt).await.and_then(|output| {
        let criteria = parse_criteria(&output);
        if criteria.is_empty() {
            Err(TaskError::MissingInput("acceptance criteria".to_string()))
        } else {
            Ok(criteria)
        }
    });

    let result = match outcome {
        Ok(criteria) => TaskResult::generated(task, summary_table(&criteria, &stats, data_type))
            .with_metadata("criteria_count", criteria.len()),
        Err(e) => {
            let table = summary_table(&[AcceptanceCriterion::placeholder()], &stats, data_type);
            fallback(task, format!("{}\n\n{}", table, DEFAULT_NOTE), &e)
                .with_metadata("criteria_count", 0)
        }
    };
    result
        .with_metadata("test_data_type", data_type.to_string())
        .with_metadata("actual_sample_size", stats.actual_sample_size)
        .with_metadata("defective_units", stats.defective_units)
}

/// Acceptance criteria from capability output.
///
/// A JSON array is preferred; labeled `REQ ID:` lines are the fallback.
pub fn parse_criteria(output: &str) -> Vec<AcceptanceCriterion> {
    let array = Regex::new(r"(?s)\[.*\]").unwrap();
    if let Some(found) = array.find(output) {
        if let Ok(criteria) = serde_json::from_str::<Vec<AcceptanceCriterion>>(found.as_str()) {
            let criteria: Vec<_> = criteria
                .into_iter()
                .filter(|c| !c.req_id.trim().is_empty() || !c.acceptance_criteria.trim().is_empty())
                .collect();
            if !criteria.is_empty() {
                return criteria;
            }
        }
    }
    parse_labeled_criteria(output)
}

fn parse_labeled_criteria(output: &str) -> Vec<AcceptanceCriterion> {
    let mut criteria = Vec::new();
    let mut current: Option<AcceptanceCriterion> = None;
    for line in output.lines() {
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        if let Some(value) = strip_label(line, "REQ ID:") {
            criteria.extend(current.take());
            current = Some(AcceptanceCriterion {
                req_id: value,
                ..Default::default()
            });
        } else if let Some(value) = strip_label(line, "Acceptance Criteria:") {
            if let Some(c) = current.as_mut() {
                c.acceptance_criteria = value;
            }
        } else if let Some(value) = strip_label(line, "Confidence/Reliability:") {
            if let Some(c) = current.as_mut() {
                c.confidence_reliability = value;
            }
        }
    }
    criteria.extend(current);
    criteria
}

fn strip_label(line: &str, label: &str) -> Option<String> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| line[label.len()..].trim().to_string())
}

/// Actual confidence and reliability for attribute data.
///
/// `TBD` when the sample is empty or the reliability cannot be read.
pub fn actual_confidence(stats: &SampleStatistics, confidence_reliability: &str) -> String {
    if stats.actual_sample_size == 0 {
        return "TBD".to_string();
    }
    let Some(reliability) = parse_reliability(confidence_reliability) else {
        return "TBD".to_string();
    };
    let confidence = 1.0 - stats.defective_units as f64 / stats.actual_sample_size as f64;
    format!("{:.2}% / {:.2}%", confidence * 100.0, reliability * 100.0)
}

/// Reliability fraction from `confidence/reliability`, e.g. `95%/90%`.
fn parse_reliability(value: &str) -> Option<f64> {
    let part = value.split('/').nth(1).unwrap_or(value);
    let number: f64 = part.trim().trim_end_matches('%').trim().parse().ok()?;
    if !(0.0..=100.0).contains(&number) {
        return None;
    }
    Some(if number > 1.0 { number / 100.0 } else { number })
}

/// Summary table for the given criteria.
pub fn summary_table(
    criteria: &[AcceptanceCriterion],
    stats: &SampleStatistics,
    data_type: TestDataType,
) -> String {
    let headers = match data_type {
        TestDataType::Attribute => ATTRIBUTE_HEADERS,
        TestDataType::Variable => VARIABLE_HEADERS,
    };
    let mut table = MarkdownTable::new(headers);
    for criterion in criteria {
        let mut row = vec![
            criterion.req_id.clone(),
            criterion.acceptance_criteria.clone(),
            criterion.confidence_reliability.clone(),
            stats.initial_sample_size.to_string(),
            stats.test_method_losses.to_string(),
            stats.actual_sample_size.to_string(),
        ];
        match data_type {
            TestDataType::Attribute => {
                row.push(stats.defective_units.to_string());
                row.push(actual_confidence(stats, &criterion.confidence_reliability));
            }
            TestDataType::Variable => {
                row.push(String::new());
                row.push(String::new());
            }
        }
        table = table.with_row(row);
    }
    table.to_markdown()
}
