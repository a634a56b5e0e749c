//! Reference table extraction.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt};
use crate::error::TaskError;
use crate::model::{TaskKind, TaskResult};
use crate::render::{contains_markdown_table, segment_content, MarkdownTable, Segment};

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::References;
    let limit = orchestrator.config().limits.references_content;
    let prompt = Prompt::new("List every document referenced by the protocol below.")
        .context("PROTOCOL", truncate_chars(ctx.protocol_text(), limit))
        .rule("Answer with one markdown table: | Document No. | Document Title | Rev |")
        .rule("Use TBD for unknown values")
        .build();

    let outcome = orchestrator.ask(task, &prompt).await.and_then(|output| {
        if contains_markdown_table(&output) {
            Ok(output)
        } else {
            Err(TaskError::Malformed("no reference table".to_string()))
        }
    });

    match outcome {
        Ok(content) => {
            let numbers = document_numbers(&content);
            TaskResult::generated(task, content)
                .with_metadata("documents_found", numbers.len())
                .with_metadata("document_numbers", numbers)
        }
        Err(e) => {
            let content = fallback_table(ctx.config.protocol_reference());
            let numbers = document_numbers(&content);
            fallback(task, content, &e)
                .with_metadata("documents_found", numbers.len())
                .with_metadata("document_numbers", numbers)
        }
    }
}

/// First-column document numbers of every table, without TBD entries.
pub fn document_numbers(content: &str) -> Vec<String> {
    segment_content(content)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Table(table) => Some(table),
            Segment::Text(_) => None,
        })
        .flat_map(|table| table.rows.into_iter())
        .filter_map(|row| row.into_iter().next())
        .filter(|cell| {
            !cell.is_empty()
                && !cell.eq_ignore_ascii_case("Document No.")
                && !cell.eq_ignore_ascii_case("TBD")
        })
        .collect()
}

fn fallback_table(protocol: &str) -> String {
    MarkdownTable::new(["Document No.", "Document Title", "Rev"])
        .with_row([protocol, "Protocol Document", "TBD"])
        .with_row(["TBD", "Test Specification", "TBD"])
        .with_row(["TBD", "Device Requirements", "TBD"])
        .to_markdown()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_numbers_skip_tbd() {
        let content = "| Document No. | Document Title | Rev |\n|---|---|---|\n| DOC-001 | Spec | A |\n| TBD | Other | TBD |\n| PRO-9 | Protocol | B |";
        assert_eq!(document_numbers(content), vec!["DOC-001", "PRO-9"]);
    }

    #[test]
    fn test_fallback_table_names_protocol() {
        let table = fallback_table("PRO-123");
        assert!(table.starts_with("| Document No. | Document Title | Rev |"));
        assert!(table.contains("| PRO-123 | Protocol Document | TBD |"));
        assert_eq!(document_numbers(&table), vec!["PRO-123"]);
    }
}
