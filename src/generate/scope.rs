//! Purpose and scope extraction.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt};
use crate::error::TaskError;
use crate::model::{TaskKind, TaskResult};
use crate::render::extract_protocol_tables;

const PURPOSE_MARKER: &str = "PURPOSE_CONTENT:";
const SCOPE_MARKER: &str = "SCOPE_CONTENT:";
const DEFAULT_SUBJECT: &str = "device verification testing";

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::ScopePurpose;
    let limits = &orchestrator.config().limits;
    let tables = extract_protocol_tables(ctx.protocol_text());

    let prompt = Prompt::new(
        "Write the purpose and scope sections of a design verification test report \
         from the protocol below.",
    )
    .context(
        "PROTOCOL SECTIONS",
        truncate_chars(&ctx.sections.format_for_prompt(), limits.protocol_content),
    )
    .context("SCOPE TABLES", tables.join("\n\n"))
    .rule(format!(
        "Start the purpose with {} and the scope with {}",
        PURPOSE_MARKER, SCOPE_MARKER
    ))
    .rule("Keep scope tables as pipe-delimited markdown tables")
    .build();

    let outcome = orchestrator
        .ask(task, &prompt)
        .await
        .and_then(|output| split_purpose_scope(&output));

    match outcome {
        Ok((purpose, scope)) => {
            let scope = with_tables(scope, &tables);
            TaskResult::generated(task, format!("{}\n\n{}", purpose, scope))
                .with_metadata("purpose_content", purpose)
                .with_metadata("scope_content", scope)
                .with_metadata("tables_found", tables.len())
        }
        Err(e) => {
            let (purpose, scope) = fallback_content(ctx, &tables);
            fallback(task, format!("{}\n\n{}", purpose, scope), &e)
                .with_metadata("purpose_content", purpose)
                .with_metadata("scope_content", scope)
                .with_metadata("tables_found", tables.len())
        }
    }
}

/// Split marked output into purpose and scope text.
///
/// Scope runs to the end of the output.
pub fn split_purpose_scope(output: &str) -> Result<(String, String), TaskError> {
    let (_, after_purpose) = output
        .split_once(PURPOSE_MARKER)
        .ok_or_else(|| TaskError::Malformed(format!("missing {}", PURPOSE_MARKER)))?;
    let (purpose, scope) = after_purpose
        .split_once(SCOPE_MARKER)
        .ok_or_else(|| TaskError::Malformed(format!("missing {}", SCOPE_MARKER)))?;
    let (purpose, scope) = (purpose.trim(), scope.trim());
    if purpose.is_empty() || scope.is_empty() {
        return Err(TaskError::EmptyResponse);
    }
    Ok((purpose.to_string(), scope.to_string()))
}

/// Append protocol scope tables when the text carries none.
fn with_tables(scope: String, tables: &[String]) -> String {
    if tables.is_empty() || scope.lines().any(|l| l.contains('|')) {
        return scope;
    }
    format!("{}\n\n{}", scope, tables.join("\n\n"))
}

fn fallback_content(ctx: &RequestContext, tables: &[String]) -> (String, String) {
    let subject = |needle: &str| {
        ctx.sections
            .section_text(needle)
            .map(|t| t.lines().next().unwrap_or_default().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
    };
    let purpose = format!(
        "The purpose of this report is to document the results of the {} executed under protocol {}.",
        subject("purpose"),
        ctx.config.protocol_reference()
    );
    let scope = format!(
        "The scope of this report applies to {} for project {}.",
        subject("scope"),
        ctx.config.project_name
    );
    (purpose, with_tables(scope, tables))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_markers() {
        let (purpose, scope) =
            split_purpose_scope("PURPOSE_CONTENT:\nVerify seal.\nSCOPE_CONTENT:\nApplies to X.\n| a |")
                .unwrap();
        assert_eq!(purpose, "Verify seal.");
        assert_eq!(scope, "Applies to X.\n| a |");
    }

    #[test]
    fn test_split_requires_markers() {
        assert!(matches!(
            split_purpose_scope("Just text"),
            Err(TaskError::Malformed(_))
        ));
        assert!(matches!(
            split_purpose_scope("PURPOSE_CONTENT: x SCOPE_CONTENT:  "),
            Err(TaskError::EmptyResponse)
        ));
    }

    #[test]
    fn test_tables_appended_once() {
        let tables = vec!["| Doc ID |\n| --- |\n| D-1 |".to_string()];
        assert_eq!(
            with_tables("Scope.".into(), &tables),
            "Scope.\n\n| Doc ID |\n| --- |\n| D-1 |"
        );
        assert_eq!(with_tables("| x |".into(), &tables), "| x |");
    }
}
