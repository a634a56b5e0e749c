//! Test procedure summary.

use super::context::RequestContext;
use super::orchestrator::{fallback, ContentGenerationOrchestrator};
use super::prompt::{truncate_chars, Prompt};
use crate::model::{TaskKind, TaskResult};

/// Procedure elements and the keywords that show they are covered.
const ELEMENTS: [(&str, &[&str]); 5] = [
    ("conditioning", &["condition", "prep", "baseline", "setup", "initial"]),
    ("parameters", &["parameter", "measure", "evaluat", "assess", "test"]),
    ("equipment", &["equipment", "instrument", "device", "tool", "system"]),
    ("monitoring", &["monitor", "track", "observ", "record", "log"]),
    ("duration", &["duration", "time", "period", "hour", "day", "week"]),
];

pub(crate) async fn generate(
    orchestrator: &ContentGenerationOrchestrator,
    ctx: &RequestContext,
) -> TaskResult {
    let task = TaskKind::ProcedureSummary;
    let config = orchestrator.config();
    let procedure = ctx
        .sections
        .section_text("procedure")
        .unwrap_or_else(|| ctx.protocol_text().to_string());

    let prompt = Prompt::new("Summarize the test procedure of the protocol below.")
        .context(
            "PROCEDURE",
            truncate_chars(&procedure, config.limits.procedure_content),
        )
        .rule(format!(
            "About {} words of plain prose",
            config.procedure_target_words
        ))
        .rule("Cover conditioning, parameters evaluated, equipment, monitoring and test duration")
        .build();

    let (result, content) = match orchestrator.ask(task, &prompt).await {
        Ok(content) => (TaskResult::generated(task, content.clone()), content),
        Err(e) => {
            let content = fallback_summary(ctx.config.protocol_reference());
            (fallback(task, content.clone(), &e), content)
        }
    };

    let covered = covered_elements(&content);
    let target = config.procedure_target_elements.max(1);
    result
        .with_metadata("word_count", content.split_whitespace().count())
        .with_metadata("target_word_count", config.procedure_target_words)
        .with_metadata("elements_covered", covered.clone())
        .with_metadata("completeness_score", covered.len() as f64 / target as f64)
}

/// Procedure elements mentioned in `text`.
pub fn covered_elements(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    ELEMENTS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(name, _)| *name)
        .collect()
}

fn fallback_summary(protocol: &str) -> String {
    format!(
        "The test procedure consisted of the following activities:\n\
         1. Conditioning: test units were prepared and conditioned per the protocol requirements.\n\
         2. Parameters Evaluated: the parameters defined in the protocol were measured and assessed.\n\
         3. Equipment & Instrumentation: calibrated equipment and instruments were used for all measurements.\n\
         4. Device Monitoring: device behavior was monitored and observations were recorded.\n\
         5. Test Duration: testing was performed over the period specified in the protocol.\n\
         Refer to protocol {} for the detailed procedure.",
        protocol
    )
}
