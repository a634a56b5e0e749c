//! Integration tests for the content generation orchestrator.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dvtreport::excel::ExcelExtractionEngine;
use dvtreport::generate::{
    ContentGenerationOrchestrator, GenerationCapability, RequestContext, TaskConfig,
    NO_DEVIATIONS,
};
use dvtreport::model::{
    ContentBlock, ExcelData, Placeholder, ProtocolDocument, RawSheet, ReportConfig, SectionTree,
    SourceFile, TaskKind, TestDataType,
};
use dvtreport::parser::DocumentStructureParser;
use dvtreport::TaskError;

/// Capability that answers from a keyword script and records every call.
struct ScriptedCapability {
    script: Vec<(&'static str, String)>,
    calls: Mutex<Vec<(String, f32)>>,
}

impl ScriptedCapability {
    fn new() -> Self {
        Self {
            script: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn on(mut self, keyword: &'static str, response: impl Into<String>) -> Self {
        self.script.push((keyword, response.into()));
        self
    }

    fn calls(&self) -> Vec<(String, f32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationCapability for ScriptedCapability {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, TaskError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), temperature));
        self.script
            .iter()
            .find(|(keyword, _)| prompt.contains(keyword))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| TaskError::Capability("no scripted response".to_string()))
    }
}

/// Capability that always fails.
struct FailingCapability;

#[async_trait]
impl GenerationCapability for FailingCapability {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, TaskError> {
        Err(TaskError::Capability("connection refused".to_string()))
    }
}

fn raw(name: &str, rows: Vec<Vec<String>>) -> RawSheet {
    RawSheet::new(name, rows)
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Test article sheet with `units` serials; the first `failures` fail.
fn test_articles(units: usize, failures: usize) -> RawSheet {
    let mut rows = vec![row(&["DUT Part Number", "DUT Serial Number", "Test Result 1"])];
    for i in 0..units {
        let result = if i < failures { "FAIL" } else { "PASS" };
        rows.push(vec![
            "PN-4471".to_string(),
            format!("{:010}", 2_000_000 + i),
            result.to_string(),
        ]);
    }
    raw("Test Article Log & Test Results", rows)
}

fn equipment_log(items: usize) -> RawSheet {
    let mut rows = vec![row(&["Equipment", "Asset ID", "Calibration Due"])];
    for i in 0..items {
        rows.push(vec![
            format!("Force gauge {}", i + 1),
            format!("EQ-{:03}", i + 1),
            "2027-01-31".to_string(),
        ]);
    }
    raw("Equipment Log", rows)
}

/// Extract sheets the way uploaded workbooks are extracted.
fn excel(dir: &Path, sheets: &[RawSheet]) -> ExcelData {
    let mut data = ExcelData::new();
    add_workbook(&mut data, dir, "test_data.xlsx", b"workbook bytes", sheets);
    data
}

/// Stage one workbook on disk and merge its sheets into `data`.
fn add_workbook(data: &mut ExcelData, dir: &Path, name: &str, bytes: &[u8], sheets: &[RawSheet]) {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    let source = SourceFile::new(name, &path);

    let workbook = ExcelExtractionEngine::default().extract_sheets(sheets, &source);
    data.summary.files_processed += 1;
    for extraction in workbook.extractions {
        data.insert(extraction);
    }
    data.dut_sheets.extend(workbook.dut_sheet);
}

fn protocol() -> (ProtocolDocument, SectionTree) {
    let mut document = ProtocolDocument::new();
    for text in [
        "1.0 PURPOSE",
        "1.1 Verify the seal strength of the pouch after accelerated aging.",
        "2.0 SCOPE",
        "2.1 Applies to the PN-4471 sterile barrier system.",
        "6.0 ACCEPTANCE CRITERIA",
        "6.1 REQ-001: Seal strength shall be at least 1.2 lbf/in at 95%/90%.",
    ] {
        document.push_paragraph(text);
    }
    let sections = DocumentStructureParser::default().parse(&document);
    (document, sections)
}

fn context(dir: &Path, config: ReportConfig, data: ExcelData) -> RequestContext {
    let (document, sections) = protocol();
    RequestContext::new(config, &document, sections, data, dir.join("attachments"))
}

fn metadata_u64(ctx: &RequestContext, task: TaskKind, key: &str) -> Option<u64> {
    ctx.result(task)
        .and_then(|r| r.metadata.get(key))
        .and_then(|v| v.as_u64())
}

#[tokio::test]
async fn test_every_task_falls_back_when_capability_fails() {
    let dir = tempfile::tempdir().unwrap();
    let data = excel(
        dir.path(),
        &[
            test_articles(6, 1),
            equipment_log(2),
            raw(
                "Deviations",
                vec![
                    row(&["Deviation ID", "Description"]),
                    row(&["DEV-1", "Conditioning started late"]),
                ],
            ),
            raw(
                "Defective Units",
                vec![
                    row(&["Serial Number", "Failure Description"]),
                    row(&["0002000000", "Channel leak"]),
                ],
            ),
            raw(
                "Test Method Loss",
                vec![
                    row(&["#", "PROTOCOL NOTE TYPE", "TEST UNIT SN or ID", "OBSERVATIONS"]),
                    row(&["1", "Test Method Loss", "0002000005", "Fixture slipped"]),
                ],
            ),
        ],
    );
    let mut ctx = context(dir.path(), ReportConfig::new(), data);
    let orchestrator =
        ContentGenerationOrchestrator::new(Arc::new(FailingCapability), TaskConfig::default());

    let results = orchestrator.run(&mut ctx).await;

    assert_eq!(results.len(), TaskKind::PIPELINE.len());
    for result in &results {
        assert!(result.success, "{} did not succeed", result.task);
        assert!(!result.content.trim().is_empty(), "{} is empty", result.task);
        assert!(result.is_fallback(), "{} was not a fallback", result.task);
    }
    let deviations = ctx.content(TaskKind::ProtocolDeviations).unwrap();
    assert!(deviations.starts_with("DEVIATION #1: Conditioning started late"));
    assert!(ctx
        .content(TaskKind::TestResultSummary)
        .unwrap()
        .contains("TBD (Please update with actual acceptance criteria)"));

    let map = ctx.placeholders();
    for placeholder in Placeholder::ALL {
        assert!(map.get(placeholder).is_some(), "{} unbound", placeholder);
    }
}

#[tokio::test]
async fn test_large_unit_and_log_counts_move_to_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let data = excel(dir.path(), &[test_articles(12, 0), equipment_log(6)]);
    let config = ReportConfig::new()
        .with_report_number("00123")
        .with_revision("A");
    let mut ctx = context(dir.path(), config, data);

    ContentGenerationOrchestrator::offline().run(&mut ctx).await;

    let device = ctx.result(TaskKind::DeviceConfiguration).unwrap();
    assert_eq!(device.metadata_str("presentation"), Some("summary"));
    assert_eq!(
        metadata_u64(&ctx, TaskKind::DeviceConfiguration, "test_article_count"),
        Some(12)
    );
    assert!(device.content.contains("A total of 12 test units"));

    // One workbook holds both sheets, so both sections share one copy.
    let filename = "RPT-00123 revA Attachment - Raw Data.xlsx";
    assert_eq!(device.attachments.len(), 1);
    assert_eq!(device.attachments[0].filename, filename);
    let equipment = ctx.result(TaskKind::Equipment).unwrap();
    assert!(equipment.attachments.is_empty());
    assert!(equipment.content.contains(filename));
    assert_eq!(
        metadata_u64(&ctx, TaskKind::Equipment, "equipment_count"),
        Some(6)
    );

    assert_eq!(ctx.attachments().len(), 1);
    assert!(dir.path().join("attachments").join(filename).is_file());
    assert!(ctx.attachments_list().contains(filename));
}

#[tokio::test]
async fn test_units_and_logs_from_separate_workbooks_keep_both_copies() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = ExcelData::new();
    add_workbook(
        &mut data,
        dir.path(),
        "duts.xlsx",
        b"twelve serial numbers workbook",
        &[test_articles(12, 0)],
    );
    add_workbook(&mut data, dir.path(), "logs.xlsx", b"logs", &[equipment_log(6)]);
    let config = ReportConfig::new()
        .with_report_number("00123")
        .with_revision("A");
    let mut ctx = context(dir.path(), config, data);

    ContentGenerationOrchestrator::offline().run(&mut ctx).await;

    let units = "RPT-00123 revA Attachment - Raw Data.xlsx";
    let logs = "RPT-00123 revA Attachment - Equipment Raw Data.xlsx";
    let attachments = dir.path().join("attachments");
    assert_eq!(
        std::fs::read(attachments.join(units)).unwrap(),
        b"twelve serial numbers workbook"
    );
    assert_eq!(std::fs::read(attachments.join(logs)).unwrap(), b"logs");

    let collected: Vec<(&str, TaskKind, u64)> = ctx
        .attachments()
        .iter()
        .map(|a| (a.filename.as_str(), a.origin, a.size))
        .collect();
    assert_eq!(
        collected,
        vec![
            (units, TaskKind::DeviceConfiguration, 30),
            (logs, TaskKind::Equipment, 4),
        ]
    );
    assert!(ctx
        .content(TaskKind::DeviceConfiguration)
        .unwrap()
        .contains(units));
    assert!(ctx.content(TaskKind::Equipment).unwrap().contains(logs));
}

#[tokio::test]
async fn test_empty_deviation_sheet_skips_generation() {
    let dir = tempfile::tempdir().unwrap();
    let data = excel(
        dir.path(),
        &[raw("Deviations", vec![row(&["Deviation ID", "Description"])])],
    );
    let mut ctx = context(dir.path(), ReportConfig::new(), data);
    let capability = Arc::new(
        ScriptedCapability::new().on("protocol deviation", "DEVIATION #1: Invented deviation"),
    );
    let orchestrator = ContentGenerationOrchestrator::new(capability.clone(), TaskConfig::default());

    orchestrator.run(&mut ctx).await;

    assert_eq!(ctx.content(TaskKind::ProtocolDeviations), Some(NO_DEVIATIONS));
    assert!(!ctx.result(TaskKind::ProtocolDeviations).unwrap().is_fallback());
    assert!(capability
        .calls()
        .iter()
        .all(|(prompt, _)| !prompt.contains("protocol deviation below")));
    assert_eq!(
        ctx.placeholders().get(Placeholder::ProtocolDeviations),
        Some(&ContentBlock::Text(NO_DEVIATIONS.to_string()))
    );
}

#[tokio::test]
async fn test_attribute_confidence_from_sample_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let data = excel(dir.path(), &[test_articles(50, 1)]);
    let config = ReportConfig::new().with_test_data_type(TestDataType::Attribute);
    let mut ctx = context(dir.path(), config, data);
    let capability = Arc::new(ScriptedCapability::new().on(
        "acceptance criterion",
        r#"Criteria found:
[{"req_id": "REQ-001", "acceptance_criteria": "Seal strength >= 1.2 lbf/in", "confidence_reliability": "95%/90%"}]"#,
    ));
    let orchestrator = ContentGenerationOrchestrator::new(capability, TaskConfig::default());

    orchestrator.run(&mut ctx).await;

    let summary = ctx.result(TaskKind::TestResultSummary).unwrap();
    assert!(!summary.is_fallback());
    assert!(summary.content.contains("| REQ-001 |"));
    assert!(summary.content.contains("98.00% / 90.00%"));
    assert_eq!(
        metadata_u64(&ctx, TaskKind::TestResultSummary, "actual_sample_size"),
        Some(50)
    );
    assert_eq!(
        metadata_u64(&ctx, TaskKind::TestResultSummary, "defective_units"),
        Some(1)
    );
    assert!(matches!(
        ctx.placeholders().get(Placeholder::TestResultSummary),
        Some(ContentBlock::Table(_))
    ));
}

#[tokio::test]
async fn test_generated_narrative_is_renumbered() {
    let dir = tempfile::tempdir().unwrap();
    let data = excel(
        dir.path(),
        &[raw(
            "Deviations",
            vec![
                row(&["Deviation ID", "Description"]),
                row(&["DEV-1", "Conditioning started late"]),
                row(&["DEV-2", "Wrong fixture revision"]),
            ],
        )],
    );
    let mut ctx = context(dir.path(), ReportConfig::new(), data);
    let capability = Arc::new(ScriptedCapability::new().on(
        "protocol deviation below",
        "## DEVIATIONS\n\n**DEVIATION #4: Conditioning started late**\nNo impact.\n\n\n\nDEVIATION #9: Wrong fixture revision\nRetested.",
    ));
    let orchestrator = ContentGenerationOrchestrator::new(capability, TaskConfig::default());

    orchestrator.run(&mut ctx).await;

    assert_eq!(
        ctx.content(TaskKind::ProtocolDeviations),
        Some(
            "DEVIATION #1: Conditioning started late\nNo impact.\n\nDEVIATION #2: Wrong fixture revision\nRetested."
        )
    );
    assert_eq!(
        metadata_u64(&ctx, TaskKind::ProtocolDeviations, "deviation_count"),
        Some(2)
    );
}

#[tokio::test]
async fn test_task_temperatures_reach_capability() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path(), ReportConfig::new(), ExcelData::new());
    let capability = Arc::new(ScriptedCapability::new());
    let config = TaskConfig::default().with_temperature(TaskKind::Conclusion, 0.9);
    let orchestrator = ContentGenerationOrchestrator::new(capability.clone(), config);

    orchestrator.run(&mut ctx).await;

    let calls = capability.calls();
    let temperature_for = |needle: &str| {
        calls
            .iter()
            .find(|(prompt, _)| prompt.starts_with(needle))
            .map(|(_, t)| *t)
    };
    assert_eq!(temperature_for("Write the purpose and scope"), Some(0.5));
    assert_eq!(temperature_for("Identify every acceptance criterion"), Some(0.3));
    assert_eq!(temperature_for("List the acronyms"), Some(0.2));
    assert_eq!(temperature_for("Write the conclusion"), Some(0.9));
    // acronyms scan the finished report, so they run last
    assert!(calls
        .last()
        .is_some_and(|(prompt, _)| prompt.starts_with("List the acronyms")));
}

#[tokio::test]
async fn test_contexts_do_not_share_attachments() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = ContentGenerationOrchestrator::offline();

    let mut first = context(
        dir.path(),
        ReportConfig::new().with_report_number("1"),
        excel(dir.path(), &[test_articles(12, 0)]),
    );
    let mut second = context(dir.path(), ReportConfig::new(), ExcelData::new());
    orchestrator.run(&mut first).await;
    orchestrator.run(&mut second).await;

    assert_eq!(first.attachments().len(), 1);
    assert!(second.attachments().is_empty());
}
