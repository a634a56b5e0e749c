//! Request-scoped inputs and accumulated results.

use crate::model::{
    AttachmentDescriptor, ContentBlock, ExcelData, Placeholder, PlaceholderMap,
    ProtocolDocument, ReportConfig, SectionTree, TaskKind, TaskResult,
};
use crate::render::{chronology_table, classify_content};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Text bound to the attachments placeholder when nothing was attached.
pub const NO_ATTACHMENTS: &str = "No attachments included with this report.";

/// Everything one report-generation request owns.
///
/// Created fresh for each request so attachments and placeholder bindings
/// never leak between reports.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub config: ReportConfig,
    pub sections: SectionTree,
    pub excel: ExcelData,
    /// Images bound to the test result analysis placeholder
    pub analysis_images: Vec<PathBuf>,
    attachments_dir: PathBuf,
    protocol_text: String,
    results: HashMap<TaskKind, TaskResult>,
    attachments: Vec<AttachmentDescriptor>,
}

impl RequestContext {
    /// Create a context for one request.
    pub fn new(
        config: ReportConfig,
        document: &ProtocolDocument,
        sections: SectionTree,
        excel: ExcelData,
        attachments_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            sections,
            excel,
            analysis_images: Vec::new(),
            attachments_dir: attachments_dir.into(),
            protocol_text: document.plain_text(),
            results: HashMap::new(),
            attachments: Vec::new(),
        }
    }

    pub fn with_analysis_images(mut self, images: Vec<PathBuf>) -> Self {
        self.analysis_images = images;
        self
    }

    /// Flat protocol text.
    pub fn protocol_text(&self) -> &str {
        &self.protocol_text
    }

    /// Directory attachment copies are written to.
    pub fn attachments_dir(&self) -> &Path {
        &self.attachments_dir
    }

    /// Store a task result and collect its attachments.
    ///
    /// An attachment with a filename already collected replaces the earlier
    /// descriptor in place, matching the copy now on disk.
    pub fn record(&mut self, result: TaskResult) {
        for attachment in &result.attachments {
            match self
                .attachments
                .iter_mut()
                .find(|a| a.filename == attachment.filename)
            {
                Some(existing) => {
                    debug!("Attachment {} rewritten", attachment.filename);
                    *existing = attachment.clone();
                }
                None => self.attachments.push(attachment.clone()),
            }
        }
        self.results.insert(result.task, result);
    }

    pub fn result(&self, task: TaskKind) -> Option<&TaskResult> {
        self.results.get(&task)
    }

    /// Final content of a completed task.
    pub fn content(&self, task: TaskKind) -> Option<&str> {
        self.result(task).map(|r| r.content.as_str())
    }

    /// Attachments collected so far, in creation order.
    pub fn attachments(&self) -> &[AttachmentDescriptor] {
        &self.attachments
    }

    /// Numbered attachment list, or a note that nothing was attached.
    pub fn attachments_list(&self) -> String {
        if self.attachments.is_empty() {
            return NO_ATTACHMENTS.to_string();
        }
        self.attachments
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}. {}", i + 1, a.filename))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bind task output and request data to the placeholder vocabulary.
    pub fn placeholders(&self) -> PlaceholderMap {
        let mut map = PlaceholderMap::new();
        let mut bind = |placeholder: Placeholder, text: Option<&str>| {
            if let Some(text) = text {
                map.insert(placeholder, classify_content(text));
            }
        };

        let scope = self.result(TaskKind::ScopePurpose);
        bind(
            Placeholder::PurposeText,
            scope.and_then(|r| r.metadata_str("purpose_content")),
        );
        bind(
            Placeholder::ScopeText,
            scope.and_then(|r| r.metadata_str("scope_content")),
        );
        let acronyms = self.result(TaskKind::AcronymsDefinitions);
        bind(
            Placeholder::Acronyms,
            acronyms.and_then(|r| r.metadata_str("acronyms_content")),
        );
        bind(
            Placeholder::Definitions,
            acronyms.and_then(|r| r.metadata_str("definitions_content")),
        );

        for (placeholder, task) in [
            (Placeholder::References, TaskKind::References),
            (Placeholder::ProcedureSummary, TaskKind::ProcedureSummary),
            (Placeholder::DutConfig, TaskKind::DeviceConfiguration),
            (Placeholder::ConsumablesUsed, TaskKind::Equipment),
            (Placeholder::TestResultSummary, TaskKind::TestResultSummary),
            (
                Placeholder::TestMethodLossInvestigations,
                TaskKind::TestMethodLosses,
            ),
            (Placeholder::ProtocolDeviations, TaskKind::ProtocolDeviations),
            (Placeholder::DefectiveUnit, TaskKind::DefectiveUnits),
            (Placeholder::Conclusion, TaskKind::Conclusion),
        ] {
            bind(placeholder, self.content(task));
        }

        bind(
            Placeholder::TestExecutionChronology,
            Some(chronology_table(&self.config.chronology).as_str()),
        );
        bind(Placeholder::Attachments, Some(self.attachments_list().as_str()));

        let analysis = if self.analysis_images.is_empty() {
            ContentBlock::Text("TBD".to_string())
        } else {
            ContentBlock::Images(self.analysis_images.clone())
        };
        map.insert(Placeholder::TestResultAnalysis, analysis);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext::new(
            ReportConfig::new().with_report_number("100"),
            &ProtocolDocument::new(),
            SectionTree::new(),
            ExcelData::new(),
            "/tmp/attachments",
        )
    }

    fn attachment(name: &str, origin: TaskKind, size: u64) -> AttachmentDescriptor {
        AttachmentDescriptor {
            filename: name.to_string(),
            path: PathBuf::from("/tmp/attachments").join(name),
            source: PathBuf::from("/uploads/test_data.xlsx"),
            size,
            origin,
        }
    }

    #[test]
    fn test_attachments_deduplicated_by_filename() {
        let name = "RPT-100 revA Attachment - Raw Data.xlsx";
        let mut ctx = context();
        ctx.record(
            TaskResult::generated(TaskKind::DeviceConfiguration, "summary")
                .with_attachment(attachment(name, TaskKind::DeviceConfiguration, 10)),
        );
        ctx.record(
            TaskResult::generated(TaskKind::Equipment, "equipment")
                .with_attachment(attachment(name, TaskKind::Equipment, 4)),
        );
        assert_eq!(ctx.attachments().len(), 1);
        assert_eq!(ctx.attachments()[0].origin, TaskKind::Equipment);
        assert_eq!(ctx.attachments()[0].size, 4);
        assert_eq!(
            ctx.attachments_list(),
            "1. RPT-100 revA Attachment - Raw Data.xlsx"
        );
    }

    #[test]
    fn test_static_blocks_always_bound() {
        let ctx = context();
        let map = ctx.placeholders();
        assert_eq!(
            map.get(Placeholder::Attachments),
            Some(&ContentBlock::Text(NO_ATTACHMENTS.to_string()))
        );
        assert_eq!(
            map.get(Placeholder::TestResultAnalysis),
            Some(&ContentBlock::Text("TBD".to_string()))
        );
        assert!(matches!(
            map.get(Placeholder::TestExecutionChronology),
            Some(ContentBlock::Table(_))
        ));
        assert!(map.get(Placeholder::Conclusion).is_none());
    }

    #[test]
    fn test_scope_result_feeds_two_placeholders() {
        let mut ctx = context();
        ctx.record(
            TaskResult::generated(TaskKind::ScopePurpose, "both")
                .with_metadata("purpose_content", "Why.")
                .with_metadata("scope_content", "What."),
        );
        let map = ctx.placeholders();
        assert_eq!(map.get(Placeholder::PurposeText).unwrap().text(), "Why.");
        assert_eq!(map.get(Placeholder::ScopeText).unwrap().text(), "What.");
    }
}
