//! Task result envelope shared by every generation task.

use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// The fixed set of generation tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ScopePurpose,
    References,
    ProcedureSummary,
    DeviceConfiguration,
    Equipment,
    TestResultSummary,
    ProtocolDeviations,
    DefectiveUnits,
    TestMethodLosses,
    Conclusion,
    AcronymsDefinitions,
}

impl TaskKind {
    /// Tasks in execution order. Acronyms must stay last.
    pub const PIPELINE: [TaskKind; 11] = [
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
        TaskKind::AcronymsDefinitions,
    ];

    /// Stable configuration key.
    pub fn key(&self) -> &'static str {
        match self {
            TaskKind::ScopePurpose => "scope_and_purpose",
            TaskKind::References => "reference_section",
            TaskKind::ProcedureSummary => "test_procedure",
            TaskKind::DeviceConfiguration => "device_config",
            TaskKind::Equipment => "equipment",
            TaskKind::TestResultSummary => "test_result_summary",
            TaskKind::ProtocolDeviations => "protocol_deviations",
            TaskKind::DefectiveUnits => "defective_unit_investigations",
            TaskKind::TestMethodLosses => "test_method_loss",
            TaskKind::Conclusion => "conclusion",
            TaskKind::AcronymsDefinitions => "acronyms_definitions",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A supplementary file referenced from the report body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    /// `<report-number> rev<revision> Attachment - <label>.xlsx`
    pub filename: String,
    /// Where the copy was written
    pub path: PathBuf,
    /// Spreadsheet it was copied from
    pub source: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Task that produced it
    pub origin: TaskKind,
}

/// Uniform result of one generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: TaskKind,
    /// Always true: failures are converted to fallback content
    pub success: bool,
    pub content: String,
    pub metadata: Map<String, Value>,
    /// Why fallback content was used, if it was
    pub error: Option<String>,
    pub attachments: Vec<AttachmentDescriptor>,
}

impl TaskResult {
    /// Result carrying generated content.
    pub fn generated(task: TaskKind, content: impl Into<String>) -> Self {
        Self {
            task,
            success: true,
            content: content.into(),
            metadata: Map::new(),
            error: None,
            attachments: Vec::new(),
        }
        .with_metadata("fallback_used", false)
    }

    /// Result carrying deterministic fallback content.
    pub fn fallback(task: TaskKind, content: impl Into<String>, error: &TaskError) -> Self {
        Self {
            task,
            success: true,
            content: content.into(),
            metadata: Map::new(),
            error: Some(error.to_string()),
            attachments: Vec::new(),
        }
        .with_metadata("fallback_used", true)
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Attach an attachment descriptor.
    pub fn with_attachment(mut self, attachment: AttachmentDescriptor) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// String metadata entry.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Whether fallback content was used.
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}
