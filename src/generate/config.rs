//! Immutable per-task configuration handed to the orchestrator.

use crate::excel::AttachmentPolicy;
use crate::model::TaskKind;
use std::collections::HashMap;

/// Temperature for tasks without an explicit entry.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Character budgets applied before content reaches the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    /// Protocol structure for scope extraction
    pub protocol_content: usize,

    /// Protocol text scanned for references
    pub references_content: usize,

    /// Protocol text for the procedure summary
    pub procedure_content: usize,

    /// Assembled report for the acronym scan
    pub complete_report: usize,

    /// Prefiltered report lines for the acronym scan
    pub acronym_prefilter: usize,

    /// Protocol text scanned for acceptance criteria
    pub protocol_analysis: usize,

    /// Deviation and investigation records
    pub deviations_content: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            protocol_content: 3000,
            references_content: 6000,
            procedure_content: 4000,
            complete_report: 6000,
            acronym_prefilter: 4000,
            protocol_analysis: 2000,
            deviations_content: 5000,
        }
    }
}

/// Configuration for the content generation tasks.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    temperatures: HashMap<TaskKind, f32>,

    /// Temperature for tasks without an entry
    pub default_temperature: f32,

    pub limits: ContentLimits,

    /// When datasets move into attachments
    pub attachments: AttachmentPolicy,

    /// Target length of the procedure summary
    pub procedure_target_words: usize,

    /// Procedure elements a complete summary covers
    pub procedure_target_elements: usize,

    /// Widest DUT row shown to the capability
    pub dut_max_columns: usize,
}

impl TaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sampling temperature for a task.
    pub fn temperature(&self, task: TaskKind) -> f32 {
        self.temperatures
            .get(&task)
            .copied()
            .unwrap_or(self.default_temperature)
    }

    /// Override the temperature of one task.
    pub fn with_temperature(mut self, task: TaskKind, temperature: f32) -> Self {
        self.temperatures.insert(task, temperature);
        self
    }

    pub fn with_limits(mut self, limits: ContentLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_attachment_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.attachments = policy;
        self
    }

    pub fn with_dut_max_columns(mut self, columns: usize) -> Self {
        self.dut_max_columns = columns;
        self
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        let temperatures = HashMap::from([
            (TaskKind::ScopePurpose, 0.5),
            (TaskKind::References, 0.3),
            (TaskKind::ProcedureSummary, 0.6),
            (TaskKind::AcronymsDefinitions, 0.2),
            (TaskKind::DeviceConfiguration, 0.4),
            (TaskKind::Equipment, 0.3),
            (TaskKind::TestResultSummary, 0.3),
            (TaskKind::ProtocolDeviations, 0.4),
            (TaskKind::DefectiveUnits, 0.4),
            (TaskKind::TestMethodLosses, 0.4),
            (TaskKind::Conclusion, 0.5),
        ]);
        Self {
            temperatures,
            default_temperature: DEFAULT_TEMPERATURE,
            limits: ContentLimits::default(),
            attachments: AttachmentPolicy::default(),
            procedure_target_words: 200,
            procedure_target_elements: 5,
            dut_max_columns: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_temperatures() {
        let config = TaskConfig::default();
        assert_eq!(config.temperature(TaskKind::AcronymsDefinitions), 0.2);
        assert_eq!(config.temperature(TaskKind::ProcedureSummary), 0.6);
        assert_eq!(config.temperature(TaskKind::Conclusion), 0.5);
    }

    #[test]
    fn test_override_and_default() {
        let mut config = TaskConfig::new().with_temperature(TaskKind::Equipment, 0.9);
        assert_eq!(config.temperature(TaskKind::Equipment), 0.9);
        config.temperatures.clear();
        assert_eq!(config.temperature(TaskKind::Equipment), DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_default_thresholds() {
        let config = TaskConfig::default();
        assert!(config.attachments.dut_overflow(11));
        assert!(!config.attachments.dut_overflow(10));
        assert!(config.attachments.log_too_large(6));
        assert_eq!(config.limits.acronym_prefilter, 4000);
    }
}
