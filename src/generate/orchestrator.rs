//! Sequencing of the generation tasks.

use super::capability::{GenerationCapability, UnavailableCapability};
use super::config::TaskConfig;
use super::context::RequestContext;
use super::{
    acronyms, conclusion, device, equipment, narratives, procedure, references, results, scope,
};
use crate::error::TaskError;
use crate::model::{TaskKind, TaskResult};
use log::{debug, info, warn};
use std::sync::Arc;

/// Runs the fixed task pipeline over one request.
///
/// Tasks run one at a time in [`TaskKind::PIPELINE`] order. Every task yields
/// exactly one successful [`TaskResult`]; a failed generation call produces
/// fallback content instead of an error.
pub struct ContentGenerationOrchestrator {
    capability: Arc<dyn GenerationCapability>,
    config: TaskConfig,
}

impl ContentGenerationOrchestrator {
    pub fn new(capability: Arc<dyn GenerationCapability>, config: TaskConfig) -> Self {
        Self { capability, config }
    }

    /// Orchestrator whose every section comes from fallback content.
    pub fn offline() -> Self {
        Self::new(Arc::new(UnavailableCapability), TaskConfig::default())
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// Run every task and record its result in `ctx`.
    ///
    /// Acronyms run last because they scan the output of all other tasks.
    pub async fn run(&self, ctx: &mut RequestContext) -> Vec<TaskResult> {
        info!(
            "Running {} generation tasks with {}",
            TaskKind::PIPELINE.len(),
            self.capability.name()
        );
        let mut completed = Vec::with_capacity(TaskKind::PIPELINE.len());
        for task in TaskKind::PIPELINE {
            let result = self.run_task(task, ctx).await;
            debug!(
                "Task {} finished with {} chars (fallback: {})",
                task,
                result.content.len(),
                result.is_fallback()
            );
            completed.push(result.clone());
            ctx.record(result);
        }
        let fallbacks = completed.iter().filter(|r| r.is_fallback()).count();
        info!(
            "Generation finished: {} tasks, {} fallbacks, {} attachments",
            completed.len(),
            fallbacks,
            ctx.attachments().len()
        );
        completed
    }

    /// Run a single task against the current context.
    pub async fn run_task(&self, task: TaskKind, ctx: &RequestContext) -> TaskResult {
        match task {
            TaskKind::ScopePurpose => scope::generate(self, ctx).await,
            TaskKind::References => references::generate(self, ctx).await,
            TaskKind::ProcedureSummary => procedure::generate(self, ctx).await,
            TaskKind::DeviceConfiguration => device::generate(self, ctx).await,
            TaskKind::Equipment => equipment::generate(self, ctx).await,
            TaskKind::TestResultSummary => results::generate(self, ctx).await,
            TaskKind::ProtocolDeviations => narratives::deviations(self, ctx).await,
            TaskKind::DefectiveUnits => narratives::defective_units(self, ctx).await,
            TaskKind::TestMethodLosses => narratives::test_method_losses(self, ctx).await,
            TaskKind::Conclusion => conclusion::generate(self, ctx).await,
            TaskKind::AcronymsDefinitions => acronyms::generate(self, ctx).await,
        }
    }

    /// Call the capability with the task's temperature.
    ///
    /// Blank output is reported as [`TaskError::EmptyResponse`].
    pub(crate) async fn ask(&self, task: TaskKind, prompt: &str) -> Result<String, TaskError> {
        let temperature = self.config.temperature(task);
        debug!(
            "Generating {} ({} prompt chars, temperature {})",
            task,
            prompt.chars().count(),
            temperature
        );
        let output = self.capability.generate(prompt, temperature).await?;
        let output = output.trim();
        if output.is_empty() {
            return Err(TaskError::EmptyResponse);
        }
        Ok(output.to_string())
    }
}

/// Fallback result with a logged reason.
pub(crate) fn fallback(task: TaskKind, content: impl Into<String>, error: &TaskError) -> TaskResult {
    warn!("{}: {}; using fallback content", task, error);
    TaskResult::fallback(task, content, error)
}
