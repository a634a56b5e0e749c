//! The opaque text-generation capability used by every task.

use crate::error::TaskError;
use async_trait::async_trait;

/// Text generation backend.
///
/// Given a prompt and a sampling temperature, return generated text or fail.
/// Implementations must not panic; every failure is reported as a
/// [`TaskError`] and turned into fallback content by the calling task.
#[async_trait]
pub trait GenerationCapability: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str {
        "generation"
    }

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, TaskError>;
}

/// Capability that always fails.
///
/// Every section of a report built with it comes from fallback content.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCapability;

#[async_trait]
impl GenerationCapability for UnavailableCapability {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, TaskError> {
        Err(TaskError::Capability(
            "no generation capability configured".to_string(),
        ))
    }
}
