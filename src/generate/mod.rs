//! Content generation orchestrator.
//!
//! A fixed set of tasks turns the parsed protocol and the extracted
//! spreadsheets into report sections. Each task builds a bounded prompt,
//! calls the [`GenerationCapability`], validates the answer and falls back
//! to deterministic content on any failure.
//!
//! # Example
//!
//! ```no_run
//! use dvtreport::generate::{ContentGenerationOrchestrator, RequestContext};
//! use dvtreport::model::{ExcelData, ProtocolDocument, ReportConfig, SectionTree};
//!
//! # async fn run() {
//! let orchestrator = ContentGenerationOrchestrator::offline();
//! let mut ctx = RequestContext::new(
//!     ReportConfig::new(),
//!     &ProtocolDocument::new(),
//!     SectionTree::new(),
//!     ExcelData::new(),
//!     "attachments",
//! );
//! let results = orchestrator.run(&mut ctx).await;
//! assert!(results.iter().all(|r| r.success));
//! # }
//! ```

mod acronyms;
mod capability;
mod conclusion;
mod config;
mod context;
mod device;
mod equipment;
mod narratives;
mod orchestrator;
mod procedure;
mod prompt;
mod references;
mod results;
mod scope;

pub use acronyms::{bound_report, prefilter_lines, split_acronyms};
pub use capability::{GenerationCapability, UnavailableCapability};
pub use conclusion::validation_notes;
pub use config::{ContentLimits, TaskConfig, DEFAULT_TEMPERATURE};
pub use context::{RequestContext, NO_ATTACHMENTS};
pub use device::handling_statement;
pub use equipment::{item_counts, organize_logs, CALIBRATED, NOT_CALIBRATED, NO_LOG_CONTENT};
pub use narratives::{
    renumber_headers, validate_narrative, NarrativeStyle, DEFECTIVE_UNIT_STYLE, DEVIATION_STYLE,
    NO_DEFECTIVE_UNITS, NO_DEVIATIONS, NO_TEST_METHOD_LOSSES, TEST_METHOD_LOSS_STYLE,
};
pub use orchestrator::ContentGenerationOrchestrator;
pub use procedure::covered_elements;
pub use prompt::{truncate_chars, Prompt, TRUNCATION_MARKER};
pub use references::document_numbers;
pub use results::{
    actual_confidence, parse_criteria, summary_table, AcceptanceCriterion, ATTRIBUTE_HEADERS,
    VARIABLE_HEADERS,
};
pub use scope::split_purpose_scope;
