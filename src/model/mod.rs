//! Data model shared by the parser, extraction engine, orchestrator and assembler.
//!
//! Everything here is request-scoped: created from uploaded files, consumed
//! once by the template assembler, never persisted.

mod config;
mod content;
mod document;
mod record;
mod section;
mod task;
mod worksheet;

pub use config::{ChronologyEntry, DeviceConfig, ReportConfig, TestDataType};
pub use content::{ContentBlock, HeaderField, Placeholder, PlaceholderMap};
pub use document::{DocElement, ProtocolDocument};
pub use record::Record;
pub use section::{Section, SectionId, SectionItem, SectionTree, TableItem};
pub use task::{AttachmentDescriptor, TaskKind, TaskResult};
pub use worksheet::{
    DutSheet, ExcelData, ParsingSummary, RawSheet, SampleStatistics, SheetCategory, SheetFamily,
    SourceFile, WorksheetExtraction,
};
