//! # dvtreport
//!
//! Design-verification test report generation for Rust.
//!
//! This library reads a test protocol (`.docx`) and the test data workbooks
//! (`.xlsx`), generates every report section through a pluggable text
//! generation capability, and fills a Word template with the result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dvtreport::{ReportGenerator, ReportRequest, UploadedFile};
//! use dvtreport::model::ReportConfig;
//!
//! # async fn run() -> dvtreport::Result<()> {
//! let generator = ReportGenerator::new()
//!     .with_template("Inputs/template.docx")
//!     .with_output_dir("Outputs");
//!
//! let request = ReportRequest::new(
//!     ReportConfig::new().with_report_number("00123").with_revision("A"),
//!     UploadedFile::from_path("protocol.docx")?,
//! )
//! .with_data_file(UploadedFile::from_path("test_data.xlsx")?);
//!
//! let output = generator.generate(request).await?;
//! println!("Report written to {}", output.document_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! - **Protocol parsing**: numbered section tree from the protocol document
//! - **Spreadsheet extraction**: test articles, logs, deviations and losses
//! - **Content generation**: one task per report section with fallbacks
//! - **Template assembly**: placeholders, header fields, tables and images

pub mod assemble;
pub mod error;
pub mod excel;
pub mod generate;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use assemble::{AssemblyReport, TemplateAssembler};
pub use error::{Error, Result, TaskError};
pub use excel::{ExcelExtractionEngine, ExtractorRegistry, SheetExtractor};
pub use generate::{
    ContentGenerationOrchestrator, GenerationCapability, RequestContext, TaskConfig,
    UnavailableCapability,
};
pub use model::{
    AttachmentDescriptor, ContentBlock, ExcelData, ParsingSummary, Placeholder, PlaceholderMap,
    ReportConfig, SectionTree, TaskKind, TaskResult,
};
pub use parser::{DocumentStructureParser, DocxReader, ExtractionOptions, ParseOptions};

use log::{debug, info};
use model::{ProtocolDocument, SourceFile};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parse a protocol document into its section tree.
///
/// # Example
///
/// ```no_run
/// use dvtreport::{parse_protocol_file, ParseOptions};
///
/// let (document, sections) = parse_protocol_file("protocol.docx", ParseOptions::default())?;
/// println!("{}", sections.format_for_prompt());
/// # Ok::<(), dvtreport::Error>(())
/// ```
pub fn parse_protocol_file<P: AsRef<Path>>(
    path: P,
    options: ParseOptions,
) -> Result<(ProtocolDocument, SectionTree)> {
    let document = DocxReader::new(options.clone()).read_path(path)?;
    let sections = DocumentStructureParser::new(options).parse(&document);
    Ok((document, sections))
}

/// Extract known worksheets from workbooks on disk.
///
/// Unreadable workbooks are reported in the returned parsing summary.
pub fn extract_workbooks<P: AsRef<Path>>(paths: &[P], options: ExtractionOptions) -> ExcelData {
    let files: Vec<SourceFile> = paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            SourceFile::new(name, path)
        })
        .collect();
    ExcelExtractionEngine::new(options).extract_files(&files)
}

/// A file supplied with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, keeping its file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("not a file: {}", path.display())))?;
        Ok(Self { filename, bytes })
    }
}

/// Everything needed to produce one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub config: ReportConfig,
    pub protocol: UploadedFile,
    pub data_files: Vec<UploadedFile>,
    /// Images for the test result analysis section
    pub analysis_images: Vec<UploadedFile>,
}

impl ReportRequest {
    pub fn new(config: ReportConfig, protocol: UploadedFile) -> Self {
        Self {
            config,
            protocol,
            data_files: Vec::new(),
            analysis_images: Vec::new(),
        }
    }

    pub fn with_data_file(mut self, file: UploadedFile) -> Self {
        self.data_files.push(file);
        self
    }

    pub fn with_analysis_image(mut self, image: UploadedFile) -> Self {
        self.analysis_images.push(image);
        self
    }
}

/// Result of a completed request.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    pub document_path: PathBuf,
    pub attachments: Vec<AttachmentDescriptor>,
    pub task_results: Vec<TaskResult>,
    pub assembly: AssemblyReport,
    pub parsing_summary: ParsingSummary,
    /// Number of protocol sections parsed
    pub section_count: usize,
}

impl ReportOutput {
    /// Tasks whose content came from a fallback.
    pub fn fallbacks(&self) -> impl Iterator<Item = &TaskResult> {
        self.task_results.iter().filter(|r| r.is_fallback())
    }
}

/// Builder and entry point for report generation.
///
/// A generator holds no per-request state and may serve any number of
/// requests, including concurrently.
///
/// # Example
///
/// ```no_run
/// use dvtreport::{ReportGenerator, TaskConfig, ParseOptions};
///
/// let generator = ReportGenerator::new()
///     .with_template("Inputs/template.docx")
///     .with_attachments_dir("Outputs/attachments")
///     .with_task_config(TaskConfig::default())
///     .with_parse_options(ParseOptions::new().lenient());
/// ```
#[derive(Clone)]
pub struct ReportGenerator {
    capability: Arc<dyn GenerationCapability>,
    template: PathBuf,
    output_dir: PathBuf,
    attachments_dir: PathBuf,
    task_config: TaskConfig,
    parse_options: ParseOptions,
    extraction_options: ExtractionOptions,
}

impl ReportGenerator {
    /// Create a generator without a generation capability.
    ///
    /// Every section is produced from its fallback until
    /// [`with_capability`](Self::with_capability) is called.
    pub fn new() -> Self {
        Self {
            capability: Arc::new(UnavailableCapability),
            template: PathBuf::from("Inputs/template.docx"),
            output_dir: PathBuf::from("Outputs"),
            attachments_dir: PathBuf::from("Outputs/attachments"),
            task_config: TaskConfig::default(),
            parse_options: ParseOptions::default(),
            extraction_options: ExtractionOptions::default(),
        }
    }

    pub fn with_capability(mut self, capability: Arc<dyn GenerationCapability>) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_attachments_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.attachments_dir = dir.into();
        self
    }

    pub fn with_task_config(mut self, config: TaskConfig) -> Self {
        self.task_config = config;
        self
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    pub fn with_extraction_options(mut self, options: ExtractionOptions) -> Self {
        self.extraction_options = options;
        self
    }

    /// Name of the configured capability.
    pub fn capability_name(&self) -> &str {
        self.capability.name()
    }

    /// Produce one report.
    ///
    /// Uploads are staged in a temporary directory that is removed on every
    /// exit path. Generation failures never fail the request; a missing
    /// template or unreadable protocol does.
    pub async fn generate(&self, request: ReportRequest) -> Result<ReportOutput> {
        let assembler = TemplateAssembler::new(&self.template, &self.output_dir);
        assembler.check_template()?;

        let staging = tempfile::Builder::new().prefix("dvtreport-").tempdir()?;
        debug!("Staging uploads in {}", staging.path().display());

        let protocol = stage(staging.path(), 0, &request.protocol)?;
        let mut data_files = Vec::with_capacity(request.data_files.len());
        for (i, upload) in request.data_files.iter().enumerate() {
            let path = stage(staging.path(), i + 1, upload)?;
            data_files.push(SourceFile::new(&upload.filename, path));
        }
        let offset = 1 + request.data_files.len();
        let mut images = Vec::with_capacity(request.analysis_images.len());
        for (i, upload) in request.analysis_images.iter().enumerate() {
            images.push(stage(staging.path(), offset + i, upload)?);
        }

        let (document, sections) = parse_protocol_file(&protocol, self.parse_options.clone())?;
        info!(
            "Parsed {}: {} paragraphs, {} tables, {} sections",
            request.protocol.filename,
            document.paragraph_count(),
            document.table_count(),
            sections.len()
        );
        let excel = ExcelExtractionEngine::new(self.extraction_options.clone())
            .extract_files(&data_files);

        let section_count = sections.len();
        let mut ctx = RequestContext::new(
            request.config.normalized(),
            &document,
            sections,
            excel,
            &self.attachments_dir,
        )
        .with_analysis_images(images);

        let orchestrator =
            ContentGenerationOrchestrator::new(self.capability.clone(), self.task_config.clone());
        let task_results = orchestrator.run(&mut ctx).await;

        let assembly = assembler.assemble(&ctx.placeholders(), &ctx.config)?;
        Ok(ReportOutput {
            document_path: assembly.output_path.clone(),
            attachments: ctx.attachments().to_vec(),
            task_results,
            assembly,
            parsing_summary: ctx.excel.summary.clone(),
            section_count,
        })
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an upload under a name unique within the staging directory.
fn stage(dir: &Path, index: usize, upload: &UploadedFile) -> Result<PathBuf> {
    let name = Path::new(&upload.filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let path = dir.join(format!("{:02}_{}", index, name));
    fs::write(&path, &upload.bytes)?;
    Ok(path)
}
