//! dvtreport CLI - design verification test report generator

mod openai;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use dvtreport::excel::format_preview;
use dvtreport::model::{ReportConfig, TestDataType};
use dvtreport::{
    extract_workbooks, parse_protocol_file, ExtractionOptions, GenerationCapability,
    ParseOptions, ReportGenerator, ReportRequest, UnavailableCapability, UploadedFile,
};

use openai::ChatCompletionCapability;

#[derive(Parser)]
#[command(name = "dvtreport")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Generate design verification test reports from protocols and test data", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report from a protocol and test data workbooks
    Generate {
        /// Protocol document (.docx)
        #[arg(short, long, value_name = "FILE")]
        protocol: PathBuf,

        /// Test data workbooks (.xlsx)
        #[arg(short, long = "data", value_name = "FILE")]
        data: Vec<PathBuf>,

        /// Report template (.docx)
        #[arg(short, long, value_name = "FILE", default_value = "Inputs/template.docx")]
        template: PathBuf,

        /// Request metadata as JSON
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Images for the test result analysis section
        #[arg(short, long = "image", value_name = "FILE")]
        images: Vec<PathBuf>,

        /// Report number (overrides the config file)
        #[arg(long)]
        report_number: Option<String>,

        /// Revision (overrides the config file)
        #[arg(long)]
        revision: Option<String>,

        /// Test data type: attribute or variable
        #[arg(long)]
        data_type: Option<String>,

        /// Output directory for the report
        #[arg(short, long, value_name = "DIR", default_value = "Outputs")]
        output: PathBuf,

        /// Output directory for attachments
        #[arg(long, value_name = "DIR")]
        attachments: Option<PathBuf>,

        /// Skip text generation and use fallback content for every section
        #[arg(long)]
        offline: bool,

        /// OpenAI-compatible API base URL
        #[arg(long, env = "DVTREPORT_ENDPOINT", default_value = "http://localhost:11434/v1")]
        endpoint: String,

        /// Model name sent to the endpoint
        #[arg(long, env = "DVTREPORT_MODEL", default_value = "llama3.1")]
        model: String,

        /// API key sent as a bearer token
        #[arg(long, env = "DVTREPORT_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Skip undecodable protocol elements instead of failing
        #[arg(long)]
        lenient: bool,

        /// Print the result summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the section tree parsed from a protocol
    Sections {
        /// Protocol document (.docx)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Keep sections after the appendices heading
        #[arg(long)]
        appendices: bool,

        /// Skip undecodable elements instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Print what was extracted from test data workbooks
    Extract {
        /// Workbooks (.xlsx)
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,

        /// Print test-article records and DUT worksheet rows
        #[arg(long)]
        preview: bool,

        /// Test-article records shown in the preview
        #[arg(long, value_name = "N", default_value = "3")]
        preview_rows: usize,

        /// Widest DUT worksheet row shown in the preview
        #[arg(long, value_name = "N", default_value = "20")]
        dut_columns: usize,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Generate {
            protocol,
            data,
            template,
            config,
            images,
            report_number,
            revision,
            data_type,
            output,
            attachments,
            offline,
            endpoint,
            model,
            api_key,
            timeout,
            lenient,
            json,
        } => {
            let options = GenerateOptions {
                protocol,
                data,
                template,
                config,
                images,
                report_number,
                revision,
                data_type,
                attachments: attachments.unwrap_or_else(|| output.join("attachments")),
                output,
                json,
                lenient,
            };
            build_capability(offline, &endpoint, &model, api_key, timeout)
                .and_then(|capability| cmd_generate(options, capability))
        }
        Commands::Sections {
            input,
            appendices,
            lenient,
        } => cmd_sections(&input, appendices, lenient),
        Commands::Extract {
            inputs,
            json,
            preview,
            preview_rows,
            dut_columns,
        } => {
            let options = ExtractionOptions::new()
                .with_preview_rows(preview_rows)
                .with_dut_max_columns(dut_columns);
            cmd_extract(&inputs, options, json, preview)
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

struct GenerateOptions {
    protocol: PathBuf,
    data: Vec<PathBuf>,
    template: PathBuf,
    config: Option<PathBuf>,
    images: Vec<PathBuf>,
    report_number: Option<String>,
    revision: Option<String>,
    data_type: Option<String>,
    output: PathBuf,
    attachments: PathBuf,
    json: bool,
    lenient: bool,
}

fn build_capability(
    offline: bool,
    endpoint: &str,
    model: &str,
    api_key: Option<String>,
    timeout: u64,
) -> Result<Arc<dyn GenerationCapability>, Box<dyn std::error::Error>> {
    if offline {
        return Ok(Arc::new(UnavailableCapability));
    }
    Ok(Arc::new(ChatCompletionCapability::new(
        endpoint, model, api_key, timeout,
    )?))
}

fn load_config(options: &GenerateOptions) -> Result<ReportConfig, Box<dyn std::error::Error>> {
    let mut config = match options.config {
        Some(ref path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            serde_json::from_str::<ReportConfig>(&text)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        }
        None => ReportConfig::new(),
    };
    if let Some(ref number) = options.report_number {
        config = config.with_report_number(number.as_str());
    }
    if let Some(ref revision) = options.revision {
        config = config.with_revision(revision.as_str());
    }
    if let Some(ref data_type) = options.data_type {
        let parsed: TestDataType = data_type.parse().unwrap_or_default();
        config = config.with_test_data_type(parsed);
    }
    Ok(config.normalized())
}

fn cmd_generate(
    options: GenerateOptions,
    capability: Arc<dyn GenerationCapability>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&options)?;

    let mut request = ReportRequest::new(config, UploadedFile::from_path(&options.protocol)?);
    for path in &options.data {
        request = request.with_data_file(UploadedFile::from_path(path)?);
    }
    for path in &options.images {
        request = request.with_analysis_image(UploadedFile::from_path(path)?);
    }

    let mut parse_options = ParseOptions::new();
    if options.lenient {
        parse_options = parse_options.lenient();
    }
    let generator = ReportGenerator::new()
        .with_capability(capability)
        .with_template(&options.template)
        .with_output_dir(&options.output)
        .with_attachments_dir(&options.attachments)
        .with_parse_options(parse_options);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!(
        "Generating report with {}...",
        generator.capability_name()
    ));

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(generator.generate(request));
    pb.finish_and_clear();
    let output = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Report written to".green().bold(),
        output.document_path.display()
    );
    println!(
        "  {} {} sections parsed, {} workbooks processed",
        "├─".dimmed(),
        output.section_count,
        output.parsing_summary.files_processed
    );
    for error in &output.parsing_summary.errors {
        println!("  {} {}", "├─".dimmed(), error.yellow());
    }
    let fallbacks: Vec<String> = output.fallbacks().map(|r| r.task.to_string()).collect();
    if !fallbacks.is_empty() {
        println!(
            "  {} {} {}",
            "├─".dimmed(),
            "Fallback content used for:".yellow(),
            fallbacks.join(", ")
        );
    }
    for placeholder in &output.assembly.missing {
        println!(
            "  {} {} {}",
            "├─".dimmed(),
            "Appended at end (not in template):".yellow(),
            placeholder
        );
    }
    for attachment in &output.attachments {
        println!("  {} attachment: {}", "├─".dimmed(), attachment.filename);
    }
    println!(
        "  {} {} images embedded",
        "└─".dimmed(),
        output.assembly.images
    );

    Ok(())
}

fn cmd_sections(
    input: &Path,
    appendices: bool,
    lenient: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ParseOptions::new();
    if appendices {
        options = options.with_appendices();
    }
    if lenient {
        options = options.lenient();
    }
    let (document, sections) = parse_protocol_file(input, options)?;

    println!("{}", "Protocol Sections".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Paragraphs".bold(), document.paragraph_count());
    println!("{}: {}", "Tables".bold(), document.table_count());
    println!("{}: {}", "Sections".bold(), sections.len());
    println!();
    println!("{}", sections.format_for_prompt());

    Ok(())
}

fn cmd_extract(
    inputs: &[PathBuf],
    options: ExtractionOptions,
    json: bool,
    preview: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = extract_workbooks(inputs, options.clone());

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{}", "Extraction Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}",
        "Files processed".bold(),
        data.summary.files_processed
    );
    println!(
        "{}: {}",
        "Sheets found".bold(),
        data.summary.sheets_found.join(", ")
    );
    if let Some(ref articles) = data.test_articles {
        let stats = data.statistics();
        println!(
            "{}: {} records ({} test method losses, {} defective)",
            "Test articles".bold(),
            articles.row_count(),
            stats.test_method_losses,
            stats.defective_units
        );
    }
    for log in &data.logs {
        println!("{}: {} rows", log.sheet_name().bold(), log.row_count());
    }
    let deviations: usize = data.deviations.iter().map(|e| e.row_count()).sum();
    let defective: usize = data.defective_units.iter().map(|e| e.row_count()).sum();
    println!("{}: {}", "Deviations".bold(), deviations);
    println!("{}: {}", "Defective units".bold(), defective);

    if preview {
        println!();
        println!("{}", "Preview".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        println!("{}", format_preview(&data, &options));
    }

    for error in &data.summary.errors {
        println!("{} {}", "Warning:".yellow(), error);
    }
    if data.summary.files_processed > 0 && data.summary.errors.len() == data.summary.files_processed
    {
        return Err("no workbook could be read".into());
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "dvtreport".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Design verification test report generator");
    println!();
    println!("License: MIT");
}
