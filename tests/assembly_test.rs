//! Integration tests for template assembly.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use dvtreport::assemble::TemplateAssembler;
use dvtreport::model::{ContentBlock, Placeholder, PlaceholderMap, ReportConfig};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

/// Template whose body holds one paragraph per token.
fn template(dir: &Path, tokens: &[&str], extra: &[(&str, &[u8])]) -> PathBuf {
    let body: String = tokens.iter().map(|t| paragraph(t)).collect();
    let document = format!(
        "<w:document xmlns:w=\"{}\"><w:body>{}<w:sectPr/></w:body></w:document>",
        W_NS, body
    );
    let path = dir.join("template.docx");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    let mut parts: Vec<(&str, &[u8])> = vec![
        (
            "[Content_Types].xml",
            &b"<Types><Default Extension=\"xml\" ContentType=\"application/xml\"/></Types>"[..],
        ),
        (
            "word/_rels/document.xml.rels",
            &b"<Relationships></Relationships>"[..],
        ),
        ("word/document.xml", document.as_bytes()),
    ];
    parts.extend_from_slice(extra);
    for (name, data) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn read_part(path: &Path, name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    Some(text)
}

fn png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::new(width, height).save(&path).unwrap();
    path
}

#[test]
fn test_markdown_table_becomes_native_table() {
    let dir = tempfile::tempdir().unwrap();
    let assembler = TemplateAssembler::new(
        template(dir.path(), &["[BK_DUT_CONFIG]"], &[]),
        dir.path(),
    );
    let mut map = PlaceholderMap::new();
    map.insert(
        Placeholder::DutConfig,
        ContentBlock::Table(
            "| DUT Part Number | Serial Number | Lot |\n\
             |:---|:---:|---:|\n\
             | PN-4471 | 0002000001 | L1 |\n\
             | PN-4471 | 0002000002 |  |\n\
             | PN-4471 |  | L2 |\n\
             | PN-4471 | 0002000004 | L2 |"
                .to_string(),
        ),
    );

    let output = dir.path().join("report.docx");
    let report = assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    assert_eq!(report.output_path, output);
    assert_eq!(report.found, vec![Placeholder::DutConfig]);

    let body = read_part(&output, "word/document.xml").unwrap();
    assert!(!body.contains("[BK_DUT_CONFIG]"));
    assert!(!body.contains("|:---"));
    assert_eq!(body.matches("<w:tbl>").count(), 1);
    assert_eq!(body.matches("<w:tr>").count(), 5);
    assert_eq!(body.matches("<w:tc>").count(), 15);
    assert!(body.contains("0002000004"));
}

#[test]
fn test_prose_around_tables_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let assembler = TemplateAssembler::new(
        template(dir.path(), &["[BK_TEST_RESULT_SUMMARY]"], &[]),
        dir.path(),
    );
    let mut map = PlaceholderMap::new();
    map.insert(
        Placeholder::TestResultSummary,
        ContentBlock::Table(
            "All criteria were met.\n\n| Requirement | Result |\n|---|---|\n| REQ-001 | Pass |\n\nSee attachment."
                .to_string(),
        ),
    );

    let output = dir.path().join("report.docx");
    assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    let body = read_part(&output, "word/document.xml").unwrap();

    let lead = body.find("All criteria were met.").unwrap();
    let table = body.find("<w:tbl>").unwrap();
    let tail = body.find("See attachment.").unwrap();
    assert!(lead < table && table < tail);
}

#[test]
fn test_verbatim_blocks_skip_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let assembler = TemplateAssembler::new(
        template(
            dir.path(),
            &["[BK_PURPOSE_TEXT]", "[BK_TEST_EXECUTION_CHRONOLOGY]"],
            &[],
        ),
        dir.path(),
    );
    let mut map = PlaceholderMap::new();
    map.insert(
        Placeholder::PurposeText,
        ContentBlock::Text("The **seal strength** was verified.".to_string()),
    );
    map.insert(
        Placeholder::TestExecutionChronology,
        ContentBlock::Text("Day 1: **conditioning** started".to_string()),
    );

    let output = dir.path().join("report.docx");
    assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    let body = read_part(&output, "word/document.xml").unwrap();
    assert!(body.contains("The seal strength was verified."));
    assert!(body.contains("Day 1: **conditioning** started"));
}

#[test]
fn test_empty_content_leaves_token() {
    let dir = tempfile::tempdir().unwrap();
    let assembler = TemplateAssembler::new(
        template(dir.path(), &["[BK_DEFINITIONS]", "[BK_ACRONYMS]"], &[]),
        dir.path(),
    );
    let mut map = PlaceholderMap::new();
    map.insert(Placeholder::Definitions, ContentBlock::Text("  \n".to_string()));

    let output = dir.path().join("report.docx");
    let report = assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    assert_eq!(report.empty, vec![Placeholder::Definitions]);
    assert!(report.missing.is_empty());

    let body = read_part(&output, "word/document.xml").unwrap();
    assert!(body.contains("[BK_DEFINITIONS]"));
    assert!(body.contains("[BK_ACRONYMS]"));
}

#[test]
fn test_images_embedded_in_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let existing: &[u8] = b"existing media";
    let assembler = TemplateAssembler::new(
        template(
            dir.path(),
            &["[BK_TEST_RESULT_ANALYSIS]"],
            &[("word/media/dvt_image1.png", existing)],
        ),
        dir.path(),
    );

    let wide = png(dir.path(), "wide.png", 1200, 300);
    let small = png(dir.path(), "small.png", 10, 20);
    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"not an image").unwrap();

    let mut map = PlaceholderMap::new();
    map.insert(
        Placeholder::TestResultAnalysis,
        ContentBlock::Images(vec![
            wide,
            dir.path().join("missing.png"),
            broken,
            small,
        ]),
    );

    let output = dir.path().join("report.docx");
    let report = assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    assert_eq!(report.images, 2);

    let body = read_part(&output, "word/document.xml").unwrap();
    assert!(!body.contains("[BK_TEST_RESULT_ANALYSIS]"));
    assert_eq!(body.matches("<w:drawing>").count(), 2);
    assert!(body.contains("[Image insertion failed: broken.png]"));
    assert!(!body.contains("missing.png"));
    // 1200 px is wider than six inches and is scaled down.
    assert!(body.contains("cx=\"5486400\" cy=\"1371600\""));
    assert!(body.contains("cx=\"95250\" cy=\"190500\""));

    let rels = read_part(&output, "word/_rels/document.xml.rels").unwrap();
    assert!(rels.contains("Target=\"media/dvt_image2.png\""));
    assert!(rels.contains("Target=\"media/dvt_image3.png\""));
    let types = read_part(&output, "[Content_Types].xml").unwrap();
    assert_eq!(types.matches("Extension=\"png\"").count(), 1);
    assert_eq!(
        read_part(&output, "word/media/dvt_image1.png").unwrap(),
        "existing media"
    );
}

#[test]
fn test_missing_images_appended_after_note() {
    let dir = tempfile::tempdir().unwrap();
    let assembler = TemplateAssembler::new(
        template(dir.path(), &["[BK_CONCLUSION]"], &[]),
        dir.path(),
    );
    let mut map = PlaceholderMap::new();
    map.insert(
        Placeholder::Conclusion,
        ContentBlock::Text("All units passed.".to_string()),
    );
    map.insert(
        Placeholder::TestResultAnalysis,
        ContentBlock::Images(vec![png(dir.path(), "plot.png", 4, 4)]),
    );

    let output = dir.path().join("report.docx");
    let report = assembler
        .assemble_to(&map, &ReportConfig::new(), &output)
        .unwrap();
    assert_eq!(report.missing, vec![Placeholder::TestResultAnalysis]);
    assert_eq!(report.images, 1);

    let body = read_part(&output, "word/document.xml").unwrap();
    let note = body
        .find("Missing section content for [BK_TEST_RESULT_ANALYSIS]:")
        .unwrap();
    let drawing = body.find("<w:drawing>").unwrap();
    let section = body.find("<w:sectPr").unwrap();
    assert!(note < drawing && drawing < section);
}
