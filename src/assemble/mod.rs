//! Report assembly from a Word template.
//!
//! [`TemplateAssembler`] copies the template package, substitutes the body
//! placeholders and header/footer fields, embeds analysis images and writes
//! the result as a new `.docx`.
//!
//! # Example
//!
//! ```no_run
//! use dvtreport::assemble::TemplateAssembler;
//! use dvtreport::model::{ContentBlock, Placeholder, PlaceholderMap, ReportConfig};
//!
//! let assembler = TemplateAssembler::new("Inputs/template.docx", "Outputs");
//! let mut map = PlaceholderMap::new();
//! map.insert(Placeholder::Conclusion, ContentBlock::Text("All units passed.".into()));
//!
//! let report = assembler.assemble(&map, &ReportConfig::new()).unwrap();
//! println!("{}", report.output_path.display());
//! ```

mod fields;
mod media;
mod scan;
mod xml;

pub use fields::{field_value, is_header_footer_part, replace_fields};
pub use media::{extent_emu, MediaPart, MediaSet, MAX_WIDTH_EMU};
pub use scan::{scan_part, splice, ParagraphSpan, PartScan, ScanScope};
pub use xml::{escape, paragraph, run, table, text_paragraph, RunStyle, BODY_SIZE_PT, FONT};

use crate::error::{Error, Result};
use crate::model::{ContentBlock, HeaderField, Placeholder, PlaceholderMap, ReportConfig};
use crate::parser::{read_part, DOCUMENT_PART};
use crate::render::{segment_content, CleanupPipeline, Segment};
use media::{CONTENT_TYPES_PART, RELS_PART};
use xml::paragraph_properties;

use log::{debug, info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Outcome of assembling one report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AssemblyReport {
    pub output_path: PathBuf,
    /// Placeholders present in the template body
    pub found: Vec<Placeholder>,
    /// Bound placeholders absent from the template, appended at the end
    pub missing: Vec<Placeholder>,
    /// Placeholders found in the template whose content was empty
    pub empty: Vec<Placeholder>,
    pub header_fields: Vec<HeaderField>,
    pub images: usize,
}

impl AssemblyReport {
    /// Whether every bound placeholder had a home in the template.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Fills a report template with generated content.
#[derive(Debug, Clone)]
pub struct TemplateAssembler {
    template: PathBuf,
    output_dir: PathBuf,
    cleanup: CleanupPipeline,
}

impl TemplateAssembler {
    pub fn new(template: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            output_dir: output_dir.into(),
            cleanup: CleanupPipeline::default(),
        }
    }

    /// Use a different markdown cleanup pipeline.
    pub fn with_cleanup(mut self, cleanup: CleanupPipeline) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Verify that the template exists and holds a document part.
    pub fn check_template(&self) -> Result<()> {
        if !self.template.is_file() {
            return Err(Error::TemplateMissing(self.template.clone()));
        }
        let file = File::open(&self.template)?;
        let mut archive = ZipArchive::new(file).map_err(|e| corrupt(&self.template, e))?;
        match read_part(&mut archive, DOCUMENT_PART) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Error::TemplateCorrupt(format!(
                "{} has no {}",
                self.template.display(),
                DOCUMENT_PART
            ))),
            Err(e) => Err(corrupt(&self.template, e)),
        }
    }

    /// Assemble into a timestamped file in the output directory.
    pub fn assemble(&self, map: &PlaceholderMap, config: &ReportConfig) -> Result<AssemblyReport> {
        fs::create_dir_all(&self.output_dir)?;
        let name = chrono::Local::now()
            .format("DVT_Report_%Y%m%d_%H%M%S.docx")
            .to_string();
        self.assemble_to(map, config, self.output_dir.join(name))
    }

    /// Assemble into `output_path`.
    pub fn assemble_to(
        &self,
        map: &PlaceholderMap,
        config: &ReportConfig,
        output_path: impl Into<PathBuf>,
    ) -> Result<AssemblyReport> {
        let output_path = output_path.into();
        let mut entries = self.read_package()?;
        let mut media = MediaSet::new(entries.iter().map(|(name, _)| name.as_str()));
        let mut report = AssemblyReport {
            output_path: output_path.clone(),
            ..Default::default()
        };

        for (name, data) in entries.iter_mut() {
            if name == DOCUMENT_PART {
                let body = part_text(name, data)?;
                let filled = self.fill_body(&body, map, &mut media, &mut report)?;
                *data = filled.into_bytes();
            } else if is_header_footer_part(name) {
                let part = part_text(name, data)?;
                let (filled, found) = replace_fields(&part, config)?;
                for field in found {
                    if !report.header_fields.contains(&field) {
                        report.header_fields.push(field);
                    }
                }
                *data = filled.into_bytes();
            }
        }

        if !media.is_empty() {
            for (name, data) in entries.iter_mut() {
                if name == RELS_PART {
                    *data = media.update_relationships(&part_text(name, data)?).into_bytes();
                } else if name == CONTENT_TYPES_PART {
                    *data = media.update_content_types(&part_text(name, data)?).into_bytes();
                }
            }
        }
        report.images = media.parts().len();

        write_package(&output_path, &entries, &media)?;
        info!(
            "Assembled {} ({} placeholders, {} appended, {} images)",
            output_path.display(),
            report.found.len(),
            report.missing.len(),
            report.images
        );
        Ok(report)
    }

    fn read_package(&self) -> Result<Vec<(String, Vec<u8>)>> {
        if !self.template.is_file() {
            return Err(Error::TemplateMissing(self.template.clone()));
        }
        let file = File::open(&self.template)?;
        let mut archive = ZipArchive::new(file).map_err(|e| corrupt(&self.template, e))?;
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| corrupt(&self.template, e))?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|e| corrupt(&self.template, e))?;
            entries.push((entry.name().to_string(), data));
        }
        if !entries.iter().any(|(name, _)| name == DOCUMENT_PART) {
            return Err(Error::TemplateCorrupt(format!(
                "{} has no {}",
                self.template.display(),
                DOCUMENT_PART
            )));
        }
        debug!("Read {} template parts", entries.len());
        Ok(entries)
    }

    fn fill_body(
        &self,
        body: &str,
        map: &PlaceholderMap,
        media: &mut MediaSet,
        report: &mut AssemblyReport,
    ) -> Result<String> {
        let scan = scan_part(body, ScanScope::BodyChildren)?;
        let mut edits = Vec::new();

        for span in &scan.paragraphs {
            let mut tokens: Vec<(usize, Placeholder)> = Placeholder::ALL
                .iter()
                .filter_map(|p| span.text.find(p.token()).map(|at| (at, *p)))
                .collect();
            if tokens.is_empty() {
                continue;
            }
            tokens.sort_by_key(|(at, _)| *at);

            let mut text = span.text.clone();
            let mut images = String::new();
            let mut trailing = String::new();
            let mut changed = false;

            for (_, placeholder) in tokens {
                if !report.found.contains(&placeholder) {
                    report.found.push(placeholder);
                }
                let Some(block) = map.get(placeholder) else {
                    warn!("No content bound to {}", placeholder);
                    continue;
                };
                if block.is_empty() {
                    warn!("Empty content for {}; token left in place", placeholder);
                    report.empty.push(placeholder);
                    continue;
                }
                changed = true;
                match block {
                    ContentBlock::Images(paths) => {
                        text = text.replace(placeholder.token(), "");
                        images.push_str(&media.image_runs(paths));
                    }
                    ContentBlock::Text(_) | ContentBlock::Table(_) => {
                        let (lead, rest) = self.render_text(placeholder, block.text());
                        text = text.replace(placeholder.token(), &lead);
                        trailing.push_str(&rest);
                    }
                }
                debug!("Substituted {}", placeholder);
            }

            if !changed {
                continue;
            }
            let properties = paragraph_properties(&body[span.start..span.end]);
            let mut runs = String::new();
            if !text.trim().is_empty() {
                runs.push_str(&run(&text, RunStyle::body()));
            }
            runs.push_str(&images);
            let mut replacement = paragraph(properties, &runs);
            replacement.push_str(&trailing);
            edits.push((span.start, span.end, replacement));
        }

        let appended = self.missing_content(map, media, report);
        if !appended.is_empty() {
            match scan.append_at {
                Some(at) => edits.push((at, at, appended)),
                None => {
                    return Err(Error::TemplateCorrupt(format!(
                        "{} has no body",
                        DOCUMENT_PART
                    )))
                }
            }
        }
        Ok(splice(body, edits))
    }

    /// Content for bound placeholders the template does not contain.
    fn missing_content(
        &self,
        map: &PlaceholderMap,
        media: &mut MediaSet,
        report: &mut AssemblyReport,
    ) -> String {
        let mut out = String::new();
        for (placeholder, block) in map.iter() {
            if report.found.contains(&placeholder) || block.is_empty() {
                continue;
            }
            warn!(
                "{} not found in template; appending content at end of document",
                placeholder
            );
            report.missing.push(placeholder);
            out.push_str(&text_paragraph(None, ""));
            out.push_str(&text_paragraph(
                None,
                &format!("Missing section content for {}:", placeholder.token()),
            ));
            match block {
                ContentBlock::Images(paths) => {
                    out.push_str(&paragraph(None, &media.image_runs(paths)));
                }
                ContentBlock::Text(text) | ContentBlock::Table(text) => {
                    let (lead, rest) = self.render_text(placeholder, text);
                    if !lead.trim().is_empty() {
                        out.push_str(&text_paragraph(None, &lead));
                    }
                    out.push_str(&rest);
                }
            }
        }
        out
    }

    /// Split text into the part that replaces the token and the blocks that
    /// follow the paragraph.
    fn render_text(&self, placeholder: Placeholder, text: &str) -> (String, String) {
        let text = if placeholder.is_verbatim() {
            text.to_string()
        } else {
            self.cleanup.process(text)
        };
        let mut segments = segment_content(&text);
        let lead = match segments.first_mut() {
            Some(Segment::Text(t)) => std::mem::take(t),
            _ => String::new(),
        };
        (lead, render_segments(segments))
    }
}

fn render_segments(segments: Vec<Segment>) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) if t.trim().is_empty() => {}
            Segment::Text(t) => out.push_str(&text_paragraph(None, &t)),
            Segment::Table(t) => out.push_str(&table(&t)),
        }
    }
    out
}

fn part_text(name: &str, data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec())
        .map_err(|e| Error::TemplateCorrupt(format!("{} is not UTF-8: {}", name, e)))
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::TemplateCorrupt(format!("{}: {}", path.display(), err))
}

fn write_package(path: &Path, entries: &[(String, Vec<u8>)], media: &MediaSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    for part in media.parts() {
        zip.start_file(part.name.as_str(), options)?;
        zip.write_all(&part.data)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:pPr><w:pStyle w:val="Body"/></w:pPr><w:r><w:t>[BK_PURPOSE_</w:t></w:r><w:r><w:t>TEXT]</w:t></w:r></w:p><w:p><w:r><w:t>[BK_TEST_RESULT_SUMMARY]</w:t></w:r></w:p><w:p><w:r><w:t>[BK_CONCLUSION]</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="12240"/></w:sectPr></w:body></w:document>"#;

    const HEADER: &str = r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>[BK_TITLE]</w:t></w:r></w:p></w:hdr>"#;

    fn template(dir: &Path) -> PathBuf {
        let path = dir.join("template.docx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, data) in [
            (CONTENT_TYPES_PART, "<Types></Types>"),
            (RELS_PART, "<Relationships></Relationships>"),
            (DOCUMENT_PART, DOCUMENT),
            ("word/header1.xml", HEADER),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    fn read_output(path: &Path, part: &str) -> String {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        read_part(&mut archive, part).unwrap().unwrap()
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = TemplateAssembler::new(dir.path().join("none.docx"), dir.path());
        assert!(matches!(
            assembler.check_template(),
            Err(Error::TemplateMissing(_))
        ));
        let result = assembler.assemble(&PlaceholderMap::new(), &ReportConfig::new());
        assert!(matches!(result, Err(Error::TemplateMissing(_))));
    }

    #[test]
    fn test_corrupt_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.docx");
        fs::write(&path, b"not a zip").unwrap();
        let assembler = TemplateAssembler::new(&path, dir.path());
        assert!(matches!(
            assembler.check_template(),
            Err(Error::TemplateCorrupt(_))
        ));
    }

    #[test]
    fn test_cloned_assembler_cleans_content() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = TemplateAssembler::new(template(dir.path()), dir.path().join("out"));
        let copy = assembler.clone();
        assert!(format!("{:?}", copy).contains("CleanupPipeline"));

        let mut map = PlaceholderMap::new();
        map.insert(
            Placeholder::Conclusion,
            ContentBlock::Text("All **acceptance criteria** were met.".into()),
        );
        let output = dir.path().join("copy.docx");
        copy.assemble_to(&map, &ReportConfig::new(), &output).unwrap();
        let body = read_output(&output, DOCUMENT_PART);
        assert!(body.contains("All acceptance criteria were met."));
    }

    #[test]
    fn test_text_and_table_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = TemplateAssembler::new(template(dir.path()), dir.path().join("out"));
        assembler.check_template().unwrap();

        let mut map = PlaceholderMap::new();
        map.insert(
            Placeholder::PurposeText,
            ContentBlock::Text("Verify seal strength & integrity.".into()),
        );
        map.insert(
            Placeholder::TestResultSummary,
            ContentBlock::Table(
                "Results below.\n\n| Requirement | Result | Pass/Fail |\n|---|---|---|\n| Seal | 12 N | Pass |\n| Burst |  | Fail |"
                    .into(),
            ),
        );
        let report = assembler.assemble(&map, &ReportConfig::new()).unwrap();
        let name = report.output_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("DVT_Report_") && name.ends_with(".docx"));
        assert!(report.is_complete());
        assert_eq!(
            report.found,
            vec![
                Placeholder::PurposeText,
                Placeholder::TestResultSummary,
                Placeholder::Conclusion
            ]
        );

        let body = read_output(&report.output_path, DOCUMENT_PART);
        assert!(body.contains("<w:pPr><w:pStyle w:val=\"Body\"/></w:pPr>"));
        assert!(body.contains("Verify seal strength &amp; integrity."));
        assert!(body.contains(">Results below.</w:t>"));
        let table_xml = &body[body.find("<w:tbl>").unwrap()..];
        assert_eq!(table_xml.matches("<w:tr>").count(), 3);
        assert_eq!(table_xml.matches("<w:tc>").count(), 9);
        // no binding for the conclusion
        assert!(body.contains("[BK_CONCLUSION]"));
    }

    #[test]
    fn test_missing_placeholder_appended() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = TemplateAssembler::new(template(dir.path()), dir.path());
        let mut map = PlaceholderMap::new();
        map.insert(
            Placeholder::ProtocolDeviations,
            ContentBlock::Text("No deviations.".into()),
        );
        let report = assembler
            .assemble_to(&map, &ReportConfig::new(), dir.path().join("report.docx"))
            .unwrap();
        assert_eq!(report.missing, vec![Placeholder::ProtocolDeviations]);

        let body = read_output(&report.output_path, DOCUMENT_PART);
        let note = body
            .find("Missing section content for [BK_PROTOCOL_DEVIATIONS]:")
            .unwrap();
        let content = body.find("No deviations.").unwrap();
        assert!(note < content);
        assert!(content < body.find("<w:sectPr>").unwrap());
    }

    #[test]
    fn test_header_fields_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = TemplateAssembler::new(template(dir.path()), dir.path());
        let config = ReportConfig::new().with_title("Seal Strength DVT");
        let report = assembler
            .assemble_to(&PlaceholderMap::new(), &config, dir.path().join("report.docx"))
            .unwrap();
        assert_eq!(report.header_fields, vec![HeaderField::Title]);

        let header = read_output(&report.output_path, "word/header1.xml");
        assert!(header.contains(">Seal Strength DVT</w:t>"));
        assert!(header.contains("<w:b/>"));
        assert!(header.contains("<w:sz w:val=\"20\"/>"));
    }
}
