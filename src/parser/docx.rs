//! WordprocessingML reader producing a flat element list.

use super::options::{ErrorMode, ParseOptions};
use crate::error::{Error, Result};
use crate::model::ProtocolDocument;
use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Main document part inside a .docx container.
pub(crate) const DOCUMENT_PART: &str = "word/document.xml";

/// Reads paragraphs and tables from .docx files.
#[derive(Debug, Clone, Default)]
pub struct DocxReader {
    options: ParseOptions,
}

impl DocxReader {
    /// Create a reader with the given options.
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Read a .docx file from disk.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<ProtocolDocument> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.read_archive(BufReader::new(file))
            .map_err(|e| match e {
                Error::Io(_) => e,
                other => Error::DocumentParse(format!("{}: {}", path.display(), other)),
            })
    }

    /// Read a .docx file from memory.
    pub fn read_bytes(&self, data: &[u8]) -> Result<ProtocolDocument> {
        self.read_archive(Cursor::new(data))
    }

    fn read_archive<R: Read + Seek>(&self, reader: R) -> Result<ProtocolDocument> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::DocumentParse(format!("not a Word document: {}", e)))?;
        let xml = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| Error::DocumentParse(format!("missing {}", DOCUMENT_PART)))?;
        parse_document_xml(&xml, &self.options)
    }
}

/// Read one archive member as UTF-8, `None` when it does not exist.
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Collects text into the open paragraph or table cell.
#[derive(Default)]
struct BodyCollector {
    document: ProtocolDocument,
    paragraph: Option<String>,
    paragraph_depth: usize,
    table: Vec<Vec<String>>,
    table_depth: usize,
    in_text: bool,
}

impl BodyCollector {
    fn push_text(&mut self, text: &str) {
        if self.table_depth > 0 {
            if let Some(cell) = self.table.last_mut().and_then(|row| row.last_mut()) {
                cell.push_str(text);
            }
        } else if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph.push_str(text);
        }
    }

    fn start(&mut self, name: &[u8]) {
        match name {
            b"w:tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table.clear();
                }
            }
            b"w:tr" if self.table_depth == 1 => self.table.push(Vec::new()),
            b"w:tc" if self.table_depth == 1 => {
                if let Some(row) = self.table.last_mut() {
                    row.push(String::new());
                }
            }
            b"w:p" if self.table_depth > 0 => {
                let cell_has_text = self
                    .table
                    .last()
                    .and_then(|row| row.last())
                    .is_some_and(|cell| !cell.is_empty());
                if cell_has_text {
                    self.push_text("\n");
                }
            }
            b"w:p" => {
                self.paragraph_depth += 1;
                if self.paragraph_depth == 1 {
                    self.paragraph = Some(String::new());
                }
            }
            b"w:t" => self.in_text = true,
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        match name {
            b"w:tab" => self.push_text("\t"),
            b"w:br" | b"w:cr" => self.push_text("\n"),
            b"w:p" if self.table_depth == 0 && self.paragraph_depth == 0 => {
                self.document.push_paragraph("");
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:p" if self.table_depth == 0 && self.paragraph_depth > 0 => {
                self.paragraph_depth -= 1;
                if self.paragraph_depth == 0 {
                    let text = self.paragraph.take().unwrap_or_default();
                    self.document.push_paragraph(text);
                }
            }
            b"w:tbl" if self.table_depth > 0 => {
                self.table_depth -= 1;
                if self.table_depth == 0 {
                    let rows = std::mem::take(&mut self.table);
                    self.document.push_table(rows);
                }
            }
            _ => {}
        }
    }
}

/// Parse the main document part into paragraphs and tables.
///
/// Nested tables are flattened into the text of their enclosing cell.
pub fn parse_document_xml(xml: &str, options: &ParseOptions) -> Result<ProtocolDocument> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    let mut collector = BodyCollector::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => collector.start(e.name().as_ref()),
            Ok(Event::Empty(e)) => collector.empty(e.name().as_ref()),
            Ok(Event::End(e)) => collector.end(e.name().as_ref()),
            Ok(Event::Text(e)) if collector.in_text => match e.unescape() {
                Ok(text) => collector.push_text(&text),
                Err(err) => match options.error_mode {
                    ErrorMode::Strict => return Err(err.into()),
                    ErrorMode::Lenient => warn!("Skipping undecodable text run: {}", err),
                },
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => match options.error_mode {
                ErrorMode::Strict => {
                    return Err(Error::DocumentParse(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        err
                    )))
                }
                ErrorMode::Lenient => {
                    warn!(
                        "XML error at position {}, keeping content read so far: {}",
                        reader.buffer_position(),
                        err
                    );
                    break;
                }
            },
        }
    }

    let document = collector.document;
    debug!(
        "Read {} paragraphs and {} tables",
        document.paragraph_count(),
        document.table_count()
    );
    Ok(document)
}
