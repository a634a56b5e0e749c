//! Inline images: media parts, relationships and drawing runs.

use super::xml::{escape, run, RunStyle};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub(crate) const RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// EMU per pixel at 96 dpi.
const EMU_PER_PIXEL: u64 = 9525;

/// Widest image: six inches.
pub const MAX_WIDTH_EMU: u64 = 5_486_400;

/// Red text shown where an image could not be read.
fn failure_run(name: &str) -> String {
    run(
        &format!("[Image insertion failed: {}]", name),
        RunStyle::body().colored("FF0000"),
    )
}

/// A media part added to the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPart {
    /// Archive path, e.g. `word/media/dvt_image1.png`
    pub name: String,
    pub relationship_id: String,
    pub extension: String,
    pub data: Vec<u8>,
}

/// Collects images added while assembling one document.
#[derive(Debug, Default)]
pub struct MediaSet {
    parts: Vec<MediaPart>,
    existing: BTreeSet<String>,
    next_id: usize,
}

impl MediaSet {
    /// Create a set that avoids the template's existing part names.
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            parts: Vec::new(),
            existing: existing.into_iter().map(str::to_string).collect(),
            next_id: 0,
        }
    }

    pub fn parts(&self) -> &[MediaPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Runs for a sequence of images separated by line breaks.
    ///
    /// Missing files are skipped; unreadable ones become a failure note.
    pub fn image_runs(&mut self, paths: &[impl AsRef<Path>]) -> String {
        let mut runs = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                warn!("Image not found, skipping: {}", path.display());
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match self.add_image(path) {
                Ok(xml) => runs.push(xml),
                Err(e) => {
                    warn!("Image insertion failed for {}: {}", path.display(), e);
                    runs.push(failure_run(&name));
                }
            }
        }
        runs.join("<w:r><w:br/></w:r>")
    }

    fn add_image(&mut self, path: &Path) -> std::result::Result<String, String> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| content_type(e).is_some())
            .ok_or_else(|| "unsupported image type".to_string())?;
        let (width, height) = image::ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| e.to_string())?
            .into_dimensions()
            .map_err(|e| e.to_string())?;
        let data = fs::read(path).map_err(|e| e.to_string())?;
        let (cx, cy) = extent_emu(width, height);

        let (name, id) = self.next_name(&extension);
        let relationship_id = format!("rIdDvtImg{}", id);
        debug!("Embedding {} as {} ({}x{} px)", path.display(), name, width, height);
        let xml = drawing_run(&relationship_id, id, &name, cx, cy);
        self.parts.push(MediaPart {
            name,
            relationship_id,
            extension,
            data,
        });
        Ok(xml)
    }

    fn next_name(&mut self, extension: &str) -> (String, usize) {
        loop {
            self.next_id += 1;
            let name = format!("word/media/dvt_image{}.{}", self.next_id, extension);
            if !self.existing.contains(&name) {
                return (name, self.next_id);
            }
        }
    }

    /// Relationships part with the image relationships added.
    pub fn update_relationships(&self, rels: &str) -> String {
        let mut entries = String::new();
        for part in &self.parts {
            let target = part.name.trim_start_matches("word/");
            entries.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>",
                part.relationship_id,
                IMAGE_REL_TYPE,
                escape(target)
            ));
        }
        insert_before(rels, "</Relationships>", &entries)
    }

    /// Content types part with a default for every new image extension.
    pub fn update_content_types(&self, types: &str) -> String {
        let mut entries = String::new();
        let mut seen = BTreeSet::new();
        for part in &self.parts {
            let extension = part.extension.as_str();
            let declared = types
                .to_lowercase()
                .contains(&format!("extension=\"{}\"", extension));
            if declared || !seen.insert(extension) {
                continue;
            }
            if let Some(mime) = content_type(extension) {
                entries.push_str(&format!(
                    "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                    extension, mime
                ));
            }
        }
        insert_before(types, "</Types>", &entries)
    }
}

fn insert_before(xml: &str, closing: &str, entries: &str) -> String {
    match xml.rfind(closing) {
        Some(at) => format!("{}{}{}", &xml[..at], entries, &xml[at..]),
        None => format!("{}{}", xml, entries),
    }
}

fn content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Display size in EMU, capped at six inches wide.
pub fn extent_emu(width_px: u32, height_px: u32) -> (u64, u64) {
    let cx = width_px as u64 * EMU_PER_PIXEL;
    let cy = height_px as u64 * EMU_PER_PIXEL;
    if cx <= MAX_WIDTH_EMU || cx == 0 {
        return (cx, cy);
    }
    (MAX_WIDTH_EMU, cy * MAX_WIDTH_EMU / cx)
}

fn drawing_run(relationship_id: &str, id: usize, name: &str, cx: u64, cy: u64) -> String {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    format!(
        "<w:r><w:drawing>\
         <wp:inline xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{doc_id}\" name=\"Picture {id}\"/>\
         <a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
         <a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"{file}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" r:embed=\"{rid}\"/>\
         <a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>",
        cx = cx,
        cy = cy,
        doc_id = 5000 + id,
        id = id,
        file = escape(file_name),
        rid = relationship_id,
    )
}
