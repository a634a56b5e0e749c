//! WordprocessingML fragments written into the template.

use crate::render::MarkdownTable;

/// Body font.
pub const FONT: &str = "Times New Roman";

/// Body text size in points.
pub const BODY_SIZE_PT: u32 = 11;

/// Escape text for element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Character formatting of a generated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStyle {
    pub size_pt: u32,
    pub bold: bool,
    /// Hex RGB without `#`
    pub color: &'static str,
}

impl RunStyle {
    /// Times New Roman 11pt black.
    pub fn body() -> Self {
        Self {
            size_pt: BODY_SIZE_PT,
            bold: false,
            color: "000000",
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn sized(mut self, size_pt: u32) -> Self {
        self.size_pt = size_pt;
        self
    }

    pub fn colored(mut self, color: &'static str) -> Self {
        self.color = color;
        self
    }

    fn properties(&self) -> String {
        // w:sz is in half-points
        let half_points = self.size_pt * 2;
        format!(
            "<w:rPr><w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>{bold}\
             <w:color w:val=\"{color}\"/><w:sz w:val=\"{hp}\"/><w:szCs w:val=\"{hp}\"/></w:rPr>",
            font = FONT,
            bold = if self.bold { "<w:b/>" } else { "" },
            color = self.color,
            hp = half_points,
        )
    }
}

impl Default for RunStyle {
    fn default() -> Self {
        Self::body()
    }
}

/// A run of text; newlines become line breaks.
pub fn run(text: &str, style: RunStyle) -> String {
    let mut out = format!("<w:r>{}", style.properties());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        if !line.is_empty() {
            out.push_str(&format!(
                "<w:t xml:space=\"preserve\">{}</w:t>",
                escape(line)
            ));
        }
    }
    out.push_str("</w:r>");
    out
}

/// A paragraph holding `runs`, with optional paragraph properties.
pub fn paragraph(properties: Option<&str>, runs: &str) -> String {
    format!("<w:p>{}{}</w:p>", properties.unwrap_or_default(), runs)
}

/// A paragraph with one body-styled run.
pub fn text_paragraph(properties: Option<&str>, text: &str) -> String {
    if text.is_empty() {
        return paragraph(properties, "");
    }
    paragraph(properties, &run(text, RunStyle::body()))
}

/// Native table built from a markdown table.
///
/// Rows shorter than the header are padded with empty cells; longer rows are
/// cut to the header width.
pub fn table(table: &MarkdownTable) -> String {
    let columns = table.column_count().max(1);
    let mut out = String::from(
        "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/><w:tblW w:w=\"0\" w:type=\"auto\"/>\
         <w:tblBorders>",
    );
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        out.push_str(&format!(
            "<w:{} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            edge
        ));
    }
    out.push_str("</w:tblBorders><w:tblLook w:val=\"04A0\"/></w:tblPr><w:tblGrid>");
    for _ in 0..columns {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    out.push_str(&table_row(&table.headers, columns, RunStyle::body().bold()));
    for row in &table.rows {
        out.push_str(&table_row(row, columns, RunStyle::body()));
    }
    out.push_str("</w:tbl>");
    out
}

fn table_row(cells: &[String], columns: usize, style: RunStyle) -> String {
    let mut out = String::from("<w:tr>");
    for i in 0..columns {
        let text = cells.get(i).map(String::as_str).unwrap_or_default();
        let content = if text.is_empty() {
            String::new()
        } else {
            run(text, style)
        };
        out.push_str(&format!("<w:tc><w:tcPr><w:tcW w:w=\"0\" w:type=\"auto\"/></w:tcPr><w:p>{}</w:p></w:tc>", content));
    }
    out.push_str("</w:tr>");
    out
}

/// Paragraph properties of a paragraph's XML, if any.
pub fn paragraph_properties(paragraph_xml: &str) -> Option<&str> {
    let start = paragraph_xml.find("<w:pPr")?;
    let rest = &paragraph_xml[start..];
    if let Some(end) = rest.find("</w:pPr>") {
        return Some(&rest[..end + "</w:pPr>".len()]);
    }
    rest.find("/>").map(|end| &rest[..end + 2])
}
