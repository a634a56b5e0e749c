//! Header and footer field substitution.

use super::scan::{scan_part, splice, ScanScope};
use super::xml::{paragraph, paragraph_properties, run, RunStyle};
use crate::error::Result;
use crate::model::{HeaderField, ReportConfig};
use log::debug;

/// Whether an archive member is a header or footer part.
pub fn is_header_footer_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    (file.starts_with("header") || file.starts_with("footer"))
        && file.ends_with(".xml")
        && !file.contains('/')
}

/// Value printed for a field.
pub fn field_value(field: HeaderField, config: &ReportConfig) -> &str {
    match field {
        HeaderField::Title => &config.title,
        HeaderField::ReportNumber => config.bare_report_number(),
        HeaderField::Revision => &config.revision,
        HeaderField::DocumentOwner => &config.document_owner,
    }
}

/// Replace field tokens in one header or footer part.
///
/// A paragraph holding a field is rewritten as a single run formatted for
/// the first field it contains. Returns the new XML and the fields found.
pub fn replace_fields(xml: &str, config: &ReportConfig) -> Result<(String, Vec<HeaderField>)> {
    let scan = scan_part(xml, ScanScope::All)?;
    let mut edits = Vec::new();
    let mut found = Vec::new();

    for span in &scan.paragraphs {
        let mut fields: Vec<(usize, HeaderField)> = HeaderField::ALL
            .iter()
            .filter_map(|f| span.text.find(f.token()).map(|at| (at, *f)))
            .collect();
        if fields.is_empty() {
            continue;
        }
        fields.sort_by_key(|(at, _)| *at);

        let mut text = span.text.clone();
        for (_, field) in &fields {
            text = text.replace(field.token(), field_value(*field, config));
            if !found.contains(field) {
                found.push(*field);
            }
        }
        let first = fields[0].1;
        let mut style = RunStyle::body().sized(first.font_size());
        if first.bold() {
            style = style.bold();
        }
        debug!("Header field {} -> {:?}", first.token(), text);
        let original = &xml[span.start..span.end];
        edits.push((
            span.start,
            span.end,
            paragraph(paragraph_properties(original), &run(&text, style)),
        ));
    }
    Ok((splice(xml, edits), found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_part_names() {
        assert!(is_header_footer_part("word/header1.xml"));
        assert!(is_header_footer_part("word/footer.xml"));
        assert!(!is_header_footer_part("word/_rels/header1.xml.rels"));
        assert!(!is_header_footer_part("word/document.xml"));
    }

    #[test]
    fn test_replace_fields_in_table_cell() {
        let xml = r#"<w:hdr><w:tbl><w:tr><w:tc><w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t>[BK_</w:t></w:r><w:r><w:t>RPT]</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>Rev [BK_REV]</w:t></w:r></w:p></w:hdr>"#;
        let config = ReportConfig::new().with_report_number("00042").with_revision("B");
        let (out, found) = replace_fields(xml, &config).unwrap();

        assert_eq!(found, vec![HeaderField::ReportNumber, HeaderField::Revision]);
        assert!(out.contains("<w:pPr><w:jc w:val=\"right\"/></w:pPr>"));
        assert!(out.contains("<w:b/><w:color w:val=\"000000\"/><w:sz w:val=\"56\"/>"));
        assert!(out.contains(">00042</w:t>"));
        assert!(out.contains(">Rev B</w:t>"));
        assert!(!out.contains("[BK_"));
    }
}
