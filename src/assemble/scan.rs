//! Paragraph locations inside WordprocessingML parts.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A paragraph's byte range in its part and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSpan {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Which paragraphs a scan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanScope {
    /// Direct children of `w:body`
    BodyChildren,
    /// Every outermost paragraph, including those inside tables
    All,
}

/// Result of scanning one part.
#[derive(Debug, Clone, Default)]
pub struct PartScan {
    pub paragraphs: Vec<ParagraphSpan>,
    /// Where appended body content goes: the final `w:sectPr` or `</w:body>`
    pub append_at: Option<usize>,
}

/// Locate paragraphs in a part.
pub fn scan_part(xml: &str, scope: ScanScope) -> Result<PartScan> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut scan = PartScan::default();
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut open: Option<(usize, String)> = None;
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        let before = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| Error::Xml(format!("at position {}: {}", reader.buffer_position(), e)))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"w:body" => body_depth = Some(depth),
                    b"w:p" => {
                        let eligible = match scope {
                            ScanScope::All => true,
                            ScanScope::BodyChildren => body_depth == Some(depth - 1),
                        };
                        if paragraph_depth == 0 && eligible {
                            open = Some((before, String::new()));
                        }
                        paragraph_depth += 1;
                    }
                    b"w:sectPr" if body_depth == Some(depth - 1) => {
                        scan.append_at = Some(before);
                    }
                    b"w:t" => in_text = true,
                    _ => {}
                }
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:sectPr" if body_depth == Some(depth) => scan.append_at = Some(before),
                b"w:tab" => push(&mut open, "\t"),
                b"w:br" | b"w:cr" => push(&mut open, "\n"),
                _ => {}
            },
            Event::End(e) => {
                match e.name().as_ref() {
                    b"w:p" => {
                        paragraph_depth = paragraph_depth.saturating_sub(1);
                        if paragraph_depth == 0 {
                            if let Some((start, text)) = open.take() {
                                scan.paragraphs.push(ParagraphSpan {
                                    start,
                                    end: reader.buffer_position(),
                                    text,
                                });
                            }
                        }
                    }
                    b"w:body" => {
                        if scan.append_at.is_none() {
                            scan.append_at = Some(before);
                        }
                        body_depth = None;
                    }
                    b"w:t" => in_text = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) if in_text => {
                let text = e.unescape()?;
                push(&mut open, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(scan)
}

fn push(open: &mut Option<(usize, String)>, text: &str) {
    if let Some((_, buffer)) = open.as_mut() {
        buffer.push_str(text);
    }
}

/// Apply non-overlapping `(start, end, replacement)` edits.
pub fn splice(xml: &str, mut edits: Vec<(usize, usize, String)>) -> String {
    edits.sort_by_key(|(start, _, _)| *start);
    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (start, end, replacement) in edits {
        if start < cursor {
            continue;
        }
        out.push_str(&xml[cursor..start]);
        out.push_str(&replacement);
        cursor = end;
    }
    out.push_str(&xml[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"<w:document><w:body><w:p><w:r><w:t>[BK_SCOPE_TEXT]</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t></w:r></w:p><w:sectPr><w:pgSz/></w:sectPr></w:body></w:document>"#;

    #[test]
    fn test_body_children_only() {
        let scan = scan_part(BODY, ScanScope::BodyChildren).unwrap();
        let texts: Vec<&str> = scan.paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["[BK_SCOPE_TEXT]", "a\tb"]);
        let first = &scan.paragraphs[0];
        assert!(BODY[first.start..first.end].starts_with("<w:p>"));
        assert!(BODY[first.start..first.end].ends_with("</w:p>"));
        assert!(BODY[scan.append_at.unwrap()..].starts_with("<w:sectPr>"));
    }

    #[test]
    fn test_all_includes_table_cells() {
        let scan = scan_part(BODY, ScanScope::All).unwrap();
        assert_eq!(scan.paragraphs.len(), 3);
        assert_eq!(scan.paragraphs[1].text, "cell");
    }

    #[test]
    fn test_append_before_body_end_without_sectpr() {
        let xml = "<w:document><w:body><w:p/></w:body></w:document>";
        let scan = scan_part(xml, ScanScope::BodyChildren).unwrap();
        assert!(xml[scan.append_at.unwrap()..].starts_with("</w:body>"));
    }

    #[test]
    fn test_splice() {
        let out = splice("0123456789", vec![(6, 8, "x".into()), (1, 3, "ab".into())]);
        assert_eq!(out, "0ab345x89");
    }
}
