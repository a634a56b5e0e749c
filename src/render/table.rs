//! Pipe-delimited markdown tables: detection, parsing and rendering.

use crate::model::ChronologyEntry;

/// Column headers of the test execution chronology.
pub const CHRONOLOGY_HEADERS: [&str; 4] = ["Step", "Start Date", "End Date", "Location"];

/// Header terms that mark a protocol table as a scope table.
const SCOPE_TABLE_TERMS: [&str; 4] = ["doc id", "req id", "requirement", "document id"];

/// A markdown table: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownTable {
    pub headers: Vec<String>,
    /// Data rows; cells may be empty
    pub rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    /// Create a table with headers and no rows.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row.
    pub fn with_row<S: Into<String>>(mut self, row: impl IntoIterator<Item = S>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Number of columns, taken from the header row.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as pipe-delimited markdown.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        push_row(&mut output, &self.headers);
        output.push('|');
        for _ in &self.headers {
            output.push_str(" --- |");
        }
        output.push('\n');
        for row in &self.rows {
            push_row(&mut output, row);
        }
        output.trim_end().to_string()
    }
}

fn push_row(output: &mut String, cells: &[String]) {
    output.push('|');
    for cell in cells {
        output.push_str(&format!(" {} |", cell.replace('\n', " ").trim()));
    }
    output.push('\n');
}

/// Ordered piece of mixed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Table(MarkdownTable),
}

/// A line that starts and ends with a pipe.
pub fn is_table_line(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 2 && line.starts_with('|') && line.ends_with('|')
}

/// A table line made only of dashes, colons and spaces.
pub fn is_separator_line(line: &str) -> bool {
    is_table_line(line)
        && line.contains('-')
        && split_cells(line)
            .iter()
            .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Two or more pipe-delimited lines including a separator.
pub fn contains_markdown_table(text: &str) -> bool {
    let table_lines = text.lines().filter(|l| is_table_line(l)).count();
    table_lines >= 2 && text.lines().any(is_separator_line)
}

fn table_from_lines(lines: &[&str]) -> Option<MarkdownTable> {
    let (header, rest) = lines.split_first()?;
    if rest.is_empty() || !rest.iter().any(|l| is_separator_line(l)) {
        return None;
    }
    let rows = rest
        .iter()
        .filter(|l| !is_separator_line(l))
        .map(|l| split_cells(l))
        .collect();
    Some(MarkdownTable {
        headers: split_cells(header),
        rows,
    })
}

/// Parse the first markdown table in `text`.
pub fn parse_markdown_table(text: &str) -> Option<MarkdownTable> {
    segment_content(text).into_iter().find_map(|s| match s {
        Segment::Table(table) => Some(table),
        Segment::Text(_) => None,
    })
}

/// Split content into text and table segments, keeping their order.
///
/// A run of table lines without a separator stays text.
pub fn segment_content(text: &str) -> Vec<Segment> {
    let lines: Vec<&str> = text.lines().collect();
    let mut segments = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !is_table_line(lines[i]) {
            prose.push(lines[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && is_table_line(lines[i]) {
            i += 1;
        }
        match table_from_lines(&lines[start..i]) {
            Some(table) => {
                flush_text(&mut segments, &mut prose);
                segments.push(Segment::Table(table));
            }
            None => prose.extend_from_slice(&lines[start..i]),
        }
    }
    flush_text(&mut segments, &mut prose);
    segments
}

fn flush_text(segments: &mut Vec<Segment>, prose: &mut Vec<&str>) {
    let text = prose.join("\n").trim().to_string();
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    prose.clear();
}

/// Content with every table removed.
pub fn extract_non_table_text(text: &str) -> String {
    segment_content(text)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Text(t) => Some(t),
            Segment::Table(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scope tables found in protocol text, as markdown.
///
/// A scope table has a header, a separator and at least one data row, and
/// its header names document or requirement identifiers.
pub fn extract_protocol_tables(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tables = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !is_table_line(lines[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && is_table_line(lines[i]) {
            i += 1;
        }
        let block = &lines[start..i];
        let header = block[0].to_lowercase();
        let has_data = block.iter().skip(1).any(|l| !is_separator_line(l));
        if block.len() >= 3
            && is_separator_line(block[1])
            && has_data
            && SCOPE_TABLE_TERMS.iter().any(|t| header.contains(t))
        {
            tables.push(block.iter().map(|l| l.trim()).collect::<Vec<_>>().join("\n"));
        }
    }
    tables
}

/// Test execution chronology as a markdown table.
///
/// An empty list yields a single blank row.
pub fn chronology_table(entries: &[ChronologyEntry]) -> String {
    let mut out = String::from("| Step | Start Date | End Date | Location |\n");
    out.push_str("|------|------------|----------|----------|\n");
    if entries.is_empty() {
        out.push_str("|      |            |          |          |");
        return out;
    }
    for entry in entries {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            entry.step.trim(),
            entry.start_date.trim(),
            entry.end_date.trim(),
            entry.location.trim()
        ));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_table() {
        assert!(contains_markdown_table("| a | b |\n| --- | --- |\n| 1 | 2 |"));
        assert!(!contains_markdown_table("| a | b |\n| 1 | 2 |"));
        assert!(!contains_markdown_table("plain text"));
    }

    #[test]
    fn test_parse_keeps_empty_cells() {
        let table = parse_markdown_table("Intro\n| A | B | C |\n|---|:-:|---|\n| 1 |  | 3 |\n|  |  |  |").unwrap();
        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.rows, vec![vec!["1", "", "3"], vec!["", "", ""]]);
    }

    #[test]
    fn test_segments_preserve_order() {
        let text = "Before\n| H |\n| --- |\n| v |\nAfter";
        let segments = segment_content(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("Before".into()));
        assert!(matches!(&segments[1], Segment::Table(t) if t.rows == vec![vec!["v".to_string()]]));
        assert_eq!(segments[2], Segment::Text("After".into()));
        assert_eq!(extract_non_table_text(text), "Before\nAfter");
    }

    #[test]
    fn test_table_without_separator_stays_text() {
        let segments = segment_content("| a |\n| b |");
        assert_eq!(segments, vec![Segment::Text("| a |\n| b |".into())]);
    }

    #[test]
    fn test_to_markdown() {
        let table = MarkdownTable::new(["REQ ID", "Result"]).with_row(["R-1", ""]);
        assert_eq!(table.to_markdown(), "| REQ ID | Result |\n| --- | --- |\n| R-1 |  |");
        assert_eq!(parse_markdown_table(&table.to_markdown()).unwrap(), table);
    }

    #[test]
    fn test_extract_protocol_tables() {
        let text = "Scope\n| Doc ID | Title |\n| --- | --- |\n| D-1 | Spec |\n\n| Step | Action |\n| --- | --- |\n| 1 | Go |";
        let tables = extract_protocol_tables(text);
        assert_eq!(tables, vec!["| Doc ID | Title |\n| --- | --- |\n| D-1 | Spec |"]);
    }

    #[test]
    fn test_chronology_table() {
        assert_eq!(
            chronology_table(&[]),
            "| Step | Start Date | End Date | Location |\n|------|------------|----------|----------|\n|      |            |          |          |"
        );
        let entries = vec![ChronologyEntry {
            step: "Conditioning".into(),
            start_date: "2024-01-02".into(),
            end_date: "2024-01-05".into(),
            location: "Lab 3".into(),
        }];
        let table = parse_markdown_table(&chronology_table(&entries)).unwrap();
        assert_eq!(table.headers, CHRONOLOGY_HEADERS);
        assert_eq!(table.rows[0], vec!["Conditioning", "2024-01-02", "2024-01-05", "Lab 3"]);
    }
}
