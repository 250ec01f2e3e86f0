//! Pipe-table detection.
//!
//! A row is table syntax only if a valid separator row immediately follows
//! the header row, so the driver buffers the header provisionally and asks
//! these helpers once the next line completes.

use crate::types::Alignment;

/// Split a pipe-delimited row into trimmed cells.
///
/// Returns `None` when the line is not row-shaped (no pipe outside inline
/// code, or nothing but whitespace). Leading/trailing pipes are optional.
pub fn parse_table_row(line: &str) -> Option<Vec<String>> {
    let s = line.trim();
    if s.is_empty() || !s.contains('|') {
        return None;
    }
    let bytes = s.as_bytes();
    let mut cells = Vec::new();
    let mut cell_start = 0usize;
    let mut in_code = false;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'`' => in_code = !in_code,
            b'|' if !in_code => {
                cells.push(s[cell_start..i].trim().to_string());
                cell_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    cells.push(s[cell_start..].trim().to_string());

    // Drop the empty edge cells produced by leading/trailing pipes.
    if cells.first().is_some_and(|c| c.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    if cells.is_empty() { None } else { Some(cells) }
}

/// Parse a separator row (`|---|:--:|`) into per-column alignments.
pub fn parse_table_separator(line: &str) -> Option<Vec<Alignment>> {
    let cells = parse_table_row(line)?;
    let mut alignments = Vec::with_capacity(cells.len());
    for cell in &cells {
        let left = cell.starts_with(':');
        let right = cell.ends_with(':');
        let dashes = cell.trim_matches(':');
        if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
            return None;
        }
        alignments.push(match (left, right) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::None,
        });
    }
    Some(alignments)
}

/// Whether a completed line could be a table header awaiting its separator.
pub fn is_header_candidate(line: &str) -> bool {
    // A separator-shaped line is never a header.
    parse_table_row(line).is_some() && parse_table_separator(line).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_split_on_pipes_with_optional_edges() {
        assert_eq!(
            parse_table_row("| a | b |"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            parse_table_row("a | b"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_table_row("no pipes here"), None);
    }

    #[test]
    fn pipes_inside_inline_code_do_not_split() {
        assert_eq!(
            parse_table_row("| `a|b` | c |"),
            Some(vec!["`a|b`".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn separator_alignment_parsing() {
        assert_eq!(
            parse_table_separator("|:--|:-:|--:|---|"),
            Some(vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::None
            ])
        );
        assert_eq!(parse_table_separator("| a | b |"), None);
        assert_eq!(parse_table_separator("|::|"), None);
    }

    #[test]
    fn header_candidates_exclude_separators() {
        assert!(is_header_candidate("| name | age |"));
        assert!(!is_header_candidate("|---|---|"));
        assert!(!is_header_candidate("plain text"));
    }
}
