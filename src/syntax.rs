//! Block start detectors.
//!
//! Each detector is a pure function over one line of input: it either
//! recognizes the start of its construct and returns a [`DetectedBlock`], or
//! returns `None`. Lifecycle (extending and closing the block) is owned by
//! the driver; detectors never mutate state.

use regex::Regex;

use crate::text::{count_leading_whitespace, escape_regex, parse_code_block_metadata};
use crate::types::{BlockKind, BlockMeta};

/// A recognized block start.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBlock {
    pub kind: BlockKind,
    /// The literal text that opened the block (fence run, `#` run, `>`, ...).
    pub start_marker: String,
    /// The literal marker expected to close the block, for fenced kinds.
    pub end_marker: Option<String>,
    pub meta: Option<BlockMeta>,
    /// Leading whitespace before the marker; fenced content is stored with
    /// this artificial indentation stripped.
    pub indent: usize,
    /// Byte offset within the line at which block content begins.
    pub content_offset: usize,
}

pub fn is_blank_line(line: &str) -> bool {
    line.trim().is_empty()
}

fn strip_up_to_three_spaces(line: &str) -> (&str, usize) {
    let mut s = line;
    let mut spaces = 0usize;
    while spaces < 3 && s.starts_with(' ') {
        s = &s[1..];
        spaces += 1;
    }
    (s, spaces)
}

/// Triple-backtick/tilde fence. The info string becomes `BlockMeta::CodeFence`.
pub fn detect_code_fence(line: &str) -> Option<DetectedBlock> {
    let (s, indent) = strip_up_to_three_spaces(line);
    let bytes = s.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    let fence_char = bytes[0] as char;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let mut fence_len = 0usize;
    while fence_len < bytes.len() && bytes[fence_len] == bytes[0] {
        fence_len += 1;
    }
    if fence_len < 3 {
        return None;
    }
    let info = s[fence_len..].trim();
    let meta = parse_code_block_metadata(info);
    let marker: String = std::iter::repeat(fence_char).take(fence_len).collect();
    Some(DetectedBlock {
        kind: BlockKind::CodeFence,
        end_marker: Some(marker.clone()),
        start_marker: marker,
        meta: Some(BlockMeta::CodeFence {
            language: meta.language,
            attrs: meta.attrs,
        }),
        indent,
        content_offset: line.len(),
    })
}

/// Line-anchored close pattern for a fence: the opened run or longer, alone
/// on its line. Composed from [`escape_regex`] so arbitrary fence strings are
/// matched literally.
pub fn fence_close_regex(marker: &str) -> Regex {
    let last = marker.chars().last().unwrap_or('`');
    let pattern = format!(
        r"(?m)^ {{0,3}}{}{}*[ \t]*$",
        escape_regex(marker),
        escape_regex(&last.to_string())
    );
    Regex::new(&pattern).expect("escaped fence close pattern")
}

/// ATX heading: a `#` run (1-6) at line start followed by whitespace or EOL.
pub fn detect_heading(line: &str) -> Option<DetectedBlock> {
    let (s, indent) = strip_up_to_three_spaces(line);
    let bytes = s.as_bytes();
    let mut level = 0usize;
    while level < bytes.len() && bytes[level] == b'#' {
        level += 1;
    }
    if level == 0 || level > 6 {
        return None;
    }
    match bytes.get(level) {
        None => {}
        Some(b' ') | Some(b'\t') => {}
        Some(_) => return None,
    }
    let mut content_offset = indent + level;
    let rest = &s[level..];
    content_offset += rest.len() - rest.trim_start_matches([' ', '\t']).len();
    Some(DetectedBlock {
        kind: BlockKind::Heading,
        start_marker: s[..level].to_string(),
        end_marker: None,
        meta: Some(BlockMeta::Heading { level: level as u8 }),
        indent,
        content_offset,
    })
}

/// A line of 3+ repeated `-`, `*` or `_` (spaces/tabs between markers allowed)
/// and nothing else. Only decidable on a completed line.
pub fn detect_thematic_break(line: &str) -> Option<DetectedBlock> {
    let (s, indent) = strip_up_to_three_spaces(line);
    let s = s.trim_end_matches([' ', '\t']);
    let mut chars = s.chars();
    let first = chars.next()?;
    if first != '-' && first != '*' && first != '_' {
        return None;
    }
    let mut count = 1usize;
    for c in chars {
        if c == first {
            count += 1;
            continue;
        }
        if c == ' ' || c == '\t' {
            continue;
        }
        return None;
    }
    if count < 3 {
        return None;
    }
    Some(DetectedBlock {
        kind: BlockKind::ThematicBreak,
        start_marker: first.to_string().repeat(3),
        end_marker: None,
        meta: None,
        indent,
        content_offset: 0,
    })
}

/// `$$` fence. A line that also carries the closing `$$` is a single-line
/// math block; [`math_single_line_content`] extracts its body.
pub fn detect_math_block(line: &str) -> Option<DetectedBlock> {
    let (s, indent) = strip_up_to_three_spaces(line);
    if !s.starts_with("$$") {
        return None;
    }
    Some(DetectedBlock {
        kind: BlockKind::MathBlock,
        start_marker: "$$".to_string(),
        end_marker: Some("$$".to_string()),
        meta: None,
        indent,
        content_offset: line.len(),
    })
}

/// Body of a math block that opens and closes on the same line, if it does.
pub fn math_single_line_content(line: &str) -> Option<&str> {
    let (s, _) = strip_up_to_three_spaces(line);
    let rest = s.strip_prefix("$$")?;
    let rest = rest.trim_end_matches([' ', '\t']);
    let inner = rest.strip_suffix("$$")?;
    if inner.is_empty() && rest.len() < 2 {
        return None;
    }
    Some(inner.trim())
}

/// `>` at line start. Lazy continuation is decided by the driver, which knows
/// whether a quote is currently open.
pub fn detect_blockquote(line: &str) -> Option<DetectedBlock> {
    let (s, indent) = strip_up_to_three_spaces(line);
    if !s.starts_with('>') {
        return None;
    }
    let mut content_offset = indent + 1;
    if s[1..].starts_with(' ') {
        content_offset += 1;
    }
    Some(DetectedBlock {
        kind: BlockKind::BlockQuote,
        start_marker: ">".to_string(),
        end_marker: None,
        meta: None,
        indent,
        content_offset,
    })
}

/// Ordered (`1.` / `1)`) or unordered (`-` / `*` / `+`) list item marker.
pub fn detect_list_item(line: &str) -> Option<DetectedBlock> {
    let indent = count_leading_whitespace(line);
    let s = line.trim_start();
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (marker, ordered) = match bytes[0] {
        b'-' | b'+' | b'*' => {
            if bytes[1] != b' ' && bytes[1] != b'\t' {
                return None;
            }
            (s[..1].to_string(), false)
        }
        b'0'..=b'9' => {
            let mut i = 0usize;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 >= bytes.len() {
                return None;
            }
            if bytes[i] != b'.' && bytes[i] != b')' {
                return None;
            }
            if bytes[i + 1] != b' ' && bytes[i + 1] != b'\t' {
                return None;
            }
            (s[..i + 1].to_string(), true)
        }
        _ => return None,
    };
    Some(DetectedBlock {
        kind: BlockKind::List,
        start_marker: marker,
        end_marker: None,
        meta: Some(BlockMeta::List { ordered }),
        indent,
        content_offset: 0,
    })
}

/// Continuation line for an open list: indented content or a further item.
pub fn is_list_continuation(line: &str) -> bool {
    if detect_list_item(line).is_some() {
        return true;
    }
    if line.starts_with('\t') {
        return true;
    }
    count_leading_whitespace(line) >= 2
}

/// `[label]: destination` reference definition, single line only.
pub fn detect_link_reference(line: &str) -> Option<DetectedBlock> {
    let (label, _url) = parse_link_reference(line)?;
    Some(DetectedBlock {
        kind: BlockKind::LinkReference,
        start_marker: format!("[{label}]:"),
        end_marker: None,
        meta: None,
        indent: count_leading_whitespace(line),
        content_offset: 0,
    })
}

/// Split a reference definition line into `(label, destination)`.
pub fn parse_link_reference(line: &str) -> Option<(&str, &str)> {
    let (s, _) = strip_up_to_three_spaces(line);
    if !s.starts_with('[') {
        return None;
    }
    let close = s.find(']')?;
    if close == 1 {
        return None;
    }
    let label = &s[1..close];
    if label.starts_with('^') || label.contains('\n') {
        return None;
    }
    let rest = s.get(close + 1..)?;
    let rest = rest.strip_prefix(':')?;
    let url = rest.trim();
    if url.is_empty() || url.contains(char::is_whitespace) {
        return None;
    }
    Some((label, url))
}

/// Whether a partial tail line could still grow into a block start marker.
///
/// The driver holds such prefixes unconsumed instead of guessing; nothing
/// speculative crosses a `feed` boundary. Once a line stops matching here it
/// is committed to whatever construct it unambiguously is.
pub fn ambiguous_block_prefix(partial: &str) -> bool {
    let (s, spaces) = strip_up_to_three_spaces(partial);
    if s.is_empty() {
        // Nothing but (up to 3) spaces so far.
        return spaces == partial.len();
    }
    let bytes = s.as_bytes();
    match bytes[0] {
        // Could still become a heading run; `#x` is already a paragraph.
        b'#' => bytes.iter().all(|b| *b == b'#') && bytes.len() <= 6,
        // Fence run shorter than 3 may still become one.
        b'`' | b'~' => bytes.iter().all(|b| *b == bytes[0]) && bytes.len() < 3,
        // A lone `$` may become `$$`.
        b'$' => bytes.len() < 2,
        // `-`/`*`/`_` runs may become a thematic break or a list marker;
        // spaces between markers keep them ambiguous ("- -" vs "- - item").
        b'-' | b'*' | b'_' => bytes.iter().all(|b| *b == bytes[0] || *b == b' '),
        b'+' => bytes.len() < 2,
        // Digits may become an ordered list marker.
        b'0'..=b'9' => {
            let mut i = 0usize;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            match bytes.get(i) {
                None => true,
                Some(b'.') | Some(b')') => i + 1 >= bytes.len(),
                Some(_) => false,
            }
        }
        // Possible link reference or table row; both are line-scoped.
        b'[' | b'|' => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_detection_captures_language_and_attrs() {
        let d = detect_code_fence("```python title=demo").unwrap();
        assert_eq!(d.kind, BlockKind::CodeFence);
        assert_eq!(d.start_marker, "```");
        match d.meta.unwrap() {
            BlockMeta::CodeFence { language, attrs } => {
                assert_eq!(language.as_deref(), Some("python"));
                assert_eq!(attrs, vec![("title".to_string(), "demo".to_string())]);
            }
            other => panic!("unexpected meta {other:?}"),
        }
    }

    #[test]
    fn fence_close_accepts_longer_runs_only() {
        let re = fence_close_regex("```");
        assert!(re.is_match("```"));
        assert!(re.is_match("`````"));
        assert!(re.is_match("  ``` "));
        assert!(!re.is_match("``"));
        assert!(!re.is_match("``` rust"));
    }

    #[test]
    fn heading_requires_space_after_run() {
        assert!(detect_heading("# Hello").is_some());
        assert!(detect_heading("###").is_some());
        assert!(detect_heading("#hello").is_none());
        assert!(detect_heading("####### seven").is_none());
    }

    #[test]
    fn thematic_break_needs_three_markers_and_nothing_else() {
        assert!(detect_thematic_break("---").is_some());
        assert!(detect_thematic_break("* * *").is_some());
        assert!(detect_thematic_break("--").is_none());
        assert!(detect_thematic_break("--- x").is_none());
    }

    #[test]
    fn link_reference_is_single_line_with_destination() {
        assert_eq!(
            parse_link_reference("[docs]: https://example.com"),
            Some(("docs", "https://example.com"))
        );
        assert!(parse_link_reference("[^fn]: note").is_none());
        assert!(parse_link_reference("[docs]:").is_none());
    }

    #[test]
    fn ambiguous_prefixes_are_held() {
        for p in ["", "#", "##", "``", "~~", "$", "-", "--", "**", "1", "12.", "[", "|"] {
            assert!(ambiguous_block_prefix(p), "expected ambiguous: {p:?}");
        }
        for p in ["#x", "```", "w", "$$", "- x", "1. x", "hello"] {
            assert!(!ambiguous_block_prefix(p), "expected decided: {p:?}");
        }
    }

    #[test]
    fn single_line_math_extracts_body() {
        assert_eq!(math_single_line_content("$$x+1$$"), Some("x+1"));
        assert_eq!(math_single_line_content("$$ E = mc^2 $$"), Some("E = mc^2"));
        assert_eq!(math_single_line_content("$$x+1"), None);
    }
}
