//! Pure text helpers shared by the detectors and the driver.

use std::borrow::Cow;

use regex::Regex;

/// A search pattern for [`find_pattern`].
///
/// Detectors stay agnostic to which kind they use: literal needles go through
/// `memchr::memmem`, regex patterns through the `regex` crate.
#[derive(Debug, Clone)]
pub enum Pattern<'p> {
    Literal(&'p str),
    Regex(&'p Regex),
}

/// Find the next match of `pattern` in `text` at or after `from`.
///
/// Returns the absolute byte offset of the match and the matched text.
pub fn find_pattern<'t>(text: &'t str, pattern: &Pattern<'_>, from: usize) -> Option<(usize, &'t str)> {
    if from > text.len() {
        return None;
    }
    match pattern {
        Pattern::Literal(needle) => {
            let rel = memchr::memmem::find(text[from..].as_bytes(), needle.as_bytes())?;
            let start = from + rel;
            Some((start, &text[start..start + needle.len()]))
        }
        Pattern::Regex(re) => {
            let m = re.find_at(text, from)?;
            Some((m.start(), m.as_str()))
        }
    }
}

/// Split `text[start..end]` into lines on `\n`.
///
/// An empty range yields a single empty line, never an empty vector; callers
/// rely on at-least-one-element.
pub fn extract_lines(text: &str, start: usize, end: usize) -> Vec<&str> {
    let end = end.min(text.len());
    if start >= end {
        return vec![""];
    }
    text[start..end].split('\n').collect()
}

pub fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Number of leading space/tab characters on `line`.
pub fn count_leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| is_whitespace(*c)).count()
}

/// Strip the common leading whitespace from `lines`.
///
/// The minimum indent is computed over non-blank lines only; blank lines pass
/// through unchanged. Zero-indent input is returned as-is.
pub fn dedent_lines(lines: &[&str]) -> Vec<String> {
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| count_leading_whitespace(l))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                (*l).to_string()
            } else {
                strip_indent(l, min_indent).to_string()
            }
        })
        .collect()
}

/// Remove up to `n` leading space/tab characters from `line`.
pub fn strip_indent(line: &str, n: usize) -> &str {
    let mut stripped = 0usize;
    let mut rest = line;
    while stripped < n {
        let Some(next) = rest.strip_prefix([' ', '\t']) else {
            break;
        };
        rest = next;
        stripped += 1;
    }
    rest
}

/// Escape all regex metacharacters in `text` so it matches literally.
pub fn escape_regex(text: &str) -> String {
    regex::escape(text)
}

/// Build a line-anchored pattern matching a literal end marker.
///
/// The marker may carry arbitrary user-supplied characters (e.g. `~~~~`), so
/// it is escaped in full; up to 3 leading spaces and trailing whitespace are
/// tolerated, matching the corresponding start-marker rules.
pub fn create_end_marker_regex(marker: &str) -> Regex {
    let pattern = format!(r"(?m)^ {{0,3}}{}[ \t]*$", escape_regex(marker));
    // The only variable part is escaped, so compilation cannot fail.
    Regex::new(&pattern).expect("escaped end marker pattern")
}

/// Collapse `\r\n` and bare `\r` to `\n`.
///
/// The streaming driver additionally tracks a trailing `\r` across chunk
/// boundaries; this helper is the per-chunk normalization step.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\r' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'\n') {
            chars.next();
        }
        out.push('\n');
    }
    Cow::Owned(out)
}

/// Parsed code fence info string: language plus `key=value` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlockMetadata {
    pub language: Option<String>,
    pub attrs: Vec<(String, String)>,
}

/// Split a fence info string into a language token and `key=value` pairs.
///
/// Streaming input is often truncated mid-token, so malformed tokens (missing
/// `=`, multiple `=`, empty key) are silently dropped rather than errored.
pub fn parse_code_block_metadata(info: &str) -> CodeBlockMetadata {
    let mut tokens = info.split_whitespace();
    let language = tokens.next().map(|t| t.to_string());
    let mut attrs = Vec::new();
    for token in tokens {
        let mut parts = token.splitn(2, '=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        if key.is_empty() || value.contains('=') {
            continue;
        }
        attrs.push((key.to_string(), value.to_string()));
    }
    CodeBlockMetadata { language, attrs }
}
