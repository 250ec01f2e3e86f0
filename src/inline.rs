//! Inline emphasis detectors.
//!
//! These scan a *finished* line or block content; the driver only calls them
//! once no further input can extend the scanned text, so spans never need to
//! be retracted.

use crate::text::{Pattern, find_pattern};
use crate::types::{AnnotationKind, InlineSpan};

fn backtick_run_len(bytes: &[u8], at: usize) -> usize {
    let mut len = 0usize;
    while at + len < bytes.len() && bytes[at + len] == b'`' {
        len += 1;
    }
    len
}

fn is_escaped(bytes: &[u8], at: usize) -> bool {
    at > 0 && bytes[at - 1] == b'\\'
}

/// First inline code span at or after `from`: a backtick run closed by a run
/// of the same length. Returns `None` for an unterminated opener.
pub fn detect_inline_code(text: &str, from: usize) -> Option<InlineSpan> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] != b'`' || is_escaped(bytes, i) {
            i += 1;
            continue;
        }
        let open_len = backtick_run_len(bytes, i);
        let needle = "`".repeat(open_len);
        let mut search = i + open_len;
        while let Some((at, _)) = find_pattern(text, &Pattern::Literal(&needle), search) {
            // The closing run must be exactly as long as the opener.
            if backtick_run_len(bytes, at) == open_len && !is_escaped(bytes, at) {
                return Some(InlineSpan {
                    kind: AnnotationKind::Code,
                    range: i..at + open_len,
                });
            }
            search = at + backtick_run_len(bytes, at);
        }
        i += open_len;
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct Delim {
    ch: u8,
    len: usize,
    start: usize,
}

fn kind_for_delim(ch: u8, len: usize) -> AnnotationKind {
    match (ch, len) {
        (b'~', _) => AnnotationKind::Strikethrough,
        (_, 2) => AnnotationKind::Strong,
        _ => AnnotationKind::Emphasis,
    }
}

/// Scan `text` for bold, italic, strikethrough and inline code spans.
///
/// Spans are returned in close order, i.e. nesting resolved inside-out; an
/// inner pair always precedes the pair containing it. Ranges include the
/// delimiters and never partially overlap (containment only). Inline code is
/// opaque: emphasis markers inside a code span are ignored.
pub fn find_all_inline_emphasis(text: &str) -> Vec<InlineSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut stack: Vec<Delim> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if b == b'`' {
            if let Some(span) = detect_inline_code(text, i) {
                if span.range.start == i {
                    i = span.range.end;
                    spans.push(span);
                    continue;
                }
            }
            i += backtick_run_len(bytes, i);
            continue;
        }
        if b != b'*' && b != b'_' && b != b'~' {
            i += 1;
            continue;
        }

        let mut run = 0usize;
        while i + run < bytes.len() && bytes[i + run] == b {
            run += 1;
        }
        if b == b'~' && run != 2 {
            // Only `~~` delimits strikethrough.
            i += run;
            continue;
        }

        let prev_nonspace = i > 0 && !bytes[i - 1].is_ascii_whitespace();
        let next_nonspace = i + run < bytes.len() && !bytes[i + run].is_ascii_whitespace();

        // A run first closes as many openers as it can, innermost-first, so
        // `***x***` resolves to emphasis inside strong; whatever is left of
        // the run opens, double units before single.
        let mut rest = run;
        let mut unit_start = i;
        while rest > 0 {
            let matched = if prev_nonspace {
                stack.iter().rposition(|d| d.ch == b && d.len <= rest)
            } else {
                None
            };
            if let Some(pos) = matched {
                let opener = stack[pos];
                // Unmatched openers nested inside are discarded, not crossed.
                stack.truncate(pos);
                spans.push(InlineSpan {
                    kind: kind_for_delim(b, opener.len),
                    range: opener.start..unit_start + opener.len,
                });
                unit_start += opener.len;
                rest -= opener.len;
                continue;
            }
            if !next_nonspace {
                break;
            }
            let unit = if rest >= 2 { 2 } else { 1 };
            stack.push(Delim {
                ch: b,
                len: unit,
                start: unit_start,
            });
            unit_start += unit;
            rest -= unit;
        }
        i += run;
    }

    spans
}

fn first_span_of(text: &str, from: usize, kind: AnnotationKind) -> Option<InlineSpan> {
    find_all_inline_emphasis(text)
        .into_iter()
        .filter(|s| s.kind == kind && s.range.start >= from)
        .min_by_key(|s| s.range.start)
}

pub fn detect_strong(text: &str, from: usize) -> Option<InlineSpan> {
    first_span_of(text, from, AnnotationKind::Strong)
}

pub fn detect_emphasis(text: &str, from: usize) -> Option<InlineSpan> {
    first_span_of(text, from, AnnotationKind::Emphasis)
}

pub fn detect_strikethrough(text: &str, from: usize) -> Option<InlineSpan> {
    first_span_of(text, from, AnnotationKind::Strikethrough)
}

/// Inline links `[text](destination)`, with their destinations.
pub fn find_inline_links(text: &str) -> Vec<(InlineSpan, String)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] != b'[' || is_escaped(bytes, i) {
            i += 1;
            continue;
        }
        let Some((close, _)) = find_pattern(text, &Pattern::Literal("]("), i + 1) else {
            break;
        };
        let Some((end, _)) = find_pattern(text, &Pattern::Literal(")"), close + 2) else {
            i = close + 2;
            continue;
        };
        let url = text[close + 2..end].trim();
        if url.contains('\n') {
            i = close + 2;
            continue;
        }
        out.push((
            InlineSpan {
                kind: AnnotationKind::Link,
                range: i..end + 1,
            },
            url.to_string(),
        ));
        i = end + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_code_requires_equal_length_closer() {
        let s = detect_inline_code("a ``x`y`` b", 0).unwrap();
        assert_eq!(s.range, 2..9);
        assert!(detect_inline_code("open `never", 0).is_none());
    }

    #[test]
    fn nested_strong_and_emphasis_close_inside_out() {
        let spans = find_all_inline_emphasis("**bold *and italic* text**");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, AnnotationKind::Emphasis);
        assert_eq!(spans[0].range, 7..19);
        assert_eq!(spans[1].kind, AnnotationKind::Strong);
        assert_eq!(spans[1].range, 0..26);
    }

    #[test]
    fn triple_asterisk_yields_emphasis_inside_strong() {
        let spans = find_all_inline_emphasis("***x***");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, AnnotationKind::Emphasis);
        assert_eq!(spans[0].range, 2..5);
        assert_eq!(spans[1].kind, AnnotationKind::Strong);
        assert_eq!(spans[1].range, 0..7);
    }

    #[test]
    fn strikethrough_and_code_are_found() {
        let spans = find_all_inline_emphasis("~~gone~~ and `code`");
        assert_eq!(spans[0].kind, AnnotationKind::Strikethrough);
        assert_eq!(spans[0].range, 0..8);
        assert_eq!(spans[1].kind, AnnotationKind::Code);
        assert_eq!(spans[1].range, 13..19);
    }

    #[test]
    fn emphasis_markers_inside_code_are_opaque() {
        let spans = find_all_inline_emphasis("`*not em*`");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, AnnotationKind::Code);
    }

    #[test]
    fn underscore_variants_match() {
        assert!(detect_strong("__b__", 0).is_some());
        assert!(detect_emphasis("_i_", 0).is_some());
        assert!(detect_strikethrough("~~x~~", 0).is_some());
    }

    #[test]
    fn links_carry_destinations() {
        let links = find_inline_links("see [docs](https://example.com) now");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0.range, 4..31);
        assert_eq!(links[0].1, "https://example.com");
    }
}
