#![allow(dead_code)]

use std::collections::HashMap;

use streamark::{BlockId, BlockKind, Options, ParseEvent, StreamParser};

/// Feed all chunks, finalize, and return every event in emission order.
pub fn run_chunks(chunks: impl IntoIterator<Item = String>, opts: Options) -> Vec<ParseEvent> {
    let parser = StreamParser::new(opts).unwrap();
    run_chunks_with_parser(chunks, parser)
}

pub fn run_chunks_with_parser(
    chunks: impl IntoIterator<Item = String>,
    mut parser: StreamParser,
) -> Vec<ParseEvent> {
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(parser.feed(&chunk));
    }
    events.extend(parser.finalize());
    assert_event_protocol(&events);
    events
}

/// Reduce an event stream to `(kind, final content)` per block, in close order.
pub fn final_blocks(events: &[ParseEvent]) -> Vec<(BlockKind, String)> {
    let mut kinds: HashMap<BlockId, BlockKind> = HashMap::new();
    let mut out = Vec::new();
    for e in events {
        match e {
            ParseEvent::Begin { id, kind, .. } => {
                kinds.insert(*id, *kind);
            }
            ParseEvent::End { id, content } => {
                out.push((kinds[id], content.clone()));
            }
            _ => {}
        }
    }
    out
}

pub fn collect_final_blocks(
    chunks: impl IntoIterator<Item = String>,
    opts: Options,
) -> Vec<(BlockKind, String)> {
    final_blocks(&run_chunks(chunks, opts))
}

/// Check the append-only event contract over a complete stream:
/// per id exactly one `Begin` first and one `End` last, nothing in between
/// after the `End`, deltas concatenating to the final content, annotation
/// ranges inside it, and ids handed out in increasing order.
pub fn assert_event_protocol(events: &[ParseEvent]) {
    #[derive(Default)]
    struct Acc {
        begun: bool,
        ended: bool,
        deltas: String,
        annotations: Vec<std::ops::Range<usize>>,
    }
    let mut acc: HashMap<BlockId, Acc> = HashMap::new();
    let mut last_begin = BlockId(0);

    for e in events {
        let a = acc.entry(e.id()).or_default();
        match e {
            ParseEvent::Begin { id, .. } => {
                assert!(!a.begun, "duplicate Begin for {id:?}");
                assert!(*id > last_begin, "ids must increase: {id:?} after {last_begin:?}");
                last_begin = *id;
                a.begun = true;
            }
            ParseEvent::Delta { id, text } => {
                assert!(a.begun && !a.ended, "stray Delta for {id:?}");
                assert!(!text.is_empty(), "empty Delta for {id:?}");
                a.deltas.push_str(text);
            }
            ParseEvent::Annotation { id, range, .. } => {
                assert!(a.begun && !a.ended, "stray Annotation for {id:?}");
                a.annotations.push(range.clone());
            }
            ParseEvent::End { id, content } => {
                assert!(a.begun && !a.ended, "stray End for {id:?}");
                a.ended = true;
                assert_eq!(
                    &a.deltas, content,
                    "deltas must concatenate to the content of {id:?}"
                );
                for r in &a.annotations {
                    assert!(r.end <= content.len(), "annotation {r:?} outside {id:?}");
                }
            }
        }
    }
    for (id, a) in &acc {
        assert!(!a.begun || a.ended, "block {id:?} left open after finalize");
    }
}

pub fn chunk_whole(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

pub fn chunk_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(|s| s.to_string()).collect()
}

pub fn chunk_chars(text: &str) -> Vec<String> {
    text.chars().map(|c| c.to_string()).collect()
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in s.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

pub fn chunk_pseudo_random(
    text: &str,
    seed_label: &str,
    trial: u64,
    max_bytes: usize,
) -> Vec<String> {
    assert!(max_bytes > 0);
    let mut state = fnv1a64(seed_label) ^ (trial.wrapping_mul(0x9e3779b97f4a7c15));

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let want = (xorshift64(&mut state) as usize % max_bytes) + 1;
        let mut end = (start + want).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(text[start..end].to_string());
        start = end;
    }
    out
}
