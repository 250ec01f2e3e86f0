//! Mutable parser state.
//!
//! One [`ParserState`] is exclusively owned by one [`crate::StreamParser`]
//! and mutated only by it; detectors receive immutable line views.

use regex::Regex;

use crate::types::{BlockId, BlockKind};

/// One physical line of the buffer. `end` excludes the `\n`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line {
    pub start: usize,
    pub end: usize,
    pub has_newline: bool,
}

impl Line {
    pub fn as_str<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.start..self.end]
    }

    pub fn end_with_newline(&self) -> usize {
        if self.has_newline { self.end + 1 } else { self.end }
    }
}

/// An open block between start-marker detection and close.
pub struct BlockState {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Accumulated content, decoupled from the outer buffer.
    pub content: String,
    pub start_marker: String,
    /// Length of `content` already delivered via deltas. Monotonic; deltas
    /// are never re-emitted or retracted.
    pub last_emitted: usize,
    pub(crate) close_re: Option<Regex>,
    /// Marker indentation, stripped from fenced content lines.
    pub(crate) indent: usize,
    /// Blank lines seen since the last content line; folded in only if the
    /// block turns out to continue past them.
    pub(crate) held_blanks: usize,
}

impl std::fmt::Debug for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockState")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("content_len", &self.content.len())
            .field("start_marker", &self.start_marker)
            .field("last_emitted", &self.last_emitted)
            .finish()
    }
}

/// The minimum data required to resume scanning after any chunk boundary.
pub(crate) struct ParserState {
    /// Unconsumed tail of (normalized) input received so far.
    pub buffer: String,
    pub lines: Vec<Line>,
    /// Index of the next completed line to scan.
    pub scan_line: usize,
    /// Buffer offset up to which content has been emitted or folded into an
    /// open block. Only increases between compactions.
    pub processed: usize,
    /// Stack of open blocks, innermost last.
    pub open: Vec<BlockState>,
    pub next_id: u64,
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            lines: vec![Line {
                start: 0,
                end: 0,
                has_newline: false,
            }],
            scan_line: 0,
            processed: 0,
            open: Vec::new(),
            next_id: 1,
        }
    }

    pub fn alloc_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a normalized chunk and extend the line index.
    pub fn append_to_lines(&mut self, chunk: &str) {
        let start_offset = self.buffer.len();
        self.buffer.push_str(chunk);

        if self.lines.is_empty() {
            self.lines.push(Line {
                start: 0,
                end: 0,
                has_newline: false,
            });
        }
        let last_index = self.lines.len() - 1;
        self.lines[last_index].end = self.buffer.len();

        let bytes = self.buffer.as_bytes();
        let mut i = start_offset;
        while i < bytes.len() {
            if bytes[i] == b'\n' {
                let last = self.lines.len() - 1;
                self.lines[last].end = i;
                self.lines[last].has_newline = true;
                self.lines.push(Line {
                    start: i + 1,
                    end: bytes.len(),
                    has_newline: false,
                });
            }
            i += 1;
        }
    }

    /// Recompute the line index after the buffer prefix was dropped.
    pub fn rebuild_lines(&mut self) {
        self.lines.clear();
        let bytes = self.buffer.as_bytes();
        let mut start = 0usize;
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\n' {
                self.lines.push(Line {
                    start,
                    end: i,
                    has_newline: true,
                });
                start = i + 1;
            }
        }
        self.lines.push(Line {
            start,
            end: bytes.len(),
            has_newline: false,
        });
    }

    pub fn line_str(&self, index: usize) -> &str {
        self.lines[index].as_str(&self.buffer)
    }

    /// The unfinished tail line, if any bytes of it have arrived.
    pub fn tail(&self) -> &Line {
        self.lines.last().expect("line index never empty")
    }
}
