//! The streaming driver.
//!
//! [`StreamParser`] owns the parser state, drives the block/inline detectors
//! over input that arrives in arbitrarily-sized chunks, and produces an
//! append-only sequence of [`ParseEvent`]s. Nothing is speculative across a
//! `feed` boundary except the single provisional table-header lookahead:
//! when a line prefix could still grow into a different construct, the
//! driver holds it unconsumed instead of guessing, so no event ever has to
//! be retracted.

mod compaction;

use crate::inline::{find_all_inline_emphasis, find_inline_links};
use crate::matcher::{BlockMatcher, CustomDetection, EndRule};
use crate::options::{ConfigError, Options};
use crate::state::{BlockState, ParserState};
use crate::syntax::{
    DetectedBlock, ambiguous_block_prefix, detect_blockquote, detect_code_fence, detect_heading,
    detect_link_reference, detect_list_item, detect_math_block, detect_thematic_break,
    fence_close_regex, is_blank_line, is_list_continuation, math_single_line_content,
    parse_link_reference,
};
use crate::table::{is_header_candidate, parse_table_row, parse_table_separator};
use crate::text::{create_end_marker_regex, normalize_line_endings, strip_indent};
use crate::types::{AnnotationKind, BlockKind, BlockMeta, ParseEvent};

/// Dispatch fuel per line; a detector that fails to make progress within
/// this many re-dispatches indicates a driver bug, not bad input.
const MAX_DISPATCH_STEPS: u32 = 8;

pub struct StreamParser {
    opts: Options,
    state: ParserState,
    matchers_before: Vec<Box<dyn BlockMatcher>>,
    matchers_after: Vec<Box<dyn BlockMatcher>>,
    /// Line index of a provisionally-buffered table header row awaiting its
    /// separator. No event has been emitted for it yet.
    held_table: Option<usize>,
    pending_cr: bool,
    finalized: bool,
}

impl std::fmt::Debug for StreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamParser")
            .field("buffer_len", &self.state.buffer.len())
            .field("processed", &self.state.processed)
            .field("open_blocks", &self.state.open.len())
            .field("held_table", &self.held_table)
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl StreamParser {
    pub fn new(opts: Options) -> Result<Self, ConfigError> {
        opts.validate()?;
        Ok(Self {
            opts,
            state: ParserState::new(),
            matchers_before: Vec::new(),
            matchers_after: Vec::new(),
            held_table: None,
            pending_cr: false,
            finalized: false,
        })
    }

    /// Register a custom matcher consulted before the built-in detectors.
    pub fn push_matcher_before<M>(&mut self, matcher: M)
    where
        M: BlockMatcher + 'static,
    {
        self.matchers_before.push(Box::new(matcher));
    }

    /// Register a custom matcher consulted after the built-in detectors.
    pub fn push_matcher_after<M>(&mut self, matcher: M)
    where
        M: BlockMatcher + 'static,
    {
        self.matchers_after.push(Box::new(matcher));
    }

    pub fn with_matcher_before<M>(mut self, matcher: M) -> Self
    where
        M: BlockMatcher + 'static,
    {
        self.push_matcher_before(matcher);
        self
    }

    pub fn with_matcher_after<M>(mut self, matcher: M) -> Self
    where
        M: BlockMatcher + 'static,
    {
        self.push_matcher_after(matcher);
        self
    }

    /// Current length of the internal buffer; bounded by compaction.
    pub fn buffer_len(&self) -> usize {
        self.state.buffer.len()
    }

    /// Number of currently open blocks.
    pub fn open_blocks(&self) -> usize {
        self.state.open.len()
    }

    /// Append a chunk and advance scanning as far as currently possible.
    ///
    /// Returns the events produced by this call; may be empty if the chunk
    /// only extends an incomplete construct.
    pub fn feed(&mut self, chunk: &str) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        if self.finalized {
            return events;
        }
        if chunk.is_empty() {
            return events;
        }

        let chunk = self.normalize_chunk(chunk);
        if chunk.is_empty() {
            return events;
        }
        self.state.append_to_lines(&chunk);

        while self.state.scan_line + 1 < self.state.lines.len() {
            let idx = self.state.scan_line;
            self.process_line(idx, true, &mut events);
            self.state.scan_line += 1;
        }
        self.process_tail(&mut events);
        self.flush_deltas(&mut events);
        self.maybe_compact();
        events
    }

    /// Signal end-of-stream: close every still-open block and flush anything
    /// provisionally buffered. Idempotent; a second call emits nothing.
    pub fn finalize(&mut self) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        if self.finalized {
            return events;
        }
        self.finalized = true;

        if self.pending_cr {
            // A trailing '\r' at EOF counts as a line ending.
            self.pending_cr = false;
            self.state.append_to_lines("\n");
        }

        while self.state.scan_line + 1 < self.state.lines.len() {
            let idx = self.state.scan_line;
            self.process_line(idx, true, &mut events);
            self.state.scan_line += 1;
        }

        let tail = *self.state.tail();
        if tail.end > tail.start {
            let idx = self.state.lines.len() - 1;
            self.process_line(idx, false, &mut events);
        } else if self.held_table.is_some() {
            self.reject_held_table(&mut events);
        }

        while !self.state.open.is_empty() {
            self.close_top(&mut events);
        }
        self.state.processed = self.state.buffer.len();
        events
    }

    // ---- chunk normalization -------------------------------------------

    fn normalize_chunk(&mut self, chunk: &str) -> String {
        let mut out = String::with_capacity(chunk.len() + 1);
        let mut rest = chunk;
        if self.pending_cr {
            // The previous chunk ended in '\r'; it may have been half of a
            // CRLF pair split across the boundary.
            self.pending_cr = false;
            out.push('\n');
            if let Some(r) = rest.strip_prefix('\n') {
                rest = r;
            }
        }
        if let Some(r) = rest.strip_suffix('\r') {
            self.pending_cr = true;
            rest = r;
        }
        out.push_str(&normalize_line_endings(rest));
        out
    }

    // ---- per-line state machine ----------------------------------------

    fn process_line(&mut self, idx: usize, has_newline: bool, events: &mut Vec<ParseEvent>) {
        let text = self.state.line_str(idx).to_string();
        let mut fuel = MAX_DISPATCH_STEPS;
        loop {
            if fuel == 0 {
                debug_assert!(false, "line dispatch made no progress: {text:?}");
                // Degrade to consuming the line as-is rather than loop.
                self.consume_line(idx, has_newline);
                return;
            }
            fuel -= 1;

            let Some(kind) = self.state.open.last().map(|b| b.kind) else {
                if self.held_table.is_some() {
                    if self.resolve_held_table(idx, &text, has_newline, events) {
                        return;
                    }
                    continue;
                }
                if is_blank_line(&text) {
                    self.consume_line(idx, has_newline);
                    return;
                }
                self.open_fresh(idx, &text, has_newline, events);
                return;
            };

            match kind {
                BlockKind::Heading => {
                    self.fold_rest_of_line(idx, false, has_newline);
                    self.close_top(events);
                    return;
                }
                BlockKind::Paragraph => {
                    if is_blank_line(&text) {
                        self.close_top(events);
                        self.consume_line(idx, has_newline);
                        return;
                    }
                    if self.interrupts_paragraph(&text) {
                        self.close_top(events);
                        continue;
                    }
                    self.fold_rest_of_line(idx, true, has_newline);
                    return;
                }
                BlockKind::CodeFence | BlockKind::MathBlock => {
                    let closes = self
                        .state
                        .open
                        .last()
                        .and_then(|b| b.close_re.as_ref())
                        .is_some_and(|re| re.is_match(&text));
                    if closes {
                        self.consume_line(idx, has_newline);
                        self.close_top(events);
                    } else {
                        self.fold_fenced_line(idx, &text, has_newline);
                    }
                    return;
                }
                BlockKind::BlockQuote => {
                    if is_blank_line(&text) {
                        self.hold_blank(idx, has_newline);
                        return;
                    }
                    if let Some(d) = detect_blockquote(&text) {
                        self.fold_marked_line(idx, d.content_offset, has_newline);
                        return;
                    }
                    let after_blank = self.state.open.last().is_some_and(|b| b.held_blanks > 0);
                    if after_blank || self.interrupts_quote(&text) {
                        self.close_top(events);
                        continue;
                    }
                    // Lazy continuation.
                    self.fold_marked_line(idx, 0, has_newline);
                    return;
                }
                BlockKind::List => {
                    if is_blank_line(&text) {
                        self.hold_blank(idx, has_newline);
                        return;
                    }
                    let continues = is_list_continuation(&text);
                    if continues && !self.starts_new_block(&text) {
                        self.fold_marked_line(idx, 0, has_newline);
                        return;
                    }
                    self.close_top(events);
                    continue;
                }
                BlockKind::Table => {
                    if !is_blank_line(&text) && parse_table_row(&text).is_some() {
                        self.fold_table_row(idx, &text, has_newline, events);
                        return;
                    }
                    self.close_top(events);
                    continue;
                }
                BlockKind::Custom => {
                    if self.custom_line_closes(&text) {
                        self.consume_line(idx, has_newline);
                        self.close_top(events);
                        return;
                    }
                    self.fold_marked_line(idx, 0, has_newline);
                    return;
                }
                BlockKind::ThematicBreak | BlockKind::LinkReference => {
                    // Single-shot kinds never stay open.
                    debug_assert!(false, "single-line block left open");
                    self.close_top(events);
                    continue;
                }
            }
        }
    }

    fn custom_line_closes(&self, text: &str) -> bool {
        let Some(top) = self.state.open.last() else {
            return false;
        };
        match &top.close_re {
            Some(re) => re.is_match(text),
            // `UntilBlank` custom blocks carry no close pattern.
            None => is_blank_line(text),
        }
    }

    /// Detector priority: custom-before, fenced constructs, heading,
    /// thematic break, quote, list, link reference, table, custom-after,
    /// paragraph fallback. The first match wins.
    fn open_fresh(&mut self, idx: usize, text: &str, has_newline: bool, events: &mut Vec<ParseEvent>) {
        if let Some(det) = detect_custom(&self.matchers_before, text) {
            self.open_custom(idx, text, has_newline, det, events);
            return;
        }
        if let Some(d) = detect_code_fence(text) {
            self.open_fenced(idx, d, has_newline, events);
            return;
        }
        if let Some(d) = detect_math_block(text) {
            if let Some(inner) = math_single_line_content(text) {
                let inner = inner.to_string();
                self.open_block(BlockKind::MathBlock, "$$", None, events);
                self.fold_text(&inner);
                self.consume_line(idx, has_newline);
                self.close_top(events);
            } else {
                self.open_fenced(idx, d, has_newline, events);
            }
            return;
        }
        if let Some(d) = detect_heading(text) {
            self.open_heading(idx, &d, events);
            self.fold_rest_of_line(idx, false, has_newline);
            self.close_top(events);
            return;
        }
        if detect_thematic_break(text).is_some() {
            self.open_block(BlockKind::ThematicBreak, text.trim(), None, events);
            self.fold_text(text.trim());
            self.consume_line(idx, has_newline);
            self.close_top(events);
            return;
        }
        if let Some(d) = detect_blockquote(text) {
            self.open_block(BlockKind::BlockQuote, ">", None, events);
            self.fold_marked_line(idx, d.content_offset, has_newline);
            return;
        }
        if let Some(d) = detect_list_item(text) {
            self.open_block(BlockKind::List, &d.start_marker, d.meta.clone(), events);
            self.fold_marked_line(idx, 0, has_newline);
            return;
        }
        if detect_link_reference(text).is_some() {
            self.open_link_reference(idx, text, has_newline, events);
            return;
        }
        if has_newline && is_header_candidate(text) {
            // Provisional: no event until the separator row decides.
            self.held_table = Some(idx);
            return;
        }
        if let Some(det) = detect_custom(&self.matchers_after, text) {
            self.open_custom(idx, text, has_newline, det, events);
            return;
        }
        self.open_block(BlockKind::Paragraph, "", None, events);
        self.fold_rest_of_line(idx, true, has_newline);
    }

    // ---- block open/close helpers --------------------------------------

    fn open_block(
        &mut self,
        kind: BlockKind,
        start_marker: &str,
        meta: Option<BlockMeta>,
        events: &mut Vec<ParseEvent>,
    ) {
        let id = self.state.alloc_id();
        self.state.open.push(BlockState {
            id,
            kind,
            content: String::new(),
            start_marker: start_marker.to_string(),
            last_emitted: 0,
            close_re: None,
            indent: 0,
            held_blanks: 0,
        });
        events.push(ParseEvent::Begin { id, kind, meta });
    }

    fn open_fenced(
        &mut self,
        idx: usize,
        d: DetectedBlock,
        has_newline: bool,
        events: &mut Vec<ParseEvent>,
    ) {
        let id = self.state.alloc_id();
        let close_re = match d.kind {
            BlockKind::CodeFence => {
                Some(fence_close_regex(d.end_marker.as_deref().unwrap_or("```")))
            }
            _ => Some(create_end_marker_regex(d.end_marker.as_deref().unwrap_or("$$"))),
        };
        self.state.open.push(BlockState {
            id,
            kind: d.kind,
            content: String::new(),
            start_marker: d.start_marker.clone(),
            last_emitted: 0,
            close_re,
            indent: d.indent,
            held_blanks: 0,
        });
        events.push(ParseEvent::Begin {
            id,
            kind: d.kind,
            meta: d.meta,
        });
        self.consume_line(idx, has_newline);
    }

    fn open_heading(&mut self, idx: usize, d: &DetectedBlock, events: &mut Vec<ParseEvent>) {
        let line_start = self.state.lines[idx].start;
        self.open_block(BlockKind::Heading, &d.start_marker, d.meta.clone(), events);
        // Content begins after the marker run and its whitespace.
        self.state.processed = line_start + d.content_offset;
    }

    /// A heading's marker gap may arrive split across chunks; skip any
    /// whitespace still pending before the first content byte.
    fn skip_heading_gap(&mut self, limit: usize) {
        let empty = self
            .state
            .open
            .last()
            .is_some_and(|b| b.kind == BlockKind::Heading && b.content.is_empty());
        if !empty {
            return;
        }
        let bytes = self.state.buffer.as_bytes();
        while self.state.processed < limit
            && matches!(bytes[self.state.processed], b' ' | b'\t')
        {
            self.state.processed += 1;
        }
    }

    fn open_link_reference(
        &mut self,
        idx: usize,
        text: &str,
        has_newline: bool,
        events: &mut Vec<ParseEvent>,
    ) {
        let (label, url) = match parse_link_reference(text) {
            Some(pair) => (pair.0.to_string(), pair.1.to_string()),
            None => return,
        };
        self.open_block(BlockKind::LinkReference, &format!("[{label}]:"), None, events);
        self.fold_text(text);
        self.consume_line(idx, has_newline);

        let Some(top) = self.state.open.last() else {
            return;
        };
        let id = top.id;
        let url_start = top.content.find(&url).unwrap_or(0);
        self.flush_delta_top(events);
        events.push(ParseEvent::Annotation {
            id,
            kind: AnnotationKind::Link,
            range: url_start..url_start + url.len(),
            payload: Some(url),
        });
        self.close_top(events);
    }

    fn open_custom(
        &mut self,
        idx: usize,
        text: &str,
        has_newline: bool,
        det: CustomDetection,
        events: &mut Vec<ParseEvent>,
    ) {
        let close_re = det.close_regex();
        let single = det.end == EndRule::SingleLine;
        self.open_block(
            BlockKind::Custom,
            &det.marker,
            Some(BlockMeta::Custom {
                marker: det.marker.clone(),
            }),
            events,
        );
        if let Some(top) = self.state.open.last_mut() {
            top.close_re = close_re;
        }
        if det.keep_start_line || single {
            self.fold_text(text);
            if has_newline && !single {
                self.fold_text("\n");
            }
        }
        self.consume_line(idx, has_newline);
        if single {
            self.close_top(events);
        }
    }

    fn close_top(&mut self, events: &mut Vec<ParseEvent>) {
        self.flush_delta_top(events);
        let Some(block) = self.state.open.pop() else {
            return;
        };
        match block.kind {
            BlockKind::Paragraph | BlockKind::Heading | BlockKind::BlockQuote => {
                annotate_inline(&block, events);
            }
            _ => {}
        }
        events.push(ParseEvent::End {
            id: block.id,
            content: block.content,
        });
    }

    // ---- content folding -----------------------------------------------

    fn fold_text(&mut self, text: &str) {
        if let Some(top) = self.state.open.last_mut() {
            top.content.push_str(text);
        }
    }

    /// Fold `buffer[processed..line end]` into the open block. Used by the
    /// kinds that stream mid-line (heading, paragraph).
    fn fold_rest_of_line(&mut self, idx: usize, newline_in_content: bool, has_newline: bool) {
        let line = self.state.lines[idx];
        self.skip_heading_gap(line.end);
        let from = self.state.processed.max(line.start);
        if from < line.end {
            let seg = self.state.buffer[from..line.end].to_string();
            self.release_blanks();
            self.fold_text(&seg);
        } else {
            self.release_blanks();
        }
        if has_newline && newline_in_content {
            self.fold_text("\n");
        }
        self.consume_line(idx, has_newline);
    }

    /// Fold a completed line of a marker-carrying block (quote, list,
    /// custom), skipping `offset` marker bytes.
    fn fold_marked_line(&mut self, idx: usize, offset: usize, has_newline: bool) {
        let line = self.state.lines[idx];
        let content_from = (line.start + offset).max(self.state.processed.max(line.start));
        let seg = if content_from < line.end {
            self.state.buffer[content_from..line.end].to_string()
        } else {
            String::new()
        };
        self.release_blanks();
        self.fold_text(&seg);
        if has_newline {
            self.fold_text("\n");
        }
        self.consume_line(idx, has_newline);
    }

    /// Fold a code/math content line, stripping the fence's indentation.
    fn fold_fenced_line(&mut self, idx: usize, text: &str, has_newline: bool) {
        let indent = self.state.open.last().map(|b| b.indent).unwrap_or(0);
        let seg = strip_indent(text, indent).to_string();
        self.fold_text(&seg);
        if has_newline {
            self.fold_text("\n");
        }
        self.consume_line(idx, has_newline);
    }

    fn fold_table_row(
        &mut self,
        idx: usize,
        text: &str,
        has_newline: bool,
        events: &mut Vec<ParseEvent>,
    ) {
        let row_start = self.state.open.last().map(|b| b.content.len()).unwrap_or(0);
        self.fold_text(text);
        let row_end = self.state.open.last().map(|b| b.content.len()).unwrap_or(0);
        if has_newline {
            self.fold_text("\n");
        }
        self.consume_line(idx, has_newline);

        self.flush_delta_top(events);
        if let Some(top) = self.state.open.last() {
            if parse_table_separator(text).is_none() {
                events.push(ParseEvent::Annotation {
                    id: top.id,
                    kind: AnnotationKind::TableRow,
                    range: row_start..row_end,
                    payload: Some(text.trim().to_string()),
                });
            }
        }
    }

    fn hold_blank(&mut self, idx: usize, has_newline: bool) {
        if let Some(top) = self.state.open.last_mut() {
            top.held_blanks += 1;
        }
        self.consume_line(idx, has_newline);
    }

    fn release_blanks(&mut self) {
        let Some(top) = self.state.open.last_mut() else {
            return;
        };
        for _ in 0..top.held_blanks {
            top.content.push('\n');
        }
        top.held_blanks = 0;
    }

    fn consume_line(&mut self, idx: usize, has_newline: bool) {
        let line = self.state.lines[idx];
        let end = if has_newline {
            line.end_with_newline()
        } else {
            line.end
        };
        if end > self.state.processed {
            self.state.processed = end;
        }
    }

    // ---- table lookahead ------------------------------------------------

    /// Decide a provisionally-held table header against the next completed
    /// line. Returns `true` if the line was fully handled.
    fn resolve_held_table(
        &mut self,
        idx: usize,
        text: &str,
        has_newline: bool,
        events: &mut Vec<ParseEvent>,
    ) -> bool {
        let Some(header_idx) = self.held_table else {
            return false;
        };
        let Some(alignments) = parse_table_separator(text) else {
            self.reject_held_table(events);
            return false;
        };

        self.held_table = None;
        let header_text = self.state.line_str(header_idx).to_string();
        self.open_block(BlockKind::Table, "|", Some(BlockMeta::Table { alignments }), events);
        // Header first (with its row annotation), then the separator row.
        self.fold_table_row(header_idx, &header_text, true, events);
        self.fold_table_row(idx, text, has_newline, events);
        true
    }

    /// The separator never arrived: re-treat the held header as paragraph
    /// content. No event was emitted for it, so nothing is retracted.
    fn reject_held_table(&mut self, events: &mut Vec<ParseEvent>) {
        let Some(header_idx) = self.held_table.take() else {
            return;
        };
        self.open_block(BlockKind::Paragraph, "", None, events);
        self.fold_rest_of_line(header_idx, true, true);
    }

    // ---- interrupt rules -----------------------------------------------

    /// Constructs that may start on any line, terminating whatever block is
    /// open below them in priority.
    fn starts_new_block(&self, text: &str) -> bool {
        detect_code_fence(text).is_some()
            || detect_math_block(text).is_some()
            || detect_heading(text).is_some()
            || detect_thematic_break(text).is_some()
            || detect_custom(&self.matchers_before, text).is_some()
            || detect_custom(&self.matchers_after, text).is_some()
    }

    fn interrupts_paragraph(&self, text: &str) -> bool {
        self.starts_new_block(text)
            || detect_blockquote(text).is_some()
            || detect_list_item(text).is_some()
    }

    fn interrupts_quote(&self, text: &str) -> bool {
        self.starts_new_block(text) || detect_list_item(text).is_some()
    }

    // ---- incomplete tail handling --------------------------------------

    /// Mid-line streaming over the unfinished last line.
    ///
    /// Heading content and open-paragraph continuation lines are folded as
    /// soon as the line prefix is unambiguous; every other kind waits for
    /// the newline. A fresh paragraph is never opened from a tail, since a
    /// pipe later in the line could still make it a table-header candidate.
    /// Disabled while custom matchers are registered, since their markers
    /// are unknown to [`ambiguous_block_prefix`].
    fn process_tail(&mut self, events: &mut Vec<ParseEvent>) {
        let tail = *self.state.tail();
        if let Some(header_idx) = self.held_table {
            // Bounded lookahead: reject the table if the separator line grows
            // beyond the configured cap without completing.
            let header_start = self.state.lines[header_idx].start;
            if tail.end.saturating_sub(header_start) > self.opts.table_lookahead_bytes {
                self.reject_held_table(events);
            }
            return;
        }
        if !self.tail_streaming_enabled() {
            return;
        }
        if tail.end <= tail.start && self.state.open.is_empty() {
            return;
        }

        match self.state.open.last().map(|b| b.kind) {
            None => self.open_from_tail(events),
            Some(BlockKind::Heading) => {
                self.skip_heading_gap(tail.end);
                let from = self.state.processed.max(tail.start);
                if from < tail.end {
                    let seg = self.state.buffer[from..tail.end].to_string();
                    self.fold_text(&seg);
                    self.state.processed = tail.end;
                }
            }
            Some(BlockKind::Paragraph) => {
                let fresh = self.state.processed <= tail.start;
                let partial = &self.state.buffer[tail.start..tail.end];
                if fresh {
                    if partial.is_empty() || ambiguous_block_prefix(partial) {
                        return;
                    }
                    if self.interrupts_paragraph(partial) {
                        // A definite interrupt is already visible mid-line;
                        // close now, leave the tail for the next pass.
                        self.close_top(events);
                        return;
                    }
                }
                let from = self.state.processed.max(tail.start);
                if from < tail.end {
                    let seg = self.state.buffer[from..tail.end].to_string();
                    self.release_blanks();
                    self.fold_text(&seg);
                    self.state.processed = tail.end;
                }
            }
            Some(BlockKind::BlockQuote) | Some(BlockKind::List) => {
                // Stream only while still on the block's first line.
                if self.state.processed > tail.start {
                    let from = self.state.processed;
                    if from < tail.end {
                        let seg = self.state.buffer[from..tail.end].to_string();
                        self.fold_text(&seg);
                        self.state.processed = tail.end;
                    }
                }
            }
            _ => {}
        }
    }

    fn open_from_tail(&mut self, events: &mut Vec<ParseEvent>) {
        let tail = *self.state.tail();
        let idx = self.state.lines.len() - 1;
        let partial = self.state.buffer[tail.start..tail.end].to_string();
        if partial.is_empty() || ambiguous_block_prefix(&partial) {
            return;
        }
        // Fenced and line-scoped constructs need the completed line (info
        // strings, single-line math, thematic breaks).
        if detect_code_fence(&partial).is_some()
            || detect_math_block(&partial).is_some()
            || detect_thematic_break(&partial).is_some()
        {
            return;
        }
        if let Some(d) = detect_heading(&partial) {
            self.open_heading(idx, &d, events);
            self.skip_heading_gap(tail.end);
            let from = self.state.processed;
            if from < tail.end {
                let seg = self.state.buffer[from..tail.end].to_string();
                self.fold_text(&seg);
            }
            self.state.processed = tail.end;
            return;
        }
        if let Some(d) = detect_blockquote(&partial) {
            // With only the marker in hand the optional space after `>` is
            // still undecided; wait for one more byte.
            if partial.trim_start().len() < 2 {
                return;
            }
            self.open_block(BlockKind::BlockQuote, ">", None, events);
            self.state.processed = tail.start + d.content_offset;
            let from = self.state.processed;
            if from < tail.end {
                let seg = self.state.buffer[from..tail.end].to_string();
                self.fold_text(&seg);
            }
            self.state.processed = tail.end;
            return;
        }
        if let Some(d) = detect_list_item(&partial) {
            self.open_block(BlockKind::List, &d.start_marker, d.meta.clone(), events);
            self.fold_text(&partial);
            self.state.processed = tail.end;
            return;
        }
        // No paragraph fallback here: a pipe may still arrive anywhere in the
        // line and turn it into a table-header candidate, so a fresh
        // paragraph waits for its first completed line.
    }

    fn tail_streaming_enabled(&self) -> bool {
        self.matchers_before.is_empty() && self.matchers_after.is_empty()
    }

    // ---- delta emission -------------------------------------------------

    /// Emit one delta per open block whose content grew since its last
    /// event. Suffix-only: deltas are non-overlapping and concatenate to the
    /// exact block content.
    fn flush_deltas(&mut self, events: &mut Vec<ParseEvent>) {
        for block in self.state.open.iter_mut() {
            if block.content.len() > block.last_emitted {
                events.push(ParseEvent::Delta {
                    id: block.id,
                    text: block.content[block.last_emitted..].to_string(),
                });
                block.last_emitted = block.content.len();
            }
        }
    }

    fn flush_delta_top(&mut self, events: &mut Vec<ParseEvent>) {
        if let Some(block) = self.state.open.last_mut() {
            if block.content.len() > block.last_emitted {
                events.push(ParseEvent::Delta {
                    id: block.id,
                    text: block.content[block.last_emitted..].to_string(),
                });
                block.last_emitted = block.content.len();
            }
        }
    }
}

fn detect_custom(matchers: &[Box<dyn BlockMatcher>], text: &str) -> Option<CustomDetection> {
    matchers.iter().find_map(|m| m.detect(text))
}

/// Emit emphasis and link annotations over a block's finished content.
fn annotate_inline(block: &BlockState, events: &mut Vec<ParseEvent>) {
    for span in find_all_inline_emphasis(&block.content) {
        events.push(ParseEvent::Annotation {
            id: block.id,
            kind: span.kind,
            range: span.range,
            payload: None,
        });
    }
    for (span, url) in find_inline_links(&block.content) {
        events.push(ParseEvent::Annotation {
            id: block.id,
            kind: span.kind,
            range: span.range,
            payload: Some(url),
        });
    }
}
