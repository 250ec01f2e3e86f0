//! Buffer compaction.
//!
//! Consumed input is dropped from the front of the buffer whenever it grows
//! past the configured limit, keeping memory use proportional to the largest
//! single construct rather than the whole stream. Compaction never runs while
//! a block is open or a table header is provisionally held, since those still
//! reference earlier offsets.

use super::StreamParser;

impl StreamParser {
    pub(super) fn maybe_compact(&mut self) {
        if self.state.buffer.len() <= self.opts.max_buffer_bytes {
            return;
        }
        if !self.state.open.is_empty() || self.held_table.is_some() {
            return;
        }

        let mut keep_from = self.state.processed.min(self.state.buffer.len());
        while keep_from > 0 && !self.state.buffer.is_char_boundary(keep_from) {
            keep_from -= 1;
        }
        if keep_from == 0 {
            return;
        }

        self.state.buffer.drain(..keep_from);
        self.state.processed = 0;
        self.state.rebuild_lines();
        // Every surviving completed line was already scanned; only the tail
        // remains of interest.
        self.state.scan_line = self.state.lines.len() - 1;
    }
}
