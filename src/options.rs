use thiserror::Error;

/// Construction-time configuration errors.
///
/// This is the only condition under which the parser refuses to proceed;
/// malformed *input* is always handled by graceful degradation instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_buffer_bytes must be positive (got 0)")]
    ZeroBufferLimit,
    #[error("table_lookahead_bytes must be positive (got 0)")]
    ZeroTableLookahead,
}

/// Tuning parameters, fixed at parser construction.
#[derive(Debug, Clone)]
pub struct Options {
    /// Compaction threshold: once more than this many processed bytes sit in
    /// the buffer and no block is open, the consumed prefix is dropped.
    pub max_buffer_bytes: usize,
    /// Upper bound on how many bytes a provisional table header row may wait
    /// for its separator row before the table is rejected.
    pub table_lookahead_bytes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 64 * 1024,
            table_lookahead_bytes: 4 * 1024,
        }
    }
}

impl Options {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffer_bytes == 0 {
            return Err(ConfigError::ZeroBufferLimit);
        }
        if self.table_lookahead_bytes == 0 {
            return Err(ConfigError::ZeroTableLookahead);
        }
        Ok(())
    }
}
