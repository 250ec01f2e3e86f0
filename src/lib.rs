//! Incremental, append-only parsing of markup streams.
//!
//! `streamark` consumes text in chunks of arbitrary size (token by token,
//! line by line, or whole documents at once) and emits [`ParseEvent`]s as
//! soon as constructs become unambiguous. The event stream is append-only:
//! once something has been emitted it is never revised or retracted, so a
//! consumer can render output progressively without buffering.
//!
//! Chunk boundaries never change the final result. Feeding a document one
//! byte at a time and feeding it whole produce the same blocks with the same
//! content; only the granularity of the intermediate deltas differs.
//!
//! ```
//! use streamark::{Options, StreamParser};
//!
//! let mut parser = StreamParser::new(Options::default())?;
//! let mut events = parser.feed("# Hel");
//! events.extend(parser.feed("lo\nSome text follows.\n"));
//! events.extend(parser.finalize());
//!
//! assert!(events.iter().any(|e| e.is_begin()));
//! assert!(events.iter().any(|e| e.is_end()));
//! # Ok::<(), streamark::ConfigError>(())
//! ```
//!
//! Malformed input is never an error: an unterminated fence, a table header
//! without its separator, or a stray marker simply degrades to the plainest
//! construct that fits, at the latest when [`StreamParser::finalize`] runs.
//! The only fallible operation is construction itself.

mod inline;
mod matcher;
mod options;
mod state;
mod stream;
mod syntax;
mod table;
mod text;
mod types;

pub use inline::*;
pub use matcher::*;
pub use options::*;
pub use stream::StreamParser;
pub use syntax::*;
pub use table::*;
pub use text::*;
pub use types::*;
