use std::fmt;
use std::ops::Range;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub u64);

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    Paragraph,
    Heading,
    BlockQuote,
    List,
    CodeFence,
    MathBlock,
    ThematicBreak,
    Table,
    LinkReference,
    /// Blocks opened by a registered [`crate::matcher::BlockMatcher`].
    Custom,
}

/// Column alignment declared by a table separator row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// Structured metadata carried by a `Begin` event, when the start marker has any.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockMeta {
    CodeFence {
        /// First token of the fence info string, if any.
        language: Option<String>,
        /// Remaining well-formed `key=value` tokens of the info string.
        attrs: Vec<(String, String)>,
    },
    Heading {
        level: u8,
    },
    List {
        ordered: bool,
    },
    Table {
        alignments: Vec<Alignment>,
    },
    Custom {
        marker: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnnotationKind {
    Strong,
    Emphasis,
    Strikethrough,
    Code,
    Link,
    TableRow,
}

/// An inline span located by the inline detectors.
///
/// `range` is a byte range into the scanned text and includes the delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub kind: AnnotationKind,
    pub range: Range<usize>,
}

/// One event in the append-only output stream of [`crate::StreamParser`].
///
/// For any block id the sequence is always `Begin`, zero or more `Delta`s,
/// zero or more `Annotation`s, then exactly one `End`. Events for a closed id
/// are never emitted again and ids are never reused within one parser
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParseEvent {
    Begin {
        id: BlockId,
        kind: BlockKind,
        meta: Option<BlockMeta>,
    },
    /// New content appended to an open block since its last event.
    ///
    /// Concatenating all deltas of an id in emission order reconstructs the
    /// block content exactly.
    Delta {
        id: BlockId,
        text: String,
    },
    /// An inline span recognized within the block's finished content.
    ///
    /// `range` is a byte range into the block content. `payload` carries the
    /// link target for `Link` and the raw row text for `TableRow`.
    Annotation {
        id: BlockId,
        kind: AnnotationKind,
        range: Range<usize>,
        payload: Option<String>,
    },
    End {
        id: BlockId,
        content: String,
    },
}

impl ParseEvent {
    pub fn id(&self) -> BlockId {
        match self {
            ParseEvent::Begin { id, .. }
            | ParseEvent::Delta { id, .. }
            | ParseEvent::Annotation { id, .. }
            | ParseEvent::End { id, .. } => *id,
        }
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, ParseEvent::Begin { .. })
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ParseEvent::End { .. })
    }

    pub fn delta_text(&self) -> Option<&str> {
        match self {
            ParseEvent::Delta { text, .. } => Some(text),
            _ => None,
        }
    }
}
