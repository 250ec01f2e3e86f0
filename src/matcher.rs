//! Custom block matchers.
//!
//! A matcher extends the driver with application-specific block constructs
//! (directives, tool-call tags, ...) without modifying it. Matchers conform
//! to the same contract as the built-in detectors: a pure `detect` over one
//! line that returns a description of the block start, or `None`. The driver
//! owns the open/extend/close lifecycle.

use crate::text::create_end_marker_regex;

/// How a custom block closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndRule {
    /// The block is the start line alone.
    SingleLine,
    /// The block runs until a line consisting of this literal marker
    /// (line-anchored, trailing whitespace tolerated; see
    /// [`create_end_marker_regex`]). The marker line is not block content.
    CloseMarker(String),
    /// The block runs until the next blank line.
    UntilBlank,
}

/// A recognized custom block start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDetection {
    /// Marker text reported in the block's `Begin` metadata.
    pub marker: String,
    pub end: EndRule,
    /// Whether the start line itself is block content.
    pub keep_start_line: bool,
}

impl CustomDetection {
    pub fn fenced(marker: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            end: EndRule::CloseMarker(close.into()),
            keep_start_line: false,
        }
    }

    pub(crate) fn close_regex(&self) -> Option<regex::Regex> {
        match &self.end {
            EndRule::CloseMarker(marker) => Some(create_end_marker_regex(marker)),
            _ => None,
        }
    }
}

/// The pluggable detector contract.
///
/// `detect` must be pure: no internal state, no side effects. Matchers are
/// consulted at block-start positions only, before or after the built-in
/// detectors depending on how they were registered.
pub trait BlockMatcher: Send {
    fn detect(&self, line: &str) -> Option<CustomDetection>;
}

type DetectFn = dyn Fn(&str) -> Option<CustomDetection> + Send + Sync;

/// Closure adapter for [`BlockMatcher`].
pub struct FnBlockMatcher {
    detect: Box<DetectFn>,
}

impl FnBlockMatcher {
    pub fn new<F>(detect: F) -> Self
    where
        F: Fn(&str) -> Option<CustomDetection> + Send + Sync + 'static,
    {
        Self {
            detect: Box::new(detect),
        }
    }
}

impl BlockMatcher for FnBlockMatcher {
    fn detect(&self, line: &str) -> Option<CustomDetection> {
        (self.detect)(line)
    }
}

/// A fence-like directive matcher, e.g. `:::warning` ... `:::`.
#[derive(Debug, Clone)]
pub struct FenceMatcher {
    pub fence: String,
    pub require_name: bool,
}

impl FenceMatcher {
    pub fn new(fence: impl Into<String>) -> Self {
        Self {
            fence: fence.into(),
            require_name: true,
        }
    }

    pub fn triple_colon() -> Self {
        Self::new(":::")
    }
}

impl BlockMatcher for FenceMatcher {
    fn detect(&self, line: &str) -> Option<CustomDetection> {
        let s = line.trim_start();
        let rest = s.strip_prefix(self.fence.as_str())?;
        let name = rest.trim();
        if name.is_empty() && self.require_name {
            // A bare fence line is a close marker, not a start.
            return None;
        }
        Some(CustomDetection::fenced(
            format!("{}{}", self.fence, name),
            self.fence.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_matcher_requires_a_name_to_open() {
        let m = FenceMatcher::triple_colon();
        let d = m.detect(":::warning").unwrap();
        assert_eq!(d.marker, ":::warning");
        assert_eq!(d.end, EndRule::CloseMarker(":::".to_string()));
        assert!(m.detect(":::").is_none());
    }

    #[test]
    fn fn_matcher_wraps_closures() {
        let m = FnBlockMatcher::new(|line| {
            line.starts_with("@@")
                .then(|| CustomDetection::fenced("@@", "@@"))
        });
        assert!(m.detect("@@ begin").is_some());
        assert!(m.detect("plain").is_none());
    }
}
