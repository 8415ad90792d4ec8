use std::fmt;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Half-open byte range `[start, end)` into the *original* text of a unit.
///
/// Spans are never expressed in coordinates of partially rewritten output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length span at `at`.
    pub fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether two spans share at least one offset.
    ///
    /// A zero-length span sits *between* offsets: it overlaps a non-empty span
    /// only when strictly inside it, and another zero-length span only when
    /// both sit at the same point.
    pub fn overlaps(&self, other: &Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (false, false) => self.start < other.end && other.start < self.end,
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The fundamental rewrite primitive: a byte-span replacement produced by a rule.
///
/// Every rule, textual or structural, compiles down to this. Intelligence lives
/// in span acquisition, not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
    /// Id of the rule that produced this edit
    pub rule_id: String,
    /// What the span held in the pristine source when the edit was synthesized
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid byte range {span} in unit of length {len}")]
    InvalidByteRange { span: Span, len: usize },

    #[error("span {span} does not fall on UTF-8 character boundaries")]
    NotCharBoundary { span: Span },

    #[error("before-text verification failed for rule '{rule_id}' at {span}: found {found:?}")]
    BeforeTextMismatch {
        rule_id: String,
        span: Span,
        found: String,
    },
}

/// Warning attached to a unit when a candidate edit loses to an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditConflict {
    /// Rule whose edit was dropped
    pub rule_id: String,
    pub span: Span,
    /// Rule whose already-accepted edit holds the overlapping span
    pub winner_rule_id: String,
    pub winner_span: Span,
}

impl fmt::Display for EditConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edit from '{}' at {} overlaps edit from '{}' at {}; dropped",
            self.rule_id, self.span, self.winner_rule_id, self.winner_span
        )
    }
}

impl Edit {
    /// Create an edit, recording the original text of the span for verification.
    pub fn new(
        span: Span,
        replacement: impl Into<String>,
        rule_id: impl Into<String>,
        expected_before: &str,
    ) -> Self {
        Self {
            span,
            replacement: replacement.into(),
            rule_id: rule_id.into(),
            expected_before: EditVerification::from_text(expected_before),
        }
    }

    /// Create an edit by slicing the expected before-text out of `source`.
    ///
    /// Out-of-range spans record an empty before-text and are rejected later
    /// by [`Edit::validate`].
    pub fn against(
        source: &str,
        span: Span,
        replacement: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        let before = source.get(span.start..span.end).unwrap_or("");
        Self::new(span, replacement, rule_id, before)
    }

    /// Validate the edit against the pristine unit text.
    ///
    /// Returns the current text at the span if validation succeeds.
    pub fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.span.start > self.span.end || self.span.end > content.len() {
            return Err(EditError::InvalidByteRange {
                span: self.span,
                len: content.len(),
            });
        }

        let current = content
            .get(self.span.start..self.span.end)
            .ok_or(EditError::NotCharBoundary { span: self.span })?;

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                rule_id: self.rule_id.clone(),
                span: self.span,
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Whether applying the edit would leave the text unchanged.
    pub fn is_noop(&self, content: &str) -> bool {
        content.get(self.span.start..self.span.end) == Some(self.replacement.as_str())
    }
}
