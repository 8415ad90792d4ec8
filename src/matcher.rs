//! Contextual matcher: drives one rule's pattern over the pristine unit text.
//!
//! Matches are produced lazily by a [`MatchStream`] restartable at any cursor.
//! After each match the cursor moves past the match end; a zero-length match
//! moves it forward by one character, so every stream terminates.

use crate::catalog::{Rule, Synthesis, SynthesisError};
use crate::compose::{Compositor, Offered};
use crate::edit::{Edit, EditError, Span};
use crate::sg::StructuralPattern;
use crate::source::{Marker, UnitContext};
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// How a rule decides applicability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Purely local: the match alone decides
    Simple,
    /// Consults a whole-unit marker index; skipped for units without that marker
    Contextual(Marker),
}

/// Pattern a rule scans with.
pub enum RulePattern {
    Text(Regex),
    Structural(StructuralPattern),
}

impl RulePattern {
    pub fn as_str(&self) -> &str {
        match self {
            RulePattern::Text(re) => re.as_str(),
            RulePattern::Structural(pattern) => pattern.as_str(),
        }
    }
}

/// One match plus its captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'u> {
    pub span: Span,
    pub text: &'u str,
    /// Positional groups; index 0 is the whole match
    groups: Vec<Option<&'u str>>,
    named: HashMap<String, String>,
}

impl<'u> RuleMatch<'u> {
    pub fn new(span: Span, text: &'u str) -> Self {
        Self {
            span,
            text,
            groups: vec![Some(text)],
            named: HashMap::new(),
        }
    }

    fn from_captures(re: &Regex, caps: &regex::Captures<'u>) -> Option<Self> {
        let whole = caps.get(0)?;
        let groups = caps.iter().map(|g| g.map(|m| m.as_str())).collect();
        let named = re
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(Self {
            span: Span::new(whole.start(), whole.end()),
            text: whole.as_str(),
            groups,
            named,
        })
    }

    pub(crate) fn with_named(mut self, named: HashMap<String, String>) -> Self {
        self.named = named;
        self
    }

    /// Positional capture group.
    pub fn group(&self, index: usize) -> Option<&'u str> {
        self.groups.get(index).copied().flatten()
    }

    /// Named capture (regex named group or ast-grep metavariable).
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Capture by name or by decimal index.
    pub fn capture(&self, key: &str) -> Option<&str> {
        match key.parse::<usize>() {
            Ok(index) => self.group(index),
            Err(_) => self.name(key),
        }
    }

    /// Expand a replacement template.
    ///
    /// `$1` / `${1}` reference positional groups, `${name}`, `$NAME` and
    /// `$$$NAME` reference named captures, `$$` is a literal `$`. Unknown
    /// references expand to nothing.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(after) = rest.strip_prefix("$$$") {
                let len = ident_len(after);
                if len > 0 {
                    out.push_str(self.capture(&after[..len]).unwrap_or(""));
                    rest = &after[len..];
                    continue;
                }
            }
            if let Some(after) = rest.strip_prefix("$$") {
                out.push('$');
                rest = after;
                continue;
            }

            let after = &rest[1..];
            if let Some(braced) = after.strip_prefix('{') {
                if let Some(close) = braced.find('}') {
                    out.push_str(self.capture(&braced[..close]).unwrap_or(""));
                    rest = &braced[close + 1..];
                    continue;
                }
            }

            let digits = after.bytes().take_while(u8::is_ascii_digit).count();
            let len = if digits > 0 { digits } else { ident_len(after) };
            if len == 0 {
                out.push('$');
                rest = after;
            } else {
                out.push_str(self.capture(&after[..len]).unwrap_or(""));
                rest = &after[len..];
            }
        }

        out.push_str(rest);
        out
    }
}

fn ident_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(idx, _)| idx)
}

/// The scan cursor failed to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stalled {
    pub position: usize,
}

/// Lazy, left-to-right stream of matches over one text.
pub struct MatchStream<'r, 'u> {
    source: StreamSource<'r, 'u>,
    text: &'u str,
    cursor: usize,
    done: bool,
}

enum StreamSource<'r, 'u> {
    Text(&'r Regex),
    Buffered(std::vec::IntoIter<RuleMatch<'u>>),
}

impl<'r, 'u> MatchStream<'r, 'u> {
    pub fn new(pattern: &'r RulePattern, text: &'u str) -> Self {
        let source = match pattern {
            RulePattern::Text(re) => StreamSource::Text(re),
            RulePattern::Structural(pattern) => {
                StreamSource::Buffered(pattern.find_all(text).into_iter())
            }
        };
        Self {
            source,
            text,
            cursor: 0,
            done: false,
        }
    }

    /// Position the next search starts from.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn next_candidate(&mut self) -> Option<RuleMatch<'u>> {
        match &mut self.source {
            StreamSource::Text(re) => {
                let caps = re.captures_at(self.text, self.cursor)?;
                RuleMatch::from_captures(re, &caps)
            }
            StreamSource::Buffered(matches) => {
                let cursor = self.cursor;
                matches.find(|m| m.span.start >= cursor)
            }
        }
    }

    fn advance_past(&self, span: Span) -> usize {
        if span.end > span.start {
            return span.end;
        }
        let step = self.text[span.end..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        span.end + step
    }
}

impl<'r, 'u> Iterator for MatchStream<'r, 'u> {
    type Item = Result<RuleMatch<'u>, Stalled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor > self.text.len() {
            return None;
        }

        let Some(m) = self.next_candidate() else {
            self.done = true;
            return None;
        };

        let next = self.advance_past(m.span);
        if next <= self.cursor {
            self.done = true;
            return Some(Err(Stalled {
                position: self.cursor,
            }));
        }
        self.cursor = next;
        Some(Ok(m))
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("rule '{rule_id}' made no progress at byte {position}")]
    NoProgress { rule_id: String, position: usize },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("rule '{rule_id}' produced an invalid edit: {source}")]
    InvalidEdit {
        rule_id: String,
        #[source]
        source: EditError,
    },
}

/// Counters for one rule over one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleRun {
    pub skipped: bool,
    pub matched: usize,
    pub declined: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Whether a rule can possibly fire on this unit.
pub fn applicable(rule: &dyn Rule, unit: &UnitContext<'_>) -> bool {
    match rule.mode() {
        MatchMode::Contextual(marker) if !unit.has_any(marker) => false,
        _ => match rule.pattern() {
            RulePattern::Text(re) => re.is_match(unit.text()),
            RulePattern::Structural(_) => true,
        },
    }
}

/// Run one rule over a unit, offering every synthesized edit to `out`.
pub fn drive(
    rule: &dyn Rule,
    unit: &UnitContext<'_>,
    out: &mut Compositor<'_>,
) -> Result<RuleRun, MatchError> {
    if !applicable(rule, unit) {
        return Ok(RuleRun {
            skipped: true,
            ..RuleRun::default()
        });
    }

    let mut run = RuleRun::default();
    for candidate in MatchStream::new(rule.pattern(), unit.text()) {
        let m = candidate.map_err(|stalled| MatchError::NoProgress {
            rule_id: rule.id().to_string(),
            position: stalled.position,
        })?;
        run.matched += 1;

        match rule.synthesize(&m, unit)? {
            Synthesis::Decline => run.declined += 1,
            Synthesis::Replace(replacement) => {
                let edit = Edit::new(m.span, replacement, rule.id(), m.text);
                let offered = out.offer(edit).map_err(|source| MatchError::InvalidEdit {
                    rule_id: rule.id().to_string(),
                    source,
                })?;
                match offered {
                    Offered::Accepted => run.accepted += 1,
                    Offered::Rejected(_) => run.rejected += 1,
                }
            }
        }
    }

    debug!(
        rule = rule.id(),
        matched = run.matched,
        accepted = run.accepted,
        rejected = run.rejected,
        "rule applied"
    );
    Ok(run)
}
