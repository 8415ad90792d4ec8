//! Non-destructive multi-edit composition against one pristine source.
//!
//! Candidate edits arrive in rule order, then scan order. The compositor keeps
//! the accepted edits as an ordered set of mutually disjoint spans; a candidate
//! overlapping an accepted span is rejected (first writer wins) and recorded as
//! an [`EditConflict`]. [`Compositor::finish`] splices everything in one
//! ascending walk over the original text.

use crate::edit::{Edit, EditConflict, EditError, Span};
use crate::position::PositionMap;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Outcome of offering one candidate edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a rejected edit carries the conflict that caused it"]
pub enum Offered {
    Accepted,
    Rejected(EditConflict),
}

/// An edit that made it into the final text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub rule_id: String,
    /// Span in the original text
    pub span: Span,
    /// Span of the replacement in the output text
    pub output_span: Span,
}

/// Final text of a unit with the bookkeeping that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub text: String,
    pub position_map: Option<PositionMap>,
    pub applied: Vec<AppliedEdit>,
    pub conflicts: Vec<EditConflict>,
}

pub struct Compositor<'u> {
    source: &'u str,
    accepted: BTreeMap<(usize, usize), Edit>,
    conflicts: Vec<EditConflict>,
}

impl<'u> Compositor<'u> {
    pub fn new(source: &'u str) -> Self {
        Self {
            source,
            accepted: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn source(&self) -> &'u str {
        self.source
    }

    /// Offer a candidate edit.
    ///
    /// Malformed edits (out of range, off a char boundary, stale before-text)
    /// are errors; overlaps are not.
    pub fn offer(&mut self, edit: Edit) -> Result<Offered, EditError> {
        self.offer_group(vec![edit])
    }

    /// Offer edits that only make sense together: all are accepted or none.
    ///
    /// The first overlap found (against accepted edits or within the group)
    /// rejects the whole group with a single conflict.
    pub fn offer_group(&mut self, edits: Vec<Edit>) -> Result<Offered, EditError> {
        for edit in &edits {
            edit.validate(self.source)?;
        }

        for (i, edit) in edits.iter().enumerate() {
            let winner = self
                .find_overlap(&edit.span)
                .or_else(|| edits[..i].iter().find(|other| other.span.overlaps(&edit.span)));
            if let Some(winner) = winner {
                let conflict = EditConflict {
                    rule_id: edit.rule_id.clone(),
                    span: edit.span,
                    winner_rule_id: winner.rule_id.clone(),
                    winner_span: winner.span,
                };
                warn!(%conflict, "edit conflict");
                self.conflicts.push(conflict.clone());
                return Ok(Offered::Rejected(conflict));
            }
        }

        for edit in edits {
            trace!(rule = %edit.rule_id, span = %edit.span, "edit accepted");
            self.accepted.insert((edit.span.start, edit.span.end), edit);
        }
        Ok(Offered::Accepted)
    }

    fn find_overlap(&self, span: &Span) -> Option<&Edit> {
        // Accepted spans are disjoint and sorted, so their ends never decrease.
        self.accepted
            .range(..=(span.end, usize::MAX))
            .rev()
            .map(|(_, edit)| edit)
            .take_while(|edit| edit.span.end >= span.start)
            .find(|edit| edit.span.overlaps(span))
    }

    pub fn accepted(&self) -> impl Iterator<Item = &Edit> {
        self.accepted.values()
    }

    pub fn conflicts(&self) -> &[EditConflict] {
        &self.conflicts
    }

    /// Splice accepted edits into the original text.
    ///
    /// When `input_map` is given, the map of the output is derived from it.
    pub fn finish(self, input_map: Option<&PositionMap>) -> Composed {
        let growth: usize = self.accepted.values().map(|e| e.replacement.len()).sum();
        let mut text = String::with_capacity(self.source.len() + growth);
        let mut applied = Vec::with_capacity(self.accepted.len());
        let mut splices = Vec::with_capacity(self.accepted.len());
        let mut cursor = 0usize;

        for edit in self.accepted.into_values() {
            text.push_str(&self.source[cursor..edit.span.start]);
            let out_start = text.len();
            text.push_str(&edit.replacement);
            applied.push(AppliedEdit {
                rule_id: edit.rule_id,
                span: edit.span,
                output_span: Span::new(out_start, text.len()),
            });
            splices.push((edit.span, edit.replacement.len()));
            cursor = edit.span.end;
        }
        text.push_str(&self.source[cursor..]);

        Composed {
            text,
            position_map: input_map.map(|map| map.derive(&splices)),
            applied,
            conflicts: self.conflicts,
        }
    }
}
