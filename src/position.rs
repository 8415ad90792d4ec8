//! Position maps carried alongside a unit for debug-info preservation.
//!
//! A map relates byte offsets of a unit's text (`generated`) to positions in
//! one of the upstream `sources`. Linear mappings extend 1:1 to the bytes that
//! follow them on the same line; pinned mappings cover a rewritten region
//! coarsely, every byte resolving to the original span's start.

use crate::edit::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingKind {
    Linear,
    Pinned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Byte offset in the unit text
    pub generated: usize,
    /// Index into [`PositionMap::sources`]
    pub source: usize,
    /// Zero-based original line
    pub line: u32,
    /// Zero-based original column (bytes)
    pub column: u32,
    pub kind: MappingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMap {
    pub sources: Vec<String>,
    /// Sorted by `generated`, no two entries share a `generated` offset
    pub mappings: Vec<Mapping>,
}

impl PositionMap {
    /// Map of a text onto itself: one linear mapping per line start.
    pub fn identity(name: impl Into<String>, text: &str) -> Self {
        let mut mappings = vec![Mapping {
            generated: 0,
            source: 0,
            line: 0,
            column: 0,
            kind: MappingKind::Linear,
        }];
        let mut line = 0u32;
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line += 1;
                mappings.push(Mapping {
                    generated: idx + 1,
                    source: 0,
                    line,
                    column: 0,
                    kind: MappingKind::Linear,
                });
            }
        }
        Self {
            sources: vec![name.into()],
            mappings,
        }
    }

    /// Resolve a generated byte offset to its original position.
    pub fn lookup(&self, offset: usize) -> Option<OriginalPosition> {
        let idx = self.mappings.partition_point(|m| m.generated <= offset);
        let mapping = self.mappings.get(idx.checked_sub(1)?)?;
        let column = match mapping.kind {
            MappingKind::Linear => {
                let delta = u32::try_from(offset - mapping.generated).unwrap_or(u32::MAX);
                mapping.column.saturating_add(delta)
            }
            MappingKind::Pinned => mapping.column,
        };
        Some(OriginalPosition {
            source: mapping.source,
            line: mapping.line,
            column,
        })
    }

    /// Derive the map of rewritten text from this map and the applied splices.
    ///
    /// `splices` holds `(original span, replacement length)` pairs in ascending,
    /// disjoint order. Unedited regions keep their mappings shifted by the
    /// running length delta; each replacement is pinned to its span start and
    /// a linear mapping resumes right after it.
    pub fn derive(&self, splices: &[(Span, usize)]) -> PositionMap {
        let mut out = MappingBuilder::default();
        let mut delta: isize = 0;
        let mut next = 0usize;

        for (span, replacement_len) in splices {
            while next < self.mappings.len() && self.mappings[next].generated < span.start {
                out.push(shifted(&self.mappings[next], delta));
                next += 1;
            }
            while next < self.mappings.len() && self.mappings[next].generated < span.end {
                next += 1;
            }

            let out_start = offset_by(span.start, delta);
            if let Some(pos) = self.lookup(span.start) {
                out.push(at(out_start, pos, MappingKind::Pinned));
            }

            delta += *replacement_len as isize - span.len() as isize;
            if let Some(pos) = self.lookup(span.end) {
                out.push(at(offset_by(span.end, delta), pos, MappingKind::Linear));
            }
        }

        for mapping in &self.mappings[next..] {
            out.push(shifted(mapping, delta));
        }

        PositionMap {
            sources: self.sources.clone(),
            mappings: out.finish(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

#[derive(Default)]
struct MappingBuilder {
    mappings: Vec<Mapping>,
}

impl MappingBuilder {
    /// Later mappings at the same offset supersede earlier ones.
    fn push(&mut self, mapping: Mapping) {
        match self.mappings.last_mut() {
            Some(last) if last.generated == mapping.generated => *last = mapping,
            Some(last) if last.generated > mapping.generated => {}
            _ => self.mappings.push(mapping),
        }
    }

    fn finish(self) -> Vec<Mapping> {
        self.mappings
    }
}

fn offset_by(offset: usize, delta: isize) -> usize {
    offset.checked_add_signed(delta).unwrap_or(0)
}

fn shifted(mapping: &Mapping, delta: isize) -> Mapping {
    Mapping {
        generated: offset_by(mapping.generated, delta),
        ..mapping.clone()
    }
}

fn at(generated: usize, pos: OriginalPosition, kind: MappingKind) -> Mapping {
    Mapping {
        generated,
        source: pos.source,
        line: pos.line,
        column: pos.column,
        kind,
    }
}
