//! Source units and the read-only per-unit context handed to every rule.

use crate::position::PositionMap;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Immutable original text of one code module plus an optional position map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    identity: String,
    text: String,
    position_map: Option<PositionMap>,
}

impl SourceUnit {
    pub fn new(identity: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            text: text.into(),
            position_map: None,
        }
    }

    pub fn with_position_map(mut self, map: PositionMap) -> Self {
        self.position_map = Some(map);
        self
    }

    /// Stable identity of the unit (typically its output asset name).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position_map(&self) -> Option<&PositionMap> {
        self.position_map.as_ref()
    }
}

/// Marker kinds recognised elsewhere in a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Marker {
    /// `// EXTERNAL MODULE: ...` comment directly followed by `var NAME =`
    ExternalModule,
    /// `NAME = /*#__PURE__*/ ...`
    PureAnnotated,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::ExternalModule => write!(f, "external-module"),
            Marker::PureAnnotated => write!(f, "pure-annotated"),
        }
    }
}

fn external_module_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"// EXTERNAL MODULE.*\r?\nvar ([\w$]+) =").expect("static regex compiles")
    })
}

fn pure_annotated_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\w$]+) = /\*#__PURE__\*/").expect("static regex compiles"))
}

/// Whole-unit lookups, computed once per unit and shared by all rules.
#[derive(Debug, Clone)]
pub struct UnitContext<'u> {
    text: &'u str,
    external_modules: HashSet<&'u str>,
    pure_annotated: HashSet<&'u str>,
}

impl<'u> UnitContext<'u> {
    pub fn new(text: &'u str) -> Self {
        let collect = |re: &Regex| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect::<HashSet<_>>()
        };
        Self {
            text,
            external_modules: collect(external_module_decl()),
            pure_annotated: collect(pure_annotated_decl()),
        }
    }

    /// The pristine unit text.
    pub fn text(&self) -> &'u str {
        self.text
    }

    fn set(&self, marker: Marker) -> &HashSet<&'u str> {
        match marker {
            Marker::ExternalModule => &self.external_modules,
            Marker::PureAnnotated => &self.pure_annotated,
        }
    }

    /// Whether `ident` is declared with the given marker somewhere in the unit.
    pub fn is_marked(&self, marker: Marker, ident: &str) -> bool {
        self.set(marker).contains(ident)
    }

    pub fn has_any(&self, marker: Marker) -> bool {
        !self.set(marker).is_empty()
    }

    /// Text immediately before `offset`, if any.
    pub fn char_before(&self, offset: usize) -> Option<char> {
        self.text.get(..offset)?.chars().next_back()
    }

    /// Text starting at `offset`, if any.
    pub fn char_after(&self, offset: usize) -> Option<char> {
        self.text.get(offset..)?.chars().next()
    }
}
