//! Transformation catalog: the ordered rule set applied to every unit.
//!
//! Built-in rules come first in declaration order; caller-supplied rules are
//! appended and applied under the same contract. The catalog is built once
//! per session and shared read-only between workers.

pub mod builtin;
pub mod custom;

use crate::matcher::{MatchMode, RuleMatch, RulePattern};
use crate::source::UnitContext;
use thiserror::Error;

pub use custom::{Guard, TemplateRule};

/// Stable ids of the built-in rules, shared by the text and tree engines.
pub mod ids {
    pub const ES_MODULE_MARKER: &str = "es-module-marker";
    pub const EXPORT_INSTALLER: &str = "export-installer";
    pub const BIND_LOADER: &str = "bind-loader";
    pub const IMPORTED_GETTER: &str = "imported-getter";
    pub const DEFAULT_EXPORT: &str = "default-export";
    pub const CONCATENATED_DEFAULT_EXPORT: &str = "concatenated-default-export";
    pub const MODULE_DEFAULT_GETTER: &str = "module-default-getter";
    pub const OBJECT_KEYS_LOOP: &str = "object-keys-loop";
    pub const LOADER_MEMBER_GETTER: &str = "loader-member-getter";
    pub const PURE_MEMBER_GETTER: &str = "pure-member-getter";
    pub const EXTERNAL_MEMBER_GETTER: &str = "external-member-getter";
    pub const STAR_IMPORT_FLATTEN: &str = "star-import-flatten";

    /// All built-in ids in declaration order.
    pub const ALL: [&str; 12] = [
        ES_MODULE_MARKER,
        EXPORT_INSTALLER,
        BIND_LOADER,
        IMPORTED_GETTER,
        DEFAULT_EXPORT,
        CONCATENATED_DEFAULT_EXPORT,
        MODULE_DEFAULT_GETTER,
        OBJECT_KEYS_LOOP,
        LOADER_MEMBER_GETTER,
        PURE_MEMBER_GETTER,
        EXTERNAL_MEMBER_GETTER,
        STAR_IMPORT_FLATTEN,
    ];
}

/// What a rule decided for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Replace(String),
    Decline,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule '{rule_id}' failed to synthesize a replacement at byte {position}: {message}")]
pub struct SynthesisError {
    pub rule_id: String,
    pub position: usize,
    pub message: String,
}

impl SynthesisError {
    pub fn new(rule_id: &str, m: &RuleMatch<'_>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            position: m.span.start,
            message: message.into(),
        }
    }
}

/// A named transformation: pattern plus synthesis function.
pub trait Rule: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn mode(&self) -> MatchMode {
        MatchMode::Simple
    }

    fn pattern(&self) -> &RulePattern;

    /// Produce replacement text for the match, or decline.
    ///
    /// `unit` gives access to the whole pristine unit, not only the match.
    fn synthesize(
        &self,
        m: &RuleMatch<'_>,
        unit: &UnitContext<'_>,
    ) -> Result<Synthesis, SynthesisError>;

    fn is_builtin(&self) -> bool {
        false
    }
}

/// Ordered, read-only rule set.
pub struct Catalog {
    rules: Vec<Box<dyn Rule>>,
}

impl Catalog {
    /// The built-in rules only.
    pub fn builtin() -> Self {
        Self {
            rules: builtin::rules(),
        }
    }

    /// An empty catalog, mostly useful in tests.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after everything already present.
    pub fn push(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Box<dyn Rule>>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    /// Rules appended after the built-in set.
    pub fn custom_rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules().filter(|rule| !rule.is_builtin())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rules().map(Rule::id).collect()
    }

    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules().find(|rule| rule.id() == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
