//! Caller-supplied rules: a pattern plus a replacement template.

use super::{Rule, Synthesis, SynthesisError};
use crate::matcher::{MatchMode, RuleMatch, RulePattern};
use crate::sg::{AstGrepError, StructuralPattern};
use crate::source::{Marker, UnitContext};
use regex::RegexBuilder;

/// Restricts a custom rule to matches whose capture is a marked identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    pub capture: String,
    pub marker: Marker,
}

pub struct TemplateRule {
    id: String,
    description: String,
    pattern: RulePattern,
    template: String,
    guard: Option<Guard>,
}

impl TemplateRule {
    /// Regex rule; the template uses `$1`, `${name}` and `$$` references.
    pub fn regex(
        id: impl Into<String>,
        pattern: &str,
        template: impl Into<String>,
        case_insensitive: bool,
    ) -> Result<Self, regex::Error> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self::with_pattern(id, RulePattern::Text(re), template))
    }

    /// Structural rule over JavaScript; the template uses `$NAME` metavariables.
    pub fn structural(
        id: impl Into<String>,
        pattern: &str,
        template: impl Into<String>,
    ) -> Result<Self, AstGrepError> {
        let pattern = StructuralPattern::compile(pattern)?;
        Ok(Self::with_pattern(id, RulePattern::Structural(pattern), template))
    }

    fn with_pattern(id: impl Into<String>, pattern: RulePattern, template: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            description: format!("custom rule '{id}'"),
            id,
            pattern,
            template: template.into(),
            guard: None,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }
}

impl Rule for TemplateRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn mode(&self) -> MatchMode {
        match &self.guard {
            Some(guard) => MatchMode::Contextual(guard.marker),
            None => MatchMode::Simple,
        }
    }

    fn pattern(&self) -> &RulePattern {
        &self.pattern
    }

    fn synthesize(
        &self,
        m: &RuleMatch<'_>,
        unit: &UnitContext<'_>,
    ) -> Result<Synthesis, SynthesisError> {
        if let Some(guard) = &self.guard {
            let ident = m.capture(&guard.capture).ok_or_else(|| {
                SynthesisError::new(&self.id, m, format!("guard capture '{}' missing", guard.capture))
            })?;
            if !unit.is_marked(guard.marker, ident) {
                return Ok(Synthesis::Decline);
            }
        }
        Ok(Synthesis::Replace(m.expand(&self.template)))
    }
}
