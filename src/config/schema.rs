use crate::catalog::{ids, Catalog, Guard, Rule, TemplateRule};
use crate::preamble::{PreamblePatcher, Substitution};
use crate::matcher::RulePattern;
use crate::source::Marker;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RewriteConfig {
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleDef>,
    #[serde(default)]
    pub preamble_substitutions: Vec<PreambleSubstitutionDef>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Options {
    /// Emit derived position maps; unset follows the host's debug flag
    #[serde(default)]
    pub source_map: Option<bool>,
    #[serde(default)]
    pub engine: Engine,
    /// Re-parse rewritten units and warn on new syntax errors
    #[serde(default)]
    pub validate_output: bool,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    #[default]
    Text,
    Tree,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Text => write!(f, "text"),
            Engine::Tree => write!(f, "tree"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    #[default]
    Regex,
    AstGrep,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CustomRuleDef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: PatternKind,
    pub pattern: String,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub guard: Option<GuardDef>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardDef {
    /// Capture holding the identifier to look up (group index or name)
    pub capture: String,
    pub marker: Marker,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreambleSubstitutionDef {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default = "default_global")]
    pub global: bool,
}

fn default_global() -> bool {
    true
}

impl CustomRuleDef {
    /// Compile into a catalog rule.
    pub fn build(&self) -> Result<TemplateRule, ValidationIssue> {
        let invalid = |message: String| ValidationIssue::InvalidPattern {
            id: self.id.clone(),
            message,
        };

        let rule = match self.kind {
            PatternKind::Regex => {
                TemplateRule::regex(&self.id, &self.pattern, &self.replacement, self.case_insensitive)
                    .map_err(|e| invalid(e.to_string()))?
            }
            PatternKind::AstGrep => TemplateRule::structural(&self.id, &self.pattern, &self.replacement)
                .map_err(|e| invalid(e.to_string()))?,
        };
        let rule = match &self.description {
            Some(description) => rule.with_description(description),
            None => rule,
        };

        let Some(guard) = &self.guard else {
            return Ok(rule);
        };
        let known = match rule.pattern() {
            RulePattern::Text(re) => match guard.capture.parse::<usize>() {
                Ok(index) => index < re.captures_len(),
                Err(_) => re.capture_names().flatten().any(|n| n == guard.capture),
            },
            RulePattern::Structural(pattern) => {
                pattern.as_str().contains(&format!("${}", guard.capture))
            }
        };
        if !known {
            return Err(ValidationIssue::GuardCaptureMissing {
                id: self.id.clone(),
                capture: guard.capture.clone(),
            });
        }
        Ok(rule.with_guard(Guard {
            capture: guard.capture.clone(),
            marker: guard.marker,
        }))
    }
}

impl PreambleSubstitutionDef {
    pub fn build(&self) -> Result<Substitution, ValidationIssue> {
        Substitution::new(&self.id, &self.pattern, &self.replacement, self.global).map_err(|e| {
            ValidationIssue::InvalidPattern {
                id: self.id.clone(),
                message: e.to_string(),
            }
        })
    }
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for rule in &self.custom_rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    id: None,
                    field: "custom_rules.id",
                });
                continue;
            }
            if ids::ALL.contains(&rule.id.as_str()) {
                issues.push(ValidationIssue::BuiltinCollision {
                    id: rule.id.clone(),
                    section: "custom_rules",
                });
            }
            if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    id: rule.id.clone(),
                    section: "custom_rules",
                });
            }
            if rule.pattern.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    id: Some(rule.id.clone()),
                    field: "pattern",
                });
                continue;
            }
            if let Err(issue) = rule.build() {
                issues.push(issue);
            }
        }

        let builtin = PreamblePatcher::builtin();
        let builtin_ids = builtin.ids();
        let mut seen = HashSet::new();
        for sub in &self.preamble_substitutions {
            if sub.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    id: None,
                    field: "preamble_substitutions.id",
                });
                continue;
            }
            if builtin_ids.contains(&sub.id.as_str()) {
                issues.push(ValidationIssue::BuiltinCollision {
                    id: sub.id.clone(),
                    section: "preamble_substitutions",
                });
            }
            if !seen.insert(sub.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    id: sub.id.clone(),
                    section: "preamble_substitutions",
                });
            }
            if sub.pattern.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    id: Some(sub.id.clone()),
                    field: "pattern",
                });
                continue;
            }
            if let Err(issue) = sub.build() {
                issues.push(issue);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Built-in rules followed by the configured custom rules.
    pub fn catalog(&self) -> Result<Catalog, ValidationError> {
        let custom = self
            .custom_rules
            .iter()
            .map(|def| def.build().map(|rule| Box::new(rule) as Box<dyn Rule>))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|issue| ValidationError {
                issues: vec![issue],
            })?;
        Ok(Catalog::builtin().with_rules(custom))
    }

    /// Built-in preamble substitutions followed by the configured ones.
    pub fn preamble(&self) -> Result<PreamblePatcher, ValidationError> {
        let extra = self
            .preamble_substitutions
            .iter()
            .map(PreambleSubstitutionDef::build)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|issue| ValidationError {
                issues: vec![issue],
            })?;
        Ok(PreamblePatcher::builtin().with_substitutions(extra))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        id: String,
        section: &'static str,
    },
    BuiltinCollision {
        id: String,
        section: &'static str,
    },
    InvalidPattern {
        id: String,
        message: String,
    },
    GuardCaptureMissing {
        id: String,
        capture: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { id, field } => match id {
                Some(id) => write!(f, "'{id}' missing required field '{field}'"),
                None => write!(f, "entry missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { id, section } => {
                write!(f, "duplicate id '{id}' in {section}")
            }
            ValidationIssue::BuiltinCollision { id, section } => {
                write!(f, "id '{id}' in {section} collides with a built-in rule")
            }
            ValidationIssue::InvalidPattern { id, message } => {
                write!(f, "'{id}' has an invalid pattern: {message}")
            }
            ValidationIssue::GuardCaptureMissing { id, capture } => {
                write!(f, "'{id}' guard references capture '{capture}' not present in its pattern")
            }
        }
    }
}
