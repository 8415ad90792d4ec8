//! Rewrite session: one catalog, one cache, many units.
//!
//! [`Rewriter::rewrite_unit`] runs the catalog (text or tree engine) over a
//! single unit and composes the result. [`Rewriter::rewrite_batch`] fans
//! units out over rayon workers; every unit succeeds or fails on its own and
//! the batch always returns one report per input.

use crate::cache::{CacheError, UnitCache};
use crate::catalog::{Catalog, Rule, SynthesisError};
use crate::compose::{AppliedEdit, Compositor};
use crate::config::{Engine, Options, RewriteConfig, ValidationError};
use crate::edit::{EditConflict, EditError};
use crate::matcher::{drive, MatchError};
use crate::position::PositionMap;
use crate::preamble::{PatchedPreamble, PreamblePatcher};
use crate::source::{SourceUnit, UnitContext};
use crate::tree::{self, SyntaxRegression, TreeError};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, debug_span, warn};

/// Non-fatal findings attached to a rewritten unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteWarning {
    Conflict(EditConflict),
    SyntaxRegression(SyntaxRegression),
}

impl fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteWarning::Conflict(conflict) => write!(f, "{conflict}"),
            RewriteWarning::SyntaxRegression(regression) => write!(
                f,
                "rewritten unit has {} syntax error(s), original had {}",
                regression.errors_after, regression.errors_before
            ),
        }
    }
}

/// Final text of one unit plus what happened on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedUnit {
    pub identity: String,
    pub text: String,
    pub position_map: Option<PositionMap>,
    pub applied: Vec<AppliedEdit>,
    pub warnings: Vec<RewriteWarning>,
    pub engine: Engine,
}

impl TransformedUnit {
    pub fn conflicts(&self) -> impl Iterator<Item = &EditConflict> {
        self.warnings.iter().filter_map(|w| match w {
            RewriteWarning::Conflict(conflict) => Some(conflict),
            RewriteWarning::SyntaxRegression(_) => None,
        })
    }

    /// Number of accepted edits produced by `rule_id`.
    pub fn applied_count(&self, rule_id: &str) -> usize {
        self.applied.iter().filter(|e| e.rule_id == rule_id).count()
    }
}

impl AsRef<str> for TransformedUnit {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("rule '{rule_id}' made no progress at byte {position}")]
    NoProgress { rule_id: String, position: usize },

    #[error(transparent)]
    SynthesisFailure(#[from] SynthesisError),

    #[error("rule '{rule_id}' produced an invalid edit: {source}")]
    InvalidEdit {
        rule_id: String,
        #[source]
        source: EditError,
    },

    #[error(transparent)]
    CacheCorruption(#[from] CacheError),

    #[error("syntax tree engine failed: {0}")]
    Tree(#[from] TreeError),
}

impl From<MatchError> for UnitError {
    fn from(error: MatchError) -> Self {
        match error {
            MatchError::NoProgress { rule_id, position } => UnitError::NoProgress { rule_id, position },
            MatchError::Synthesis(source) => UnitError::SynthesisFailure(source),
            MatchError::InvalidEdit { rule_id, source } => UnitError::InvalidEdit { rule_id, source },
        }
    }
}

/// A unit that could not be rewritten, handed back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub error: UnitError,
    pub unrewritten: String,
}

/// Outcome for one unit of a batch.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub identity: String,
    pub outcome: Result<Arc<TransformedUnit>, UnitFailure>,
}

impl UnitReport {
    /// Text to ship: the rewrite on success, the original on failure.
    pub fn text(&self) -> &str {
        match &self.outcome {
            Ok(unit) => &unit.text,
            Err(failure) => &failure.unrewritten,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct Rewriter {
    catalog: Arc<Catalog>,
    preamble: PreamblePatcher,
    cache: UnitCache<TransformedUnit>,
    engine: Engine,
    source_map: bool,
    validate_output: bool,
}

impl Rewriter {
    /// Build a session from configuration.
    ///
    /// `debug` is the host's debug setting, used for position maps when the
    /// configuration leaves `source_map` unset.
    pub fn new(config: &RewriteConfig, debug: bool) -> Result<Self, ValidationError> {
        Ok(Self::with_parts(
            config.catalog()?,
            config.preamble()?,
            &config.options,
            debug,
        ))
    }

    pub fn with_parts(
        catalog: Catalog,
        preamble: PreamblePatcher,
        options: &Options,
        debug: bool,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            preamble,
            cache: UnitCache::new(),
            engine: options.engine,
            source_map: options.source_map.unwrap_or(debug),
            validate_output: options.validate_output,
        }
    }

    /// Built-in catalog and preamble substitutions, text engine, no maps.
    pub fn builtin() -> Self {
        Self::with_parts(
            Catalog::builtin(),
            PreamblePatcher::builtin(),
            &Options::default(),
            false,
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn preamble(&self) -> &PreamblePatcher {
        &self.preamble
    }

    pub fn cache(&self) -> &UnitCache<TransformedUnit> {
        &self.cache
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn source_map_enabled(&self) -> bool {
        self.source_map
    }

    /// Rewrite one unit, or return its cached result.
    pub fn rewrite_unit(&self, unit: &SourceUnit) -> Result<Arc<TransformedUnit>, UnitError> {
        self.cache
            .get_or_compute(unit.identity(), unit.text(), || self.transform(unit))
    }

    /// Rewrite many units in parallel, collecting one report per unit in input order.
    pub fn rewrite_batch(&self, units: &[SourceUnit]) -> Vec<UnitReport> {
        units
            .par_iter()
            .map(|unit| {
                let outcome = self.rewrite_unit(unit).map_err(|error| {
                    warn!(identity = unit.identity(), %error, "unit left unrewritten");
                    UnitFailure {
                        error,
                        unrewritten: unit.text().to_string(),
                    }
                });
                UnitReport {
                    identity: unit.identity().to_string(),
                    outcome,
                }
            })
            .collect()
    }

    /// Apply the preamble substitutions one after another.
    pub fn patch_preamble(&self, text: &str) -> PatchedPreamble {
        self.preamble.apply(text)
    }

    /// Apply the preamble substitutions in a single splice over the original.
    pub fn patch_preamble_single_pass(&self, text: &str) -> PatchedPreamble {
        self.preamble.apply_single_pass(text)
    }

    /// Rewrite without consulting the cache.
    pub fn transform(&self, unit: &SourceUnit) -> Result<TransformedUnit, UnitError> {
        let _span = debug_span!("unit", identity = unit.identity(), engine = %self.engine).entered();

        let context = UnitContext::new(unit.text());
        let mut out = Compositor::new(unit.text());

        match self.engine {
            Engine::Text => {
                for rule in self.catalog.rules() {
                    drive(rule, &context, &mut out)?;
                }
            }
            Engine::Tree => {
                let catalog = &self.catalog;
                let run = tree::rewrite_tree_filtered(&context, &mut out, |id| {
                    catalog.get(id).is_some_and(|rule| rule.is_builtin())
                })?;
                if run.input_had_errors {
                    debug!("input already contains syntax errors");
                }
                for rule in self.catalog.custom_rules() {
                    drive(rule, &context, &mut out)?;
                }
            }
        }

        let input_map = self.source_map.then(|| {
            unit.position_map()
                .cloned()
                .unwrap_or_else(|| PositionMap::identity(unit.identity(), unit.text()))
        });
        let composed = out.finish(input_map.as_ref());

        let mut warnings: Vec<RewriteWarning> = composed
            .conflicts
            .into_iter()
            .map(RewriteWarning::Conflict)
            .collect();
        if self.validate_output {
            if let Some(regression) = tree::check_output(unit.text(), &composed.text)? {
                warn!(identity = unit.identity(), errors = regression.errors_after, "rewrite introduced syntax errors");
                warnings.push(RewriteWarning::SyntaxRegression(regression));
            }
        }

        debug!(
            edits = composed.applied.len(),
            warnings = warnings.len(),
            "unit rewritten"
        );
        Ok(TransformedUnit {
            identity: unit.identity().to_string(),
            text: composed.text,
            position_map: composed.position_map,
            applied: composed.applied,
            warnings,
            engine: self.engine,
        })
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::builtin()
    }
}
