//! es3-harmony: rewrites webpack harmony-module output for ES3 engines.
//!
//! Legacy engines reject ES5 accessor properties, so every getter that
//! webpack installs with `Object.defineProperty` has to become a plain
//! property plus explicit calls at each access site. This crate does that
//! as a post-processing pass over emitted code units.
//!
//! # Architecture
//!
//! Every rewrite compiles down to one primitive: an [`Edit`], a verified
//! replacement of a byte span of the pristine unit text. Rules never touch the
//! text directly. They produce candidate edits, and the [`Compositor`] keeps a
//! disjoint set of them and splices the result in one pass, deriving a
//! position map along the way.
//!
//! Two interchangeable engines produce candidates:
//!
//! - the text engine drives each [`Rule`] of the [`Catalog`] through a lazy
//!   match stream over the unit ([`matcher::drive`]);
//! - the tree engine walks a tree-sitter JavaScript tree and tests node
//!   predicates in catalog order ([`tree::rewrite_tree`]).
//!
//! A [`Rewriter`] ties a catalog to an idempotency cache and runs units one
//! at a time or as a parallel batch.
//!
//! # Example
//!
//! ```
//! use es3_harmony::{Rewriter, SourceUnit};
//!
//! let rewriter = Rewriter::builtin();
//! let unit = SourceUnit::new("0.js", "var d = module['default'];");
//! let out = rewriter.rewrite_unit(&unit).unwrap();
//! assert_eq!(out.text, "var d = module['default']();");
//! ```

pub mod cache;
pub mod catalog;
pub mod compose;
pub mod config;
pub mod edit;
pub mod matcher;
pub mod pool;
pub mod position;
pub mod preamble;
pub mod rewrite;
pub mod sg;
pub mod source;
pub mod tracing_config;
pub mod tree;
pub mod write;

pub use cache::{CacheError, UnitCache};
pub use catalog::{ids, Catalog, Guard, Rule, Synthesis, SynthesisError, TemplateRule};
pub use compose::{AppliedEdit, Composed, Compositor, Offered};
pub use config::{load_from_path, load_from_str, ConfigError, Engine, Options, RewriteConfig};
pub use edit::{Edit, EditConflict, EditError, EditVerification, Span};
pub use matcher::{MatchError, MatchMode, RuleMatch, RulePattern};
pub use position::PositionMap;
pub use preamble::{PatchedPreamble, PreamblePatcher, Substitution};
pub use rewrite::{
    RewriteWarning, Rewriter, TransformedUnit, UnitError, UnitFailure, UnitReport,
};
pub use source::{Marker, SourceUnit, UnitContext};
pub use tree::{SyntaxRegression, TreeError};
