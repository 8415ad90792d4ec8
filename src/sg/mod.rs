//! ast-grep integration for structural JavaScript patterns.
//!
//! Custom rules may be written in ast-grep's metavariable syntax (`$NAME`,
//! `$$$ARGS`, `$_`) instead of a regex. Such patterns match syntax nodes, so
//! they never straddle expression boundaries.

pub mod errors;
pub mod lang;
pub mod matcher;

pub use errors::AstGrepError;
pub use lang::{javascript, SupportLang};
pub use matcher::StructuralPattern;
