pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_optional, ConfigError};
pub use schema::{
    CustomRuleDef, Engine, GuardDef, Options, PatternKind, PreambleSubstitutionDef,
    RewriteConfig, ValidationError, ValidationIssue,
};
