//! Syntax-tree equivalent engine.
//!
//! Produces the same rewrite as the text catalog by walking a tree-sitter
//! JavaScript tree instead of scanning text. Node predicates test syntax
//! node kinds and fields, so access sites nested inside other rewritten
//! expressions are still found.

pub mod engine;
pub mod errors;
pub mod parser;
pub mod validator;

pub use engine::{rewrite_tree, rewrite_tree_filtered, TreeRun};
pub use errors::TreeError;
pub use parser::{ErrorNode, JsParser, ParsedSource};
pub use validator::{check_output, SyntaxRegression};
