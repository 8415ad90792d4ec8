use crate::edit::Span;
use crate::pool::with_parser;
use crate::tree::errors::TreeError;
use crate::tree::parser::ErrorNode;

/// The rewritten unit parses with more syntax errors than the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxRegression {
    pub errors_before: usize,
    pub errors_after: usize,
    /// First error node in the rewritten text
    pub first: Option<Span>,
}

fn error_nodes(source: &str) -> Result<Vec<ErrorNode>, TreeError> {
    with_parser(|parser| {
        parser
            .parse_with_source(source)
            .map(|parsed| parsed.error_nodes())
    })?
}

/// Re-parse `after` and compare its error nodes with those of `before`.
///
/// Offsets shift under rewriting, so errors are compared by count.
pub fn check_output(before: &str, after: &str) -> Result<Option<SyntaxRegression>, TreeError> {
    let errors_before = error_nodes(before)?.len();
    let after_errors = error_nodes(after)?;
    if after_errors.len() <= errors_before {
        return Ok(None);
    }
    Ok(Some(SyntaxRegression {
        errors_before,
        errors_after: after_errors.len(),
        first: after_errors
            .first()
            .map(|e| Span::new(e.byte_start, e.byte_end)),
    }))
}
