use crate::edit::Span;
use crate::matcher::RuleMatch;
use crate::sg::errors::AstGrepError;
use crate::sg::lang::javascript;
use ast_grep_core::{AstGrep, Pattern};
use std::collections::HashMap;

/// A compiled ast-grep pattern over JavaScript.
#[derive(Clone)]
pub struct StructuralPattern {
    source: String,
    pattern: Pattern,
}

impl StructuralPattern {
    pub fn compile(source: &str) -> Result<Self, AstGrepError> {
        if source.trim().is_empty() {
            return Err(AstGrepError::EmptyPattern);
        }
        let pattern =
            Pattern::try_new(source, javascript()).map_err(|e| AstGrepError::InvalidPattern {
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Every match in `text`, ordered by start offset.
    ///
    /// Nested matches are kept; the caller's cursor skips the ones that start
    /// inside an earlier match. Metavariable captures become named captures.
    pub fn find_all<'u>(&self, text: &'u str) -> Vec<RuleMatch<'u>> {
        let sg = AstGrep::new(text, javascript());
        let root = sg.root();
        let mut matches: Vec<RuleMatch<'u>> = root
            .find_all(&self.pattern)
            .map(|m| {
                let range = m.get_node().range();
                let named: HashMap<String, String> = m.get_env().clone().into();
                RuleMatch::new(Span::new(range.start, range.end), &text[range.start..range.end])
                    .with_named(named)
            })
            .collect();
        matches.sort_by_key(|m| m.span.start);
        matches
    }
}

impl std::fmt::Debug for StructuralPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StructuralPattern").field(&self.source).finish()
    }
}
