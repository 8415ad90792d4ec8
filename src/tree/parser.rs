use crate::tree::errors::TreeError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser wrapper for JavaScript units.
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    pub fn new() -> Result<Self, TreeError> {
        let mut parser = Parser::new();
        let ts_lang = SupportLang::JavaScript.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| TreeError::LanguageSet)?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeError::ParseFailed)
    }

    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed unit with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// ERROR and MISSING nodes in document order.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        let mut stack = vec![self.tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                errors.push(ErrorNode {
                    byte_start: node.start_byte(),
                    byte_end: node.end_byte(),
                    start_point: node.start_position(),
                });
            }
            if !node.has_error() {
                continue;
            }
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        errors
    }

    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
}
