//! JavaScript language support via ast-grep-language.

pub use ast_grep_language::SupportLang;

/// The language every unit is parsed as.
pub fn javascript() -> SupportLang {
    SupportLang::JavaScript
}
