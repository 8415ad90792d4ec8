use crate::edit::EditError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("node rule '{rule_id}' produced an invalid edit: {source}")]
    InvalidEdit {
        rule_id: String,
        #[source]
        source: EditError,
    },
}
