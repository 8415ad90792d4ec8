use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AstGrepError {
    #[error("invalid structural pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("structural pattern must not be empty")]
    EmptyPattern,
}
