use crate::parser::ParserError;
use thiserror::Error;

/// Errors the minifier can report to its caller.
///
/// The passes themselves are total over the grammar: once a tree exists the
/// pipeline always completes and produces text. Only the parse stage fails.
#[derive(Debug, Error)]
pub enum MinifyError {
    #[error("parse error: {0}")]
    Parse(#[from] ParserError),
}
