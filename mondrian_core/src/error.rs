// Configuration errors for the composition pipeline.
//
// Everything that can go wrong is caught before the interpreter starts:
// malformed grammar *strings* are absorbed by the interpreter's recovery
// rules and never surface here. What does surface is bad configuration:
// a policy with impossible thresholds, a palette with nothing to sample,
// a rule table with unusable weights, or JSON that does not parse.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid constraint policy: {0}")]
    InvalidPolicy(String),

    #[error("empty palette: {0} has no positive weight to sample from")]
    EmptyPalette(&'static str),

    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
