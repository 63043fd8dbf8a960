//! Error types for highlighting
//!
//! Language, grammar and parse failures are recoverable: the highlighter turns them into
//! plain escaped output unless strict mode is requested. `Configuration` is a setup bug
//! and always reaches the caller.

use thiserror::Error;

/// Errors that can occur while registering, loading or highlighting.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable default theme was ever registered.
    #[error("default theme \"{0}\" is not registered")]
    Configuration(String),

    /// The language id was never registered.
    #[error("language \"{0}\" is not registered")]
    UnknownLanguage(String),

    /// The language definition is missing a mandatory part or carries a malformed query.
    #[error("invalid language definition for \"{id}\": {reason}")]
    InvalidLanguageDefinition { id: String, reason: String },

    /// A grammar could not be fetched, decoded or compiled by the parsing backend.
    #[error("parsing backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The parser produced no usable tree.
    #[error("failed to parse source as \"{0}\"")]
    ParseFailure(String),

    /// A theme document could not be parsed.
    #[error("invalid theme: {0}")]
    InvalidTheme(String),

    /// Reading a theme, manifest or config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_language(id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidLanguageDefinition {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this failure belongs to the language/parse stage, which non-strict
    /// highlighting degrades over instead of reporting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Configuration(_))
    }
}

/// Result type for highlighting operations.
pub type Result<T> = std::result::Result<T, Error>;
