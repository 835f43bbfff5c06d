//! Error types for geosite2abp.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for geosite2abp operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty rule-list identifier
    #[error("invalid rule-list identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Rule list could not be retrieved
    #[error("failed to fetch '{identifier}': {reason}")]
    Fetch { identifier: String, reason: String },

    /// Output file could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Build a fetch error for the given identifier.
    pub fn fetch(identifier: &str, reason: impl Into<String>) -> Self {
        Error::Fetch {
            identifier: identifier.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for geosite2abp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A rule line that could not be interpreted.
///
/// Warnings are logged and collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number in the source text
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
    /// Why the line was skipped
    pub reason: &'static str,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.reason, self.text)
    }
}
