use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the helpdesk workspace.
///
/// Every crate returns this type so that `?` works across crate boundaries.
/// The API layer maps variants onto HTTP status codes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HelpdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus file not found: {}", .0.display())]
    MissingCorpusFile(PathBuf),

    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Invalid ticket: '{field}' is required")]
    InvalidTicket { field: &'static str },

    #[error("Category index {0} is outside the taxonomy")]
    CategoryNotFound(usize),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for HelpdeskError {
    fn from(err: toml::de::Error) -> Self {
        HelpdeskError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for HelpdeskError {
    fn from(err: toml::ser::Error) -> Self {
        HelpdeskError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for HelpdeskError {
    fn from(err: serde_json::Error) -> Self {
        HelpdeskError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for helpdesk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;
