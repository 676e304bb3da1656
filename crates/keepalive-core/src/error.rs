//! Error types for keepalive

use thiserror::Error;

/// Result type alias using keepalive's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for keepalive operations
#[derive(Error, Debug)]
pub enum Error {
    /// URL host is not on the allow-list
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Owner already monitors the maximum number of URLs
    #[error("Limit reached (max {limit})")]
    QuotaExceeded {
        /// Configured per-owner maximum
        limit: usize,
    },

    /// URL is already monitored for this owner
    #[error("URL already exists: {0}")]
    DuplicateUrl(String),

    /// Not found error
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of thing looked up
        entity: String,
        /// Key it was looked up by
        id: String,
    },

    /// Owner identity could not be established
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Record store backend error
    #[error("Store error: {0}")]
    Store(String),

    /// Outbound HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error was caused by caller input rather than a backend failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DomainNotAllowed(_)
                | Self::QuotaExceeded { .. }
                | Self::DuplicateUrl(_)
                | Self::Validation(_)
        )
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
