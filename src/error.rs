use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while relaying generations or storing records.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure classes used to pick a status code and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was empty or malformed; detected before any I/O.
    InvalidInput,
    /// The generative backend rejected, timed out or errored.
    Provider,
    /// The record store rejected a read or write.
    Store,
    /// The referenced record does not exist.
    NotFound,
    /// Startup configuration or local I/O failure.
    Internal,
}

impl ErrorKind {
    /// Client-fault kinds are returned immediately and never worth retrying.
    pub fn is_client_fault(self) -> bool {
        matches!(self, ErrorKind::InvalidInput | ErrorKind::NotFound)
    }
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth(message.into())
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Error::Store(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    /// Classify this error into the relay's failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Http(_)
            | Error::Auth(_)
            | Error::Serialization(_)
            | Error::Provider { .. }
            | Error::Streaming(_)
            | Error::Timeout(_) => ErrorKind::Provider,
            Error::Store(_) => ErrorKind::Store,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Config(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }
}
