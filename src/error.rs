//! Error types for the kirinuki-ftp library.

use thiserror::Error;

/// Errors that can occur while browsing the catalog or transferring items.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, detected before any work starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote catalog could not be listed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// An item could not be fetched to local storage.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// An item could not be pushed to the remote destination.
    #[error("Push failed: {0}")]
    Push(String),

    /// The remote destination is unreachable or the session was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Local artifacts could not be removed after a run.
    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON from the catalog API.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error means the remote destination is gone.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// A specialized `Result` type for kirinuki-ftp operations.
pub type Result<T> = std::result::Result<T, Error>;
