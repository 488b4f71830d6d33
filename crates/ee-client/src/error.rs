//! Error types for backend access.

use thiserror::Error;

/// Errors that can occur while talking to the processing backend.
#[derive(Error, Debug)]
pub enum EeError {
    /// Client construction or authentication failed.
    #[error("backend initialization failed: {0}")]
    Initialization(String),

    /// Network-level failure (connect, TLS, body read).
    #[error("backend transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The backend answered with a payload we could not interpret.
    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),

    /// A geometry could not be built from the supplied coordinates.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl EeError {
    /// Create an Initialization error.
    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create an InvalidResponse error.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}

impl From<reqwest::Error> for EeError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for EeError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, EeError>;
