//! Error types for stagebox.

use thiserror::Error;

/// Common error type for stagebox.
#[derive(Error, Debug)]
pub enum StageboxError {
    /// A user-supplied path escapes its root or is malformed.
    ///
    /// Raised before any filesystem call is made.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No active session, or the session is not allowed to do this.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but the role is insufficient.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Upload larger than the session's quota.
    #[error("upload of {size} bytes exceeds the limit of {limit} bytes")]
    QuotaExceeded {
        /// Size that was declared or streamed so far.
        size: u64,
        /// The session's limit.
        limit: u64,
    },

    /// I/O error (rename, copy, mkdir or delete failed at the OS level).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the user configuration back to disk failed.
    #[error("failed to persist configuration: {0}")]
    ConfigPersist(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),
}

/// Result type alias for stagebox operations.
pub type Result<T> = std::result::Result<T, StageboxError>;

impl StageboxError {
    /// Map an I/O error, turning `NotFound` into [`StageboxError::NotFound`]
    /// labelled with `what`.
    pub fn from_io(err: std::io::Error, what: impl Into<String>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StageboxError::NotFound(what.into()),
            std::io::ErrorKind::AlreadyExists => StageboxError::AlreadyExists(what.into()),
            _ => StageboxError::Io(err),
        }
    }
}
