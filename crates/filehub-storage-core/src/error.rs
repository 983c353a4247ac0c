use thiserror::Error;

/// Errors surfaced by storage drivers, adapters and the search federator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Unknown or disabled storage id.
    #[error("Storage '{0}' not found or not enabled")]
    StorageNotFound(String),

    /// Transport-level failure: mount, authentication, remote command.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A specific file could not be read or decoded.
    #[error("File unreadable: {0}")]
    FileUnreadable(String),

    /// OCR failure. Callers treat this as empty text.
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    /// Malformed tool arguments.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Path escapes the storage root or is otherwise malformed.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Check if this is an unknown or disabled storage id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::StorageNotFound(_))
    }

    /// Check if this error concerns the backend transport as a whole rather
    /// than a single file.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, StorageError::BackendUnavailable(_))
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
