use std::path::PathBuf;

use eternity_types::ContentHash;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested hash is not in the index.
    #[error("object not found: {0}")]
    NotFound(ContentHash),

    /// A publisher signature was missing or did not verify.
    #[error("not authorized for {hash}: {reason}")]
    Unauthorized { hash: ContentHash, reason: String },

    /// The index snapshot could not be encoded or decoded.
    #[error("snapshot error at {path}: {reason}")]
    Snapshot { path: PathBuf, reason: String },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn unauthorized(hash: ContentHash, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            hash,
            reason: reason.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
