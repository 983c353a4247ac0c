use std::path::PathBuf;

use async_trait::async_trait;

use crate::descriptor::BackendKind;
use crate::entry::FileEntry;
use crate::error::StorageError;

/// Transport for one storage kind.
///
/// All paths are root-relative (see [`crate::path`]). A driver is chosen once
/// per storage at adapter construction and is never switched afterwards.
#[async_trait]
pub trait BackendDriver: Send + Sync {
    /// Backend kind this driver serves.
    fn kind(&self) -> BackendKind;

    /// List the immediate children of `dir` (empty string = root).
    ///
    /// Fails with `BackendUnavailable` when the transport cannot be reached.
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError>;

    /// Fetch the raw bytes of `path`.
    ///
    /// Fails with `FileUnreadable` on transport error or missing path.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Local filesystem location of `path`, when the backend exposes one.
    ///
    /// Remote drivers return `None`; their files are fetched with [`read`](Self::read).
    async fn local_path(&self, _path: &str) -> Result<Option<PathBuf>, StorageError> {
        Ok(None)
    }

    /// Drop any cached mount or session so the next call re-establishes it.
    async fn invalidate(&self) {}
}
