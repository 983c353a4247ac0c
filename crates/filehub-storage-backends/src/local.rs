use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filehub_storage_core::path::{join_relative, normalize_relative};
use filehub_storage_core::{BackendDriver, BackendKind, FileEntry, StorageError};
use tracing::{debug, instrument};

/// Direct filesystem driver.
///
/// Also used by the SMB driver against the mount point once the share is mounted.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    storage_id: String,
    root: PathBuf,
}

impl LocalDriver {
    pub fn new(storage_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            storage_id: storage_id.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a root-relative path onto the filesystem.
    fn resolve(&self, rel: &str) -> Result<(String, PathBuf), StorageError> {
        let rel = normalize_relative(rel)?;
        let mut path = self.root.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        Ok((rel, path))
    }
}

#[async_trait]
impl BackendDriver for LocalDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let (rel_dir, dir_path) = self.resolve(dir)?;

        let mut read_dir = tokio::fs::read_dir(&dir_path).await.map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "Failed to read directory {}: {}",
                dir_path.display(),
                e
            ))
        })?;

        let mut entries: Vec<FileEntry> = Vec::new();

        loop {
            let entry = match read_dir.next_entry().await {
                Ok(Some(e)) => e,
                Ok(None) => break,
                Err(e) => {
                    return Err(StorageError::BackendUnavailable(format!(
                        "Failed to read directory {}: {}",
                        dir_path.display(),
                        e
                    )))
                }
            };

            // Follows symlinks; dangling links and races with deletion are skipped
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            let is_directory = metadata.is_dir();
            let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

            entries.push(FileEntry {
                path: join_relative(&rel_dir, &name),
                name,
                size: if is_directory { 0 } else { metadata.len() },
                is_directory,
                modified,
                storage_id: self.storage_id.clone(),
            });
        }

        // Sort: folders first, then by name
        entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });

        debug!("Listed {} entries in {}", entries.len(), dir_path.display());
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let (rel, file_path) = self.resolve(path)?;

        tokio::fs::read(&file_path).await.map_err(|e| {
            StorageError::FileUnreadable(format!("Failed to read file {}: {}", rel, e))
        })
    }

    async fn local_path(&self, path: &str) -> Result<Option<PathBuf>, StorageError> {
        let (_, file_path) = self.resolve(path)?;
        Ok(Some(file_path))
    }
}
