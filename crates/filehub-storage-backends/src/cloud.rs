//! WebDAV cloud storage driver.
//!
//! The session (authenticated client) is validated once with a depth-0
//! PROPFIND on the storage root and cached. Authentication and transport
//! failures invalidate it so the next call opens a fresh one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use filehub_storage_core::path::{leaf_name, normalize_relative, strip_root};
use filehub_storage_core::{
    BackendDriver, BackendKind, Credentials, FileEntry, HandleState, ResourceHandle, StorageError,
};
use tracing::{debug, instrument};

use crate::webdav::{DavError, WebDavClient};

pub struct CloudDriver {
    storage_id: String,
    /// Remote root, leading slash, no trailing slash ("" for "/")
    root: String,
    credentials: Credentials,
    timeout: Duration,
    session: ResourceHandle<Arc<WebDavClient>>,
}

impl CloudDriver {
    pub fn new(
        storage_id: impl Into<String>,
        root: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        let storage_id = storage_id.into();
        let root = match normalize_relative(root) {
            Ok(r) if !r.is_empty() => format!("/{}", r),
            _ => String::new(),
        };
        Self {
            session: ResourceHandle::new(format!("webdav session {}", storage_id)),
            storage_id,
            root,
            credentials,
            timeout,
        }
    }

    /// Session lifecycle state.
    pub fn session_state(&self) -> HandleState {
        self.session.state()
    }

    fn remote_path(&self, rel: &str) -> String {
        if rel.is_empty() {
            self.root.clone()
        } else {
            format!("{}/{}", self.root, rel)
        }
    }

    async fn session(&self) -> Result<Arc<WebDavClient>, StorageError> {
        self.session
            .get_or_establish(|| async {
                let base = self
                    .credentials
                    .url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        StorageError::BackendUnavailable(format!(
                            "No WebDAV URL configured for storage {}",
                            self.storage_id
                        ))
                    })?;

                let client = WebDavClient::new(
                    base,
                    self.credentials.username(),
                    self.credentials.password(),
                    self.timeout,
                )
                .map_err(|e| StorageError::BackendUnavailable(format!("WebDAV {}: {}", base, e)))?;

                client.propfind(&self.root, 0).await.map_err(|e| {
                    StorageError::BackendUnavailable(format!(
                        "WebDAV session to {} failed: {}",
                        base, e
                    ))
                })?;

                Ok(Arc::new(client))
            })
            .await
    }

    /// Drop the session after failures that a new session could fix.
    async fn on_error(&self, err: &DavError) {
        if matches!(err, DavError::Unauthorized(_) | DavError::Transport(_)) {
            self.session.invalidate().await;
        }
    }
}

#[async_trait]
impl BackendDriver for CloudDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let rel_dir = normalize_relative(dir)?;
        let remote = self.remote_path(&rel_dir);
        let client = self.session().await?;

        let dav_entries = match client.propfind(&remote, 1).await {
            Ok(entries) => entries,
            Err(e) => {
                self.on_error(&e).await;
                return Err(StorageError::BackendUnavailable(format!(
                    "Failed to list WebDAV directory {}: {}",
                    remote, e
                )));
            }
        };

        let prefix = format!("{}{}", client.base_path(), self.root);
        let mut entries = Vec::with_capacity(dav_entries.len());

        for e in dav_entries {
            let Some(rel_path) = strip_root(&e.href, &prefix) else {
                debug!("Ignoring href outside storage root: {}", e.href);
                continue;
            };
            // The collection itself is part of a depth-1 response
            if rel_path == rel_dir {
                continue;
            }
            let name = leaf_name(&rel_path).to_string();

            entries.push(FileEntry {
                name,
                size: if e.is_collection { 0 } else { e.size },
                is_directory: e.is_collection,
                modified: e.modified,
                storage_id: self.storage_id.clone(),
                path: rel_path,
            });
        }

        debug!("Listed {} WebDAV entries in {}", entries.len(), remote);
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let rel = normalize_relative(path)?;
        let client = self.session().await.map_err(|e| match e {
            StorageError::BackendUnavailable(msg) => StorageError::FileUnreadable(msg),
            other => other,
        })?;

        match client.get(&self.remote_path(&rel)).await {
            Ok(bytes) => Ok(bytes),
            Err(DavError::NotFound(_)) => {
                Err(StorageError::FileUnreadable(format!("File not found: {}", rel)))
            }
            Err(e) => {
                self.on_error(&e).await;
                Err(StorageError::FileUnreadable(format!(
                    "Failed to download {}: {}",
                    rel, e
                )))
            }
        }
    }

    async fn invalidate(&self) {
        self.session.invalidate().await;
    }
}
