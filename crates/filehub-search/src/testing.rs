//! In-memory driver and OCR stand-ins for unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use filehub_storage_backends::TextExtractor;
use filehub_storage_core::path::{join_relative, normalize_relative};
use filehub_storage_core::{
    BackendDriver, BackendKind, FileEntry, Platform, StorageDescriptor, StorageError,
};

pub fn descriptor(id: &str) -> StorageDescriptor {
    StorageDescriptor {
        id: id.to_string(),
        kind: BackendKind::Local,
        platform: Platform::Linux,
        path: format!("/data/{}", id),
        credentials: None,
        enabled: true,
    }
}

/// Files keyed by root-relative path; directories are implied by paths.
/// Listing order follows insertion order.
pub struct MemoryDriver {
    storage_id: String,
    files: Vec<(String, Option<Vec<u8>>)>,
    fail_list: bool,
}

impl MemoryDriver {
    pub fn new(storage_id: &str) -> Self {
        Self {
            storage_id: storage_id.to_string(),
            files: Vec::new(),
            fail_list: false,
        }
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files
            .push((path.to_string(), Some(content.as_bytes().to_vec())));
        self
    }

    /// Listed, but reading it fails.
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.files.push((path.to_string(), None));
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }
}

#[async_trait]
impl BackendDriver for MemoryDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        if self.fail_list {
            return Err(StorageError::BackendUnavailable(format!(
                "{} is offline",
                self.storage_id
            )));
        }
        let dir = normalize_relative(dir)?;
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir) };

        let mut entries: Vec<FileEntry> = Vec::new();
        for (path, content) in &self.files {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, is_directory) = match rest.split_once('/') {
                Some((first, _)) => (first, true),
                None => (rest, false),
            };
            if entries.iter().any(|e| e.name == name) {
                continue;
            }
            entries.push(FileEntry {
                name: name.to_string(),
                path: join_relative(&dir, name),
                size: if is_directory {
                    0
                } else {
                    content.as_ref().map(|c| c.len() as u64).unwrap_or(0)
                },
                is_directory,
                modified: None,
                storage_id: self.storage_id.clone(),
            });
        }
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalize_relative(path)?;
        match self.files.iter().find(|(p, _)| *p == path) {
            Some((_, Some(content))) => Ok(content.clone()),
            Some((_, None)) => Err(StorageError::FileUnreadable(format!("{}: I/O error", path))),
            None => Err(StorageError::FileUnreadable(format!("File not found: {}", path))),
        }
    }
}

/// OCR stand-in returning canned text, or always failing.
pub struct FakeOcr {
    text: Option<String>,
    calls: AtomicUsize,
}

impl FakeOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for FakeOcr {
    async fn extract(&self, image: &Path, _languages: &str) -> Result<String, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(image.exists(), "OCR input {} must exist", image.display());
        self.text
            .clone()
            .ok_or_else(|| StorageError::ExtractionFailed("tesseract: no text".to_string()))
    }
}
