//! Uniform list/read/search over one configured storage.

use std::sync::Arc;

use filehub_storage_backends::{is_image, TextExtractor};
use filehub_storage_core::{
    extension_of, BackendDriver, BackendKind, FileEntry, SearchResult, StorageDescriptor,
    StorageError,
};
use tracing::{debug, instrument, warn};

/// Adapter-local search knobs.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Extension allow-list (`md` or `.md`, any case). `None` or empty = all.
    pub file_types: Option<Vec<String>>,
    /// Route images through OCR; when false images are skipped.
    pub include_images: bool,
    /// Stop scanning once this many matches are held.
    pub max_results: usize,
    /// Subdirectory levels to descend (0 = top level only).
    pub max_depth: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            file_types: None,
            include_images: true,
            max_results: 50,
            max_depth: 8,
        }
    }
}

impl SearchOptions {
    fn accepts_extension(&self, name: &str) -> bool {
        match &self.file_types {
            Some(types) if !types.is_empty() => {
                let ext = extension_of(name);
                types.iter().any(|t| normalize_extension(t) == ext)
            }
            _ => true,
        }
    }
}

/// `"MD"`, `"md"` and `".md"` all become `".md"`.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// What happened to one file during a scan.
#[derive(Debug)]
pub enum FileScan {
    Matched(SearchResult),
    NoMatch,
    /// Excluded by type filter, image policy, or because it is a directory.
    Filtered,
    /// Content could not be obtained; the scan carries on without it.
    Skipped(StorageError),
}

pub struct StorageAdapter {
    descriptor: StorageDescriptor,
    driver: Arc<dyn BackendDriver>,
    ocr: Arc<dyn TextExtractor>,
    ocr_languages: String,
}

impl StorageAdapter {
    pub fn new(
        descriptor: StorageDescriptor,
        driver: Arc<dyn BackendDriver>,
        ocr: Arc<dyn TextExtractor>,
        ocr_languages: impl Into<String>,
    ) -> Self {
        Self {
            descriptor,
            driver,
            ocr,
            ocr_languages: ocr_languages.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn kind(&self) -> BackendKind {
        self.driver.kind()
    }

    pub fn descriptor(&self) -> &StorageDescriptor {
        &self.descriptor
    }

    pub fn is_image(&self, name: &str) -> bool {
        is_image(name)
    }

    /// Immediate children of `sub_path` (empty = root).
    pub async fn list_files(&self, sub_path: &str) -> Result<Vec<FileEntry>, StorageError> {
        self.driver.list(sub_path).await
    }

    /// Pre-order walk below `sub_path`: each directory is followed by its
    /// children, down to `max_depth` levels below the starting directory.
    ///
    /// Only the starting listing can fail; subdirectories that cannot be
    /// listed are logged and left out.
    pub async fn list_files_recursive(
        &self,
        sub_path: &str,
        max_depth: usize,
    ) -> Result<Vec<FileEntry>, StorageError> {
        let top = self.driver.list(sub_path).await?;
        let mut out = Vec::with_capacity(top.len());
        let mut stack = vec![(top.into_iter(), 0usize)];

        loop {
            let Some((iter, depth)) = stack.last_mut() else {
                break;
            };
            let depth = *depth;
            let Some(entry) = iter.next() else {
                stack.pop();
                continue;
            };

            let descend_into = (entry.is_directory && depth < max_depth).then(|| entry.path.clone());
            out.push(entry);

            if let Some(dir) = descend_into {
                match self.driver.list(&dir).await {
                    Ok(children) => stack.push((children.into_iter(), depth + 1)),
                    Err(e) => warn!("{}: skipping directory {}: {}", self.id(), dir, e),
                }
            }
        }

        Ok(out)
    }

    /// Full content of `path` decoded as UTF-8 (lossy).
    pub async fn read_file(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.driver.read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Like [`read_file`](Self::read_file), but images go through OCR when
    /// `extract_text` is set.
    pub async fn read_file_with(
        &self,
        path: &str,
        extract_text: bool,
    ) -> Result<String, StorageError> {
        if extract_text && self.is_image(path) {
            Ok(self.extract_text(path).await)
        } else {
            self.read_file(path).await
        }
    }

    /// OCR text of an image, or an empty string when anything fails.
    pub async fn extract_text(&self, path: &str) -> String {
        match self.try_extract_text(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{}: OCR failed for {}: {}", self.id(), path, e);
                String::new()
            }
        }
    }

    async fn try_extract_text(&self, path: &str) -> Result<String, StorageError> {
        if let Some(local) = self.driver.local_path(path).await? {
            return self.ocr.extract(&local, &self.ocr_languages).await;
        }

        // Remote backends: fetch to a scratch file the OCR engine can open
        let bytes = self.driver.read(path).await?;
        let scratch = tempfile::Builder::new()
            .prefix("filehub-ocr-")
            .suffix(&extension_of(path))
            .tempfile()
            .map_err(|e| StorageError::ExtractionFailed(format!("scratch file: {}", e)))?;
        tokio::fs::write(scratch.path(), &bytes)
            .await
            .map_err(|e| StorageError::ExtractionFailed(format!("scratch file: {}", e)))?;

        self.ocr.extract(scratch.path(), &self.ocr_languages).await
    }

    /// Obtain the searchable text of one file.
    async fn content_for_search(&self, entry: &FileEntry) -> Result<String, StorageError> {
        if self.is_image(&entry.name) {
            match self.try_extract_text(&entry.path).await {
                Ok(text) => Ok(text),
                Err(StorageError::ExtractionFailed(msg)) => {
                    warn!("{}: OCR failed for {}: {}", self.id(), entry.path, msg);
                    Ok(String::new())
                }
                Err(e) => Err(e),
            }
        } else {
            self.read_file(&entry.path).await
        }
    }

    /// Scan a single listed entry against `query`.
    pub async fn scan_file(&self, entry: &FileEntry, query: &str, options: &SearchOptions) -> FileScan {
        if entry.is_directory || !options.accepts_extension(&entry.name) {
            return FileScan::Filtered;
        }
        if !options.include_images && self.is_image(&entry.name) {
            return FileScan::Filtered;
        }

        match self.content_for_search(entry).await {
            Ok(content) => match SearchResult::from_content(entry.clone(), &content, query) {
                Some(result) => FileScan::Matched(result),
                None => FileScan::NoMatch,
            },
            Err(e) => FileScan::Skipped(e),
        }
    }

    /// Adapter-local half of the federated search.
    ///
    /// Results come back in enumeration order. Fails only when the storage
    /// root itself cannot be listed.
    #[instrument(skip(self, options), level = "debug", fields(storage = %self.descriptor.id))]
    pub async fn search_files(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StorageError> {
        let files = self.list_files_recursive("", options.max_depth).await?;
        let mut results = Vec::new();
        let mut skipped = 0usize;

        for entry in &files {
            if results.len() >= options.max_results {
                break;
            }
            match self.scan_file(entry, query, options).await {
                FileScan::Matched(result) => results.push(result),
                FileScan::NoMatch | FileScan::Filtered => {}
                FileScan::Skipped(e) => {
                    skipped += 1;
                    warn!("{}: error processing {}: {}", self.id(), entry.path, e);
                }
            }
        }

        debug!(
            "{}: {} matches in {} entries ({} skipped)",
            self.id(),
            results.len(),
            files.len(),
            skipped
        );
        Ok(results)
    }
}
