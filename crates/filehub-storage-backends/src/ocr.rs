//! OCR text extraction for image files.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use filehub_storage_core::{extension_of, StorageError};
use tracing::{debug, instrument};

use crate::command::CommandRunner;

/// Extensions (lowercase, with dot) routed through OCR instead of a text read.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp"];

/// Whether a file name denotes an image, by extension, case-insensitively.
pub fn is_image(name: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension_of(name).as_str())
}

/// Extracts plain text from an image file on the local filesystem.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &Path, languages: &str) -> Result<String, StorageError>;
}

/// Runs the `tesseract` CLI and reads the recognized text from stdout.
pub struct TesseractExtractor {
    runner: Arc<dyn CommandRunner>,
    binary: String,
}

impl TesseractExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    #[instrument(skip(self), level = "debug")]
    async fn extract(&self, image: &Path, languages: &str) -> Result<String, StorageError> {
        let args = vec![
            image.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            languages.to_string(),
        ];

        let out = self
            .runner
            .run(&self.binary, &args)
            .await
            .map_err(|e| StorageError::ExtractionFailed(format!("{}: {}", image.display(), e)))?;

        let text = String::from_utf8_lossy(&out).to_string();
        debug!("OCR extracted {} chars from {}", text.len(), image.display());
        Ok(text)
    }
}
