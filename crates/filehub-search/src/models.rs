//! MCP request types for the filehub tools.

use rmcp::schemars;
use serde::Deserialize;

use crate::federator::DEFAULT_MAX_RESULTS;

fn default_true() -> bool {
    true
}

fn default_max_results() -> i64 {
    DEFAULT_MAX_RESULTS as i64
}

/// Full-text search across storages.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchFilesRequest {
    /// Text to search for in file contents
    #[schemars(description = "Text to search for in file contents", length(min = 1))]
    pub query: String,
    /// Limit search to these storage ids
    #[schemars(description = "Limit search to specific storage IDs. If not provided, searches all storages")]
    #[serde(default)]
    pub storage_ids: Option<Vec<String>>,
    /// Extension allow-list
    #[schemars(description = "Filter by file extensions (e.g., ['.txt', '.md', '.pdf'])")]
    #[serde(default)]
    pub file_types: Option<Vec<String>>,
    #[schemars(description = "Whether to perform OCR on images")]
    #[serde(default = "default_true")]
    pub include_images: bool,
    /// Signed so that out-of-range values reach validation instead of
    /// failing deserialization.
    #[schemars(description = "Maximum number of results to return", range(min = 1, max = 100))]
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

impl SearchFilesRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            storage_ids: None,
            file_types: None,
            include_images: true,
            max_results: default_max_results(),
        }
    }
}

/// Read one file.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ReadFileRequest {
    #[schemars(description = "Storage ID where file is located")]
    pub storage_id: String,
    #[schemars(description = "Relative path to the file within storage")]
    pub file_path: String,
    #[schemars(description = "For images: perform OCR to extract text")]
    #[serde(default = "default_true")]
    pub extract_text: bool,
}

/// List a directory.
#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ListFilesRequest {
    #[schemars(description = "Storage ID to list files from")]
    pub storage_id: String,
    #[schemars(description = "Directory path relative to storage root (empty for root)")]
    #[serde(default)]
    pub directory: String,
    #[schemars(description = "Whether to list files recursively in subdirectories")]
    #[serde(default)]
    pub recursive: bool,
}
