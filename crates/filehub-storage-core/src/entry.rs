use chrono::{DateTime, Utc};
use serde::Serialize;

/// A file or directory as seen through a storage adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Leaf name
    pub name: String,
    /// Root-relative path, `/`-separated, without a leading slash
    pub path: String,
    /// Size in bytes
    pub size: u64,
    pub is_directory: bool,
    /// Last modification time. `None` when the backend cannot report one.
    pub modified: Option<DateTime<Utc>>,
    /// Owning storage id
    pub storage_id: String,
}

impl FileEntry {
    /// Lowercased extension with a leading dot (`.md`), or empty.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

/// Lowercased extension of a file name with a leading dot, or empty string.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        // ".bashrc" has no extension
        Some(0) | None => String::new(),
        Some(idx) => name[idx..].to_lowercase(),
    }
}

/// One matching file. Only produced when `score > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub file: FileEntry,
    /// Preview: first matching lines, at most [`SearchResult::PREVIEW_LINES`]
    pub matches: Vec<String>,
    /// Number of matching lines in the whole content
    pub score: usize,
}

impl SearchResult {
    pub const PREVIEW_LINES: usize = 3;

    /// Case-insensitive line match of `query` against `content`.
    ///
    /// Returns `None` when no line matches.
    pub fn from_content(file: FileEntry, content: &str, query: &str) -> Option<Self> {
        let needle = query.to_lowercase();
        if needle.is_empty() || !content.to_lowercase().contains(&needle) {
            return None;
        }

        let matching: Vec<&str> = content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| line.to_lowercase().contains(&needle))
            .collect();

        if matching.is_empty() {
            return None;
        }

        Some(Self {
            file,
            matches: matching
                .iter()
                .take(Self::PREVIEW_LINES)
                .map(|l| l.to_string())
                .collect(),
            score: matching.len(),
        })
    }
}
