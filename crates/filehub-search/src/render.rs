//! Structured payloads and their markdown renderings for the tool surface.

use chrono::{DateTime, Utc};
use filehub_storage_core::{BackendKind, FileEntry, Platform, SearchResult, StorageDescriptor};
use serde::Serialize;

use crate::federator::StorageFailure;

#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub platform: Platform,
    pub path: String,
    pub enabled: bool,
}

impl From<&StorageDescriptor> for StorageSummary {
    fn from(d: &StorageDescriptor) -> Self {
        Self {
            id: d.id.clone(),
            kind: d.kind,
            platform: d.platform,
            path: d.path.clone(),
            enabled: d.enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageList {
    pub storages: Vec<StorageSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub storage: String,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedMatch {
    pub file: MatchedFile,
    pub matches: Vec<String>,
    pub score: usize,
}

impl From<SearchResult> for RankedMatch {
    fn from(r: SearchResult) -> Self {
        Self {
            file: MatchedFile {
                name: r.file.name,
                path: r.file.path,
                size: r.file.size,
                storage: r.file.storage_id,
                modified: r.file.modified,
            },
            matches: r.matches,
            score: r.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<RankedMatch>,
    pub failed_storages: Vec<StorageFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub storage_id: String,
    pub file_path: String,
    pub content: String,
    /// Character count of `content`
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListedFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
    pub modified: Option<DateTime<Utc>>,
}

impl From<FileEntry> for ListedFile {
    fn from(e: FileEntry) -> Self {
        Self {
            name: e.name,
            path: e.path,
            size: e.size,
            is_directory: e.is_directory,
            modified: e.modified,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListing {
    pub storage_id: String,
    /// `/` for the storage root
    pub directory: String,
    pub total_files: usize,
    pub files: Vec<ListedFile>,
}

fn kilobytes(size: u64) -> String {
    format!("{:.2} KB", size as f64 / 1024.0)
}

fn date(modified: Option<DateTime<Utc>>) -> String {
    modified
        .map(|m| m.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn storages_markdown(list: &StorageList) -> String {
    let blocks: Vec<String> = list
        .storages
        .iter()
        .map(|s| {
            format!(
                "## {}\n- **Type**: {}\n- **Platform**: {}\n- **Path**: {}\n- **Status**: {}\n",
                s.id,
                s.kind,
                s.platform,
                s.path,
                if s.enabled { "✅ Enabled" } else { "❌ Disabled" }
            )
        })
        .collect();
    format!("# Available Storage Locations\n\n{}", blocks.join("\n"))
}

fn failures_markdown(failures: &[StorageFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = failures
        .iter()
        .map(|f| format!("- {}: {}", f.storage_id, f.error))
        .collect();
    format!("\n\n**Unavailable storages**:\n{}", lines.join("\n"))
}

pub fn search_markdown(report: &SearchReport) -> String {
    if report.results.is_empty() {
        return format!(
            "No files found matching query: \"{}\"{}",
            report.query,
            failures_markdown(&report.failed_storages)
        );
    }

    let blocks: Vec<String> = report
        .results
        .iter()
        .map(|r| {
            let preview: Vec<String> = r.matches.iter().map(|m| format!("> {}", m)).collect();
            format!(
                "## {}\n- **Storage**: {}\n- **Path**: {}\n- **Size**: {}\n- **Matches**: {}\n\n### Content Preview:\n{}\n",
                r.file.name,
                r.file.storage,
                r.file.path,
                kilobytes(r.file.size),
                r.score,
                preview.join("\n")
            )
        })
        .collect();

    format!(
        "# Search Results: \"{}\"\n\nFound {} files\n\n{}{}",
        report.query,
        report.total_results,
        blocks.join("\n---\n\n"),
        failures_markdown(&report.failed_storages)
    )
}

pub fn file_markdown(file: &FileContent) -> String {
    format!(
        "# File: {}\n**Storage**: {}\n\n---\n\n{}",
        file.file_path, file.storage_id, file.content
    )
}

pub fn listing_markdown(listing: &DirectoryListing) -> String {
    let lines: Vec<String> = listing
        .files
        .iter()
        .map(|f| {
            format!(
                "{} **{}**\n   Size: {} | Modified: {}",
                if f.is_directory { "📁" } else { "📄" },
                f.name,
                kilobytes(f.size),
                date(f.modified)
            )
        })
        .collect();
    format!(
        "# Files in: {}\n**Storage**: {}\n**Total**: {} items\n\n{}",
        listing.directory,
        listing.storage_id,
        listing.total_files,
        lines.join("\n")
    )
}
