use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use filehub_storage_core::{BackendKind, Credentials, Platform, StorageDescriptor};

/// Configuration for the filehub tool server.
#[derive(Parser, Debug, Clone)]
#[command(name = "filehub-mcp-server")]
#[command(about = "Federated file search over local, NAS, WebDAV and Android storages")]
pub struct Config {
    /// TCP host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// TCP port to bind to
    #[arg(long, default_value = "3000", env = "PORT")]
    pub port: u16,

    /// JSON file with the storage table (built-in table when unset)
    #[arg(long, env = "FILEHUB_STORAGES")]
    pub storages: Option<PathBuf>,

    /// Directory under which SMB shares are mounted
    #[arg(long, default_value = "/mnt", env = "FILEHUB_MOUNT_BASE")]
    pub mount_base: PathBuf,

    /// Run mkdir/mount through sudo
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "FILEHUB_MOUNT_SUDO")]
    pub mount_with_sudo: bool,

    /// Tesseract language hint
    #[arg(long, default_value = "eng+rus", env = "FILEHUB_OCR_LANGUAGES")]
    pub ocr_languages: String,

    /// Tesseract executable
    #[arg(long, default_value = "tesseract", env = "FILEHUB_TESSERACT_BIN")]
    pub tesseract_bin: String,

    /// adb executable
    #[arg(long, default_value = "adb", env = "FILEHUB_ADB_BIN")]
    pub adb_bin: String,

    /// Target device serial when several are attached
    #[arg(long, env = "ANDROID_SERIAL")]
    pub adb_serial: Option<String>,

    /// Subdirectory levels searched and listed recursively
    #[arg(long, default_value = "8", env = "FILEHUB_SEARCH_DEPTH")]
    pub search_depth: usize,

    /// Search storages one after another instead of concurrently
    #[arg(long, env = "FILEHUB_SEQUENTIAL_SEARCH")]
    pub sequential_search: bool,

    /// Request timeout for WebDAV calls (seconds)
    #[arg(long, default_value = "300", env = "FILEHUB_HTTP_TIMEOUT")]
    pub http_timeout_secs: u64,
}

impl Config {
    /// The storage table: from `--storages` when given, built-in otherwise.
    pub fn load_storages(&self) -> anyhow::Result<Vec<StorageDescriptor>> {
        match &self.storages {
            Some(path) => load_storage_file(path),
            None => Ok(builtin_storages(
                std::env::var("NAS_PASSWORD").unwrap_or_default(),
                std::env::var("CLOUD_PASSWORD").unwrap_or_default(),
            )),
        }
    }
}

pub fn load_storage_file(path: &Path) -> anyhow::Result<Vec<StorageDescriptor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read storage table {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid storage table {}", path.display()))
}

/// Default storage table. Missing secrets become empty strings and surface
/// later as authentication failures from the backend.
pub fn builtin_storages(nas_password: String, cloud_password: String) -> Vec<StorageDescriptor> {
    let storage = |id: &str, kind, platform, path: &str, enabled| StorageDescriptor {
        id: id.to_string(),
        kind,
        platform,
        path: path.to_string(),
        credentials: None,
        enabled,
    };

    vec![
        storage(
            "windows-local",
            BackendKind::Local,
            Platform::Windows,
            "D:\\Documents",
            true,
        ),
        storage(
            "linux-home",
            BackendKind::Local,
            Platform::Linux,
            "/home/max/documents",
            true,
        ),
        storage(
            "macos-home",
            BackendKind::Local,
            Platform::Macos,
            "/Users/max/Documents",
            false,
        ),
        StorageDescriptor {
            credentials: Some(Credentials {
                username: Some("admin".to_string()),
                password: Some(nas_password),
                url: None,
            }),
            ..storage(
                "nas-storage",
                BackendKind::Nas,
                Platform::Linux,
                "//192.168.1.5/shared",
                true,
            )
        },
        StorageDescriptor {
            credentials: Some(Credentials {
                username: Some("max".to_string()),
                password: Some(cloud_password),
                url: Some("https://cloud.example.com/webdav".to_string()),
            }),
            ..storage(
                "cloud-webdav",
                BackendKind::Cloud,
                Platform::Linux,
                "/remote/files",
                false,
            )
        },
        storage(
            "android-storage",
            BackendKind::Android,
            Platform::Android,
            "/storage/emulated/0/Documents",
            false,
        ),
    ]
}
