use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport family a storage is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Direct filesystem access.
    Local,
    /// SMB/CIFS network share, mounted on first use.
    Nas,
    /// WebDAV remote protocol.
    Cloud,
    /// Remote device reached through `adb shell`.
    Android,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Nas => "nas",
            BackendKind::Cloud => "cloud",
            BackendKind::Android => "android",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host platform tag. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Linux,
    Macos,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for network-share and remote-protocol storages.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Base URL (WebDAV endpoint)
    #[serde(default)]
    pub url: Option<String>,
}

impl Credentials {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("url", &self.url)
            .finish()
    }
}

/// One configured storage. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    /// Unique storage identifier
    pub id: String,
    /// Backend kind
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub platform: Platform,
    /// Root: local path, `//host/share`, remote WebDAV path or device path
    pub path: String,
    #[serde(default)]
    pub credentials: Option<Credentials>,
    pub enabled: bool,
}

impl StorageDescriptor {
    /// Credentials, or an empty bundle when none are configured.
    pub fn credentials(&self) -> Credentials {
        self.credentials.clone().unwrap_or_default()
    }
}
