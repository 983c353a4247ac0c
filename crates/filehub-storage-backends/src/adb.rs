//! Android device driver over `adb`.
//!
//! Listing runs `ls -la` through `adb shell` and parses the text output
//! (see [`crate::ls_listing`]); reads stream the file with `adb exec-out cat`,
//! which does not translate line endings.

use std::sync::Arc;

use async_trait::async_trait;
use filehub_storage_core::path::{join_relative, normalize_relative};
use filehub_storage_core::{BackendDriver, BackendKind, FileEntry, StorageError};
use tracing::{debug, instrument};

use crate::command::{shell_quote, CommandRunner};
use crate::ls_listing::parse_ls_output;

/// adb invocation settings.
#[derive(Debug, Clone)]
pub struct AdbOptions {
    pub binary: String,
    /// Device serial (`adb -s`); `None` uses the only attached device
    pub serial: Option<String>,
}

impl Default for AdbOptions {
    fn default() -> Self {
        Self {
            binary: "adb".to_string(),
            serial: None,
        }
    }
}

pub struct AndroidDriver {
    storage_id: String,
    /// Device root, no trailing slash
    root: String,
    options: AdbOptions,
    runner: Arc<dyn CommandRunner>,
}

impl AndroidDriver {
    pub fn new(
        storage_id: impl Into<String>,
        root: &str,
        options: AdbOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let trimmed = root.trim_end_matches('/');
        Self {
            storage_id: storage_id.into(),
            root: if trimmed.is_empty() { String::new() } else { trimmed.to_string() },
            options,
            runner,
        }
    }

    fn device_path(&self, rel: &str) -> String {
        match (self.root.is_empty(), rel.is_empty()) {
            (true, true) => "/".to_string(),
            (false, true) => self.root.clone(),
            (_, false) => format!("{}/{}", self.root, rel),
        }
    }

    fn args(&self, subcommand: &str, remote_command: String) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if let Some(serial) = &self.options.serial {
            args.push("-s".to_string());
            args.push(serial.clone());
        }
        args.push(subcommand.to_string());
        args.push(remote_command);
        args
    }
}

#[async_trait]
impl BackendDriver for AndroidDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Android
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let rel_dir = normalize_relative(dir)?;
        let device_dir = self.device_path(&rel_dir);
        // Trailing slash so a symlinked directory lists its contents
        let listed_dir = format!("{}/", device_dir.trim_end_matches('/'));
        let args = self.args("shell", format!("ls -la {}", shell_quote(&listed_dir)));

        let out = self.runner.run(&self.options.binary, &args).await.map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "Failed to list Android directory {}: {}",
                device_dir, e
            ))
        })?;

        let entries: Vec<FileEntry> = parse_ls_output(&String::from_utf8_lossy(&out))
            .into_iter()
            .map(|e| FileEntry {
                path: join_relative(&rel_dir, &e.name),
                name: e.name,
                size: e.size,
                is_directory: e.is_directory,
                // ls -la output carries no parseable timestamp contract
                modified: None,
                storage_id: self.storage_id.clone(),
            })
            .collect();

        debug!("Listed {} entries in {}", entries.len(), device_dir);
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let rel = normalize_relative(path)?;
        let device_path = self.device_path(&rel);
        let args = self.args("exec-out", format!("cat {}", shell_quote(&device_path)));

        self.runner
            .run(&self.options.binary, &args)
            .await
            .map_err(|e| {
                StorageError::FileUnreadable(format!(
                    "Failed to read Android file {}: {}",
                    device_path, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandError;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct FakeAdb {
        calls: Mutex<Vec<Vec<String>>>,
        stdout: &'static str,
        fail: bool,
    }

    impl FakeAdb {
        fn new(stdout: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                stdout,
                fail,
            })
        }
    }

    #[async_trait]
    impl CommandRunner for FakeAdb {
        async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CommandError> {
            assert_eq!(program, "adb");
            self.calls.lock().unwrap().push(args.to_vec());
            if self.fail {
                return Err(CommandError::Failed {
                    program: program.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "adb: no devices/emulators found".to_string(),
                });
            }
            Ok(self.stdout.as_bytes().to_vec())
        }
    }

    const LISTING: &str = "total 8
drwxrwx--x 2 root sdcard_rw 4096 2024-01-02 09:15 .
drwxrwx--x 2 root sdcard_rw 4096 2024-01-02 09:15 Work
-rw-rw---- 1 root sdcard_rw   17 2024-01-03 18:40 my notes.txt
";

    #[tokio::test]
    async fn test_list_parses_output() {
        let adb = FakeAdb::new(LISTING, false);
        let driver = AndroidDriver::new(
            "android-storage",
            "/storage/emulated/0/Documents/",
            AdbOptions::default(),
            adb.clone(),
        );

        let entries = driver.list("Work").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].name, "my notes.txt");
        assert_eq!(entries[1].path, "Work/my notes.txt");
        assert_eq!(entries[1].size, 17);
        assert_eq!(entries[1].modified, None);
        assert!(entries[0].is_directory);

        let calls = adb.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec!["shell", "ls -la '/storage/emulated/0/Documents/Work/'"]
        );
    }

    #[tokio::test]
    async fn test_list_root_follows_symlinked_directory() {
        let adb = FakeAdb::new(LISTING, false);
        let driver = AndroidDriver::new(
            "android-storage",
            "/sdcard",
            AdbOptions::default(),
            adb.clone(),
        );
        driver.list("").await.unwrap();

        let bare = AndroidDriver::new("android-storage", "", AdbOptions::default(), adb.clone());
        bare.list("").await.unwrap();

        let calls = adb.calls.lock().unwrap();
        assert_eq!(calls[0], vec!["shell", "ls -la '/sdcard/'"]);
        assert_eq!(calls[1], vec!["shell", "ls -la '/'"]);
    }

    #[tokio::test]
    async fn test_read_uses_exec_out_and_serial() {
        let adb = FakeAdb::new("buy milk\n", false);
        let driver = AndroidDriver::new(
            "android-storage",
            "/sdcard",
            AdbOptions {
                binary: "adb".to_string(),
                serial: Some("emulator-5554".to_string()),
            },
            adb.clone(),
        );

        let bytes = driver.read("it's.txt").await.unwrap();
        assert_eq!(bytes, b"buy milk\n");

        let calls = adb.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec!["-s", "emulator-5554", "exec-out", r"cat '/sdcard/it'\''s.txt'"]
        );
    }

    #[tokio::test]
    async fn test_command_failure_mapping() {
        let adb = FakeAdb::new("", true);
        let driver = AndroidDriver::new("android-storage", "/sdcard", AdbOptions::default(), adb);

        let err = driver.list("").await.unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(msg) if msg.contains("no devices")));

        let err = driver.read("a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::FileUnreadable(_)));
    }
}
