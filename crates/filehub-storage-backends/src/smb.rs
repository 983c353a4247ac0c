//! SMB/CIFS network share driver.
//!
//! The share is mounted lazily at `<mount_base>/nas-<storage id>` and then
//! served by a [`LocalDriver`] rooted at the mount point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use filehub_storage_core::{
    BackendDriver, BackendKind, Credentials, FileEntry, HandleState, ResourceHandle, StorageError,
};
use tracing::{debug, info, instrument};

use crate::command::CommandRunner;
use crate::local::LocalDriver;

/// Options shared by every network-share storage.
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Parent directory of per-storage mount points
    pub mount_base: PathBuf,
    /// Prefix `mount` / `mkdir` with `sudo`
    pub use_sudo: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            mount_base: PathBuf::from("/mnt"),
            use_sudo: true,
        }
    }
}

pub struct NasDriver {
    storage_id: String,
    share: String,
    credentials: Credentials,
    mount_point: PathBuf,
    use_sudo: bool,
    runner: Arc<dyn CommandRunner>,
    mount: ResourceHandle<Arc<LocalDriver>>,
}

impl NasDriver {
    pub fn new(
        storage_id: impl Into<String>,
        share: impl Into<String>,
        credentials: Credentials,
        options: &MountOptions,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let storage_id = storage_id.into();
        let mount_point = mount_point_for(&options.mount_base, &storage_id);
        Self {
            mount: ResourceHandle::new(format!("smb mount {}", storage_id)),
            storage_id,
            share: share.into(),
            credentials,
            mount_point,
            use_sudo: options.use_sudo,
            runner,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    /// Mount lifecycle state.
    pub fn mount_state(&self) -> HandleState {
        self.mount.state()
    }

    async fn mounted(&self) -> Result<Arc<LocalDriver>, StorageError> {
        self.mount
            .get_or_establish(|| async {
                self.establish().await?;
                Ok(Arc::new(LocalDriver::new(
                    self.storage_id.clone(),
                    self.mount_point.clone(),
                )))
            })
            .await
    }

    async fn establish(&self) -> Result<(), StorageError> {
        if is_mounted(&self.mount_point).await {
            debug!("{} already mounted at {}", self.share, self.mount_point.display());
            return Ok(());
        }

        let mount_point = self.mount_point.to_string_lossy().to_string();

        if tokio::fs::metadata(&self.mount_point).await.is_err() {
            self.exec("mkdir", vec!["-p".to_string(), mount_point.clone()])
                .await
                .map_err(|e| {
                    StorageError::BackendUnavailable(format!(
                        "Failed to create mount point {}: {}",
                        mount_point, e
                    ))
                })?;
        }

        let options = format!(
            "username={},password={}",
            self.credentials.username(),
            self.credentials.password()
        );
        self.exec(
            "mount",
            vec![
                "-t".to_string(),
                "cifs".to_string(),
                self.share.clone(),
                mount_point.clone(),
                "-o".to_string(),
                options,
            ],
        )
        .await
        .map_err(|e| {
            StorageError::BackendUnavailable(format!(
                "Failed to mount {} at {}: {}",
                self.share, mount_point, e
            ))
        })?;

        info!("Mounted {} at {}", self.share, mount_point);
        Ok(())
    }

    async fn exec(&self, program: &str, args: Vec<String>) -> Result<(), crate::command::CommandError> {
        if self.use_sudo {
            let mut sudo_args = Vec::with_capacity(args.len() + 1);
            sudo_args.push(program.to_string());
            sudo_args.extend(args);
            self.runner.run("sudo", &sudo_args).await?;
        } else {
            self.runner.run(program, &args).await?;
        }
        Ok(())
    }
}

/// Deterministic mount point for a storage id.
pub fn mount_point_for(mount_base: &Path, storage_id: &str) -> PathBuf {
    mount_base.join(format!("nas-{}", storage_id))
}

/// Whether something is mounted at `path`.
///
/// Uses the kernel mount table when available; otherwise a non-empty
/// directory counts as mounted.
async fn is_mounted(path: &Path) -> bool {
    if let Ok(table) = tokio::fs::read_to_string("/proc/self/mounts").await {
        let target = path.to_string_lossy();
        let listed = table
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|mp| mp.replace("\\040", " ") == target);
        if listed {
            return true;
        }
    }

    match tokio::fs::read_dir(path).await {
        Ok(mut rd) => matches!(rd.next_entry().await, Ok(Some(_))),
        Err(_) => false,
    }
}

#[async_trait]
impl BackendDriver for NasDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Nas
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, StorageError> {
        let local = self.mounted().await?;
        let result = local.list(dir).await;
        if let Err(StorageError::BackendUnavailable(_)) = &result {
            // Could be a stale mount; re-check on the next call
            self.mount.invalidate().await;
        }
        result
    }

    #[instrument(skip(self), level = "debug", fields(storage = %self.storage_id))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let local = self.mounted().await?;
        local.read(path).await
    }

    async fn local_path(&self, path: &str) -> Result<Option<PathBuf>, StorageError> {
        let local = self.mounted().await?;
        local.local_path(path).await
    }

    async fn invalidate(&self) {
        self.mount.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandError;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Pretends to mount by dropping a file into the mount point.
    struct FakeMounter {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
        delay: Duration,
    }

    impl FakeMounter {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail,
                delay: Duration::ZERO,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
                delay,
            })
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeMounter {
        async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>, CommandError> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(CommandError::Failed {
                    program: program.to_string(),
                    status: "exit status: 32".to_string(),
                    stderr: "mount error(13): Permission denied".to_string(),
                });
            }
            match program {
                "mkdir" => std::fs::create_dir_all(&args[1]).unwrap(),
                "mount" => std::fs::write(Path::new(&args[3]).join("shared.txt"), "from nas").unwrap(),
                _ => {}
            }
            Ok(Vec::new())
        }
    }

    fn options(base: &Path) -> MountOptions {
        MountOptions {
            mount_base: base.to_path_buf(),
            use_sudo: false,
        }
    }

    fn creds() -> Credentials {
        Credentials {
            username: Some("admin".into()),
            password: Some("secret".into()),
            url: None,
        }
    }

    #[test]
    fn test_mount_point_is_deterministic() {
        assert_eq!(
            mount_point_for(Path::new("/mnt"), "nas-storage"),
            PathBuf::from("/mnt/nas-nas-storage")
        );
    }

    #[tokio::test]
    async fn test_mounts_once_then_lists() {
        let temp_dir = TempDir::new().unwrap();
        let runner = FakeMounter::new(false);
        let driver = NasDriver::new(
            "nas-storage",
            "//192.168.1.5/shared",
            creds(),
            &options(temp_dir.path()),
            runner.clone(),
        );
        assert_eq!(driver.mount_state(), HandleState::Unestablished);

        let entries = driver.list("").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "shared.txt");
        assert_eq!(entries[0].storage_id, "nas-storage");

        let content = driver.read("shared.txt").await.unwrap();
        assert_eq!(content, b"from nas");
        assert_eq!(driver.mount_state(), HandleState::Established);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "mkdir");
        assert_eq!(calls[1].0, "mount");
        assert_eq!(
            calls[1].1,
            vec![
                "-t",
                "cifs",
                "//192.168.1.5/shared",
                driver.mount_point().to_str().unwrap(),
                "-o",
                "username=admin,password=secret",
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_lists_share_one_mount() {
        let temp_dir = TempDir::new().unwrap();
        let runner = FakeMounter::slow(Duration::from_millis(50));
        let driver = NasDriver::new(
            "nas-storage",
            "//192.168.1.5/shared",
            creds(),
            &options(temp_dir.path()),
            runner.clone(),
        );

        let (a, b, c, d) = tokio::join!(
            driver.list(""),
            driver.list(""),
            driver.list(""),
            driver.list("")
        );
        let a = a.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].path, "shared.txt");
        for other in [b.unwrap(), c.unwrap(), d.unwrap()] {
            assert_eq!(other, a);
        }

        let mounts = runner
            .calls()
            .iter()
            .filter(|(program, _)| program == "mount")
            .count();
        assert_eq!(mounts, 1);
        assert_eq!(driver.mount_state(), HandleState::Established);
    }

    #[tokio::test]
    async fn test_existing_mount_is_adopted() {
        let temp_dir = TempDir::new().unwrap();
        let mount_point = mount_point_for(temp_dir.path(), "nas-storage");
        std::fs::create_dir_all(&mount_point).unwrap();
        std::fs::write(mount_point.join("already.txt"), "here").unwrap();

        let runner = FakeMounter::new(false);
        let driver = NasDriver::new(
            "nas-storage",
            "//192.168.1.5/shared",
            creds(),
            &options(temp_dir.path()),
            runner.clone(),
        );

        let entries = driver.list("").await.unwrap();
        assert_eq!(entries[0].name, "already.txt");
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sudo_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let runner = FakeMounter::new(true);
        let driver = NasDriver::new(
            "nas-storage",
            "//192.168.1.5/shared",
            creds(),
            &MountOptions {
                mount_base: temp_dir.path().to_path_buf(),
                use_sudo: true,
            },
            runner.clone(),
        );

        assert!(driver.list("").await.is_err());
        let calls = runner.calls();
        assert_eq!(calls[0].0, "sudo");
        assert_eq!(calls[0].1[0], "mkdir");
    }

    #[tokio::test]
    async fn test_mount_failure_is_backend_unavailable_without_password() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(mount_point_for(temp_dir.path(), "nas-storage")).unwrap();
        let runner = FakeMounter::new(true);
        let driver = NasDriver::new(
            "nas-storage",
            "//192.168.1.5/shared",
            creds(),
            &options(temp_dir.path()),
            runner,
        );

        let err = driver.list("").await.unwrap_err();
        match &err {
            StorageError::BackendUnavailable(msg) => {
                assert!(msg.contains("Permission denied"));
                assert!(!msg.contains("secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(driver.mount_state(), HandleState::Failed(_)));
    }
}
