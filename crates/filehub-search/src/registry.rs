//! Configured storages and their adapters.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use filehub_storage_backends::{
    AdbOptions, AndroidDriver, CloudDriver, CommandRunner, LocalDriver, MountOptions, NasDriver,
    TextExtractor,
};
use filehub_storage_core::{BackendDriver, BackendKind, StorageDescriptor, StorageError};
use tracing::{debug, info, warn};

use crate::adapter::StorageAdapter;

/// Builds the driver for a descriptor's backend kind.
pub trait DriverFactory: Send + Sync {
    fn build(&self, descriptor: &StorageDescriptor) -> Arc<dyn BackendDriver>;
}

/// Process-backed drivers for all four backend kinds.
pub struct DefaultDriverFactory {
    runner: Arc<dyn CommandRunner>,
    mount: MountOptions,
    adb: AdbOptions,
    http_timeout: Duration,
}

impl DefaultDriverFactory {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        mount: MountOptions,
        adb: AdbOptions,
        http_timeout: Duration,
    ) -> Self {
        Self {
            runner,
            mount,
            adb,
            http_timeout,
        }
    }
}

impl DriverFactory for DefaultDriverFactory {
    fn build(&self, descriptor: &StorageDescriptor) -> Arc<dyn BackendDriver> {
        let id = descriptor.id.clone();
        match descriptor.kind {
            BackendKind::Local => Arc::new(LocalDriver::new(id, &descriptor.path)),
            BackendKind::Nas => Arc::new(NasDriver::new(
                id,
                &descriptor.path,
                descriptor.credentials(),
                &self.mount,
                self.runner.clone(),
            )),
            BackendKind::Cloud => Arc::new(CloudDriver::new(
                id,
                &descriptor.path,
                descriptor.credentials(),
                self.http_timeout,
            )),
            BackendKind::Android => Arc::new(AndroidDriver::new(
                id,
                &descriptor.path,
                self.adb.clone(),
                self.runner.clone(),
            )),
        }
    }
}

/// All configured storages, plus one adapter per enabled storage.
///
/// Built once at startup and read-only afterwards.
pub struct StorageRegistry {
    descriptors: Vec<StorageDescriptor>,
    adapters: Vec<Arc<StorageAdapter>>,
}

impl StorageRegistry {
    pub fn new(
        descriptors: Vec<StorageDescriptor>,
        factory: &dyn DriverFactory,
        ocr: Arc<dyn TextExtractor>,
        ocr_languages: &str,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut adapters = Vec::new();

        for descriptor in &descriptors {
            if !seen.insert(descriptor.id.as_str()) {
                warn!("Duplicate storage id '{}', keeping the first", descriptor.id);
                continue;
            }
            if !descriptor.enabled {
                debug!("Storage '{}' is disabled", descriptor.id);
                continue;
            }
            let driver = factory.build(descriptor);
            info!(
                "Storage '{}' ({}) ready at {}",
                descriptor.id, descriptor.kind, descriptor.path
            );
            adapters.push(Arc::new(StorageAdapter::new(
                descriptor.clone(),
                driver,
                ocr.clone(),
                ocr_languages,
            )));
        }

        Self {
            descriptors,
            adapters,
        }
    }

    /// Every configured storage, enabled or not, in configuration order.
    pub fn descriptors(&self) -> &[StorageDescriptor] {
        &self.descriptors
    }

    /// Adapters of enabled storages, in configuration order.
    pub fn adapters(&self) -> &[Arc<StorageAdapter>] {
        &self.adapters
    }

    /// Resolve an enabled storage. Disabled and unknown ids look the same.
    pub fn get(&self, storage_id: &str) -> Result<Arc<StorageAdapter>, StorageError> {
        self.adapters
            .iter()
            .find(|a| a.id() == storage_id)
            .cloned()
            .ok_or_else(|| StorageError::StorageNotFound(storage_id.to_string()))
    }

    /// Adapters to search: all enabled ones, or those named in `storage_ids`.
    /// An empty allow-list means no restriction.
    pub fn select(&self, storage_ids: Option<&[String]>) -> Vec<Arc<StorageAdapter>> {
        match storage_ids {
            Some(ids) if !ids.is_empty() => {
                for id in ids {
                    if self.get(id).is_err() {
                        debug!("Ignoring unknown or disabled storage '{}' in search", id);
                    }
                }
                self.adapters
                    .iter()
                    .filter(|a| ids.iter().any(|id| id == a.id()))
                    .cloned()
                    .collect()
            }
            _ => self.adapters.clone(),
        }
    }
}
