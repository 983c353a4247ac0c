//! Fan a query out across storages and merge results by relevance.

use std::sync::Arc;

use filehub_storage_core::{SearchResult, StorageError};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::adapter::{SearchOptions, StorageAdapter};
use crate::registry::StorageRegistry;

pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const MAX_RESULTS_CEILING: usize = 100;

/// A federated search request.
#[derive(Debug, Clone)]
pub struct FederatedQuery {
    pub query: String,
    /// Restrict to these storages; `None` or empty = all enabled
    pub storage_ids: Option<Vec<String>>,
    pub file_types: Option<Vec<String>>,
    pub include_images: bool,
    pub max_results: usize,
}

impl FederatedQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            storage_ids: None,
            file_types: None,
            include_images: true,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// A storage whose root listing failed during a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageFailure {
    pub storage_id: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Sorted by score descending, per-storage order kept among equal scores
    pub results: Vec<SearchResult>,
    pub failed_storages: Vec<StorageFailure>,
}

pub struct SearchFederator {
    registry: Arc<StorageRegistry>,
    parallel: bool,
    max_depth: usize,
}

impl SearchFederator {
    pub fn new(registry: Arc<StorageRegistry>, parallel: bool, max_depth: usize) -> Self {
        Self {
            registry,
            parallel,
            max_depth,
        }
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, query: &FederatedQuery) -> SearchOutcome {
        let max_results = query.max_results.clamp(1, MAX_RESULTS_CEILING);
        let adapters = self.registry.select(query.storage_ids.as_deref());
        let options = SearchOptions {
            file_types: query.file_types.clone(),
            include_images: query.include_images,
            max_results,
            max_depth: self.max_depth,
        };

        // Completion order does not matter: outputs stay indexed by adapter
        let per_storage: Vec<Result<Vec<SearchResult>, StorageError>> = if self.parallel {
            join_all(
                adapters
                    .iter()
                    .map(|adapter| adapter.search_files(&query.query, &options)),
            )
            .await
        } else {
            let mut out = Vec::with_capacity(adapters.len());
            for adapter in &adapters {
                out.push(adapter.search_files(&query.query, &options).await);
            }
            out
        };

        let outcome = merge(&adapters, per_storage, max_results);
        debug!(
            "Search '{}' over {} storages: {} results, {} failed",
            query.query,
            adapters.len(),
            outcome.results.len(),
            outcome.failed_storages.len()
        );
        outcome
    }
}

fn merge(
    adapters: &[Arc<StorageAdapter>],
    per_storage: Vec<Result<Vec<SearchResult>, StorageError>>,
    max_results: usize,
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();

    for (adapter, result) in adapters.iter().zip(per_storage) {
        match result {
            Ok(results) => outcome.results.extend(results),
            Err(e) => {
                warn!("Search in storage '{}' failed: {}", adapter.id(), e);
                outcome.failed_storages.push(StorageFailure {
                    storage_id: adapter.id().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    // sort_by is stable: equal scores keep per-storage enumeration order
    outcome.results.sort_by(|a, b| b.score.cmp(&a.score));
    outcome.results.truncate(max_results);
    outcome
}
