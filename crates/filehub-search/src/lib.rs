//! Federated content search over filehub storages.
//!
//! - `adapter`: one [`StorageAdapter`] per enabled storage, uniform list/read/search
//! - `registry`: the configured storage table and driver selection by kind
//! - `federator`: fan-out, merge, rank and truncate
//! - `tools`: the MCP server ([`FileHubMcp`]) with `models` holding its
//!   request types and `render` producing the markdown side of each result

pub mod adapter;
pub mod federator;
pub mod models;
pub mod registry;
pub mod render;
pub mod tools;

#[cfg(test)]
mod testing;

pub use adapter::{FileScan, SearchOptions, StorageAdapter};
pub use federator::{FederatedQuery, SearchFederator, SearchOutcome, StorageFailure};
pub use registry::{DefaultDriverFactory, DriverFactory, StorageRegistry};
pub use models::{ListFilesRequest, ReadFileRequest, SearchFilesRequest};
pub use tools::FileHubMcp;
