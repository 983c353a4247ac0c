//! Core traits and types for filehub storage backends.
//!
//! This crate defines the abstractions shared between the storage drivers and
//! the search engine:
//! - `StorageDescriptor`: static description of one configured storage
//! - `FileEntry` / `SearchResult`: what adapters hand back to callers
//! - `BackendDriver`: list/read over one transport family
//! - `ResourceHandle`: single-flight lifecycle for mounts and sessions
//! - `StorageError`: the error taxonomy shared by every layer

mod descriptor;
mod driver;
mod entry;
mod error;
mod handle;
pub mod path;

pub use descriptor::{BackendKind, Credentials, Platform, StorageDescriptor};
pub use driver::BackendDriver;
pub use entry::{extension_of, FileEntry, SearchResult};
pub use error::{Result, StorageError};
pub use handle::{HandleState, ResourceHandle};
