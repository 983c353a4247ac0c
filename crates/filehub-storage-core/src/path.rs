//! Root-relative path helpers shared by all drivers.
//!
//! Paths exchanged with callers are always relative to the storage root,
//! `/`-separated and without a leading slash. The empty string is the root.

use crate::error::{Result, StorageError};

/// Normalize a caller-supplied path into root-relative form.
///
/// Accepts leading slashes and backslashes, drops `.` and empty segments.
/// Rejects `..` so a path can never leave the storage root.
pub fn normalize_relative(path: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::InvalidPath(format!(
                    "'{}' escapes the storage root",
                    path
                )))
            }
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

/// Join a root-relative directory and a child name.
pub fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Strip `root` from an absolute remote path, yielding a root-relative path.
///
/// Returns `None` when `full` is not below `root`.
pub fn strip_root(full: &str, root: &str) -> Option<String> {
    let root = root.trim_end_matches('/');
    let rest = full.strip_prefix(root)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        // "/remote/files2" is not below "/remote/files"
        return None;
    }
    Some(rest.trim_matches('/').to_string())
}

/// Last path component of a `/`-separated path.
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
