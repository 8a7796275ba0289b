mod bucket;

#[cfg(test)]
pub mod memory;

pub use self::bucket::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("storage request failed: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Metadata for one object or virtual directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Last path segment, without trailing separator.
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<OffsetDateTime>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
}

impl Entry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified: None,
            etag: None,
            content_type: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Inclusive byte range within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Read-only hierarchical view over a bucket.
///
/// Keys never start with `/`; the empty key is the root directory. A key is a
/// directory when objects exist below `key/`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn stat(&self, key: &str) -> Result<Entry, StoreError>;

    async fn read(&self, key: &str, range: Option<ByteRange>) -> Result<Bytes, StoreError>;

    /// Direct children of a directory key.
    async fn list(&self, dir: &str) -> Result<Vec<Entry>, StoreError>;
}

/// Last segment of a key, ignoring a trailing separator.
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Directory key in listing form: empty for the root, otherwise ending in `/`.
pub fn dir_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}
