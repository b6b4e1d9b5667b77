use chrono::{DateTime, Utc};

use crate::fs::StorageTier;

/// Metadata for one stored object as reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub tier: StorageTier,
}

impl ObjectMeta {
    /// Keys ending in `/` are directory markers.
    pub fn is_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// A byte range requested from or written to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset, saturating at `u64::MAX`.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Clamp the range to an object of `size` bytes.
    pub fn clamp(&self, size: u64) -> std::ops::Range<usize> {
        let start = self.offset.min(size) as usize;
        let end = self.end().min(size) as usize;
        start..end
    }
}

/// Errors raised by an object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No such key: {0}")]
    NoSuchKey(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid credentials or store configuration: {0}")]
    Credentials(String),

    #[error("Operation not supported by store: {0}")]
    Unsupported(String),

    #[error("Store error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Best-effort content type from a key's extension.
pub fn guess_content_type(key: &str) -> Option<String> {
    let ext = key.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "parquet" => "application/vnd.apache.parquet",
        _ => "application/octet-stream",
    };
    Some(mime.to_string())
}
