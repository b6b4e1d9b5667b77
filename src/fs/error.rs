use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

/// Backend-independent error categories returned by every pipeline node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Offset {offset} is beyond the end of {path} ({size} bytes)")]
    OutOfRange { path: String, offset: u64, size: u64 },

    #[error("Is a directory: {0}")]
    IsDirectory(String),

    #[error("Not a directory: {0}")]
    NotDirectory(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Object too large: {path} would be {size} bytes (max {limit})")]
    TooLarge { path: String, size: u64, limit: u64 },
}

impl FsError {
    /// Convert to POSIX errno
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::NotEmpty(_) => libc::ENOTEMPTY,
            FsError::Conflict(_) => libc::EEXIST,
            FsError::Unsupported(_) => libc::ENOSYS,
            FsError::Unavailable(_) => libc::EIO,
            FsError::Configuration(_) => libc::EINVAL,
            FsError::OutOfRange { .. } => libc::EINVAL,
            FsError::IsDirectory(_) => libc::EISDIR,
            FsError::NotDirectory(_) => libc::ENOTDIR,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::TooLarge { .. } => libc::EFBIG,
        }
    }

    /// Transient failures a caller may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, FsError::Unavailable(_))
    }
}
