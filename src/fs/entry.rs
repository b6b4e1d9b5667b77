//! Value types exchanged across the filesystem-client contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic options a pipeline node reports about itself.
pub type Parameters = BTreeMap<String, String>;

/// Backend storage class, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StorageTier(String);

impl StorageTier {
    pub const STANDARD: &'static str = "STANDARD";
    pub const INFREQUENT_ACCESS: &'static str = "INFREQUENT_ACCESS";
    pub const ARCHIVE: &'static str = "ARCHIVE";
    pub const DEEP_ARCHIVE: &'static str = "DEEP_ARCHIVE";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_uppercase())
    }

    pub fn standard() -> Self {
        Self::new(Self::STANDARD)
    }

    pub fn archive() -> Self {
        Self::new(Self::ARCHIVE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StorageTier {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for StorageTier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<StorageTier> for String {
    fn from(value: StorageTier) -> Self {
        value.0
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How far below a path `ls` descends. Every depth includes the path's own
/// entry (level 0); children are level 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    /// The path's own entry only.
    Itself,
    /// The path and its descendants up to this many levels.
    Levels(u32),
    /// The path and every descendant.
    Unlimited,
}

impl Depth {
    /// Whether an entry `level` components below the listed path is included.
    pub fn includes(&self, level: usize) -> bool {
        match self {
            Depth::Itself => level == 0,
            Depth::Levels(n) => level <= *n as usize,
            Depth::Unlimited => true,
        }
    }
}

impl From<i32> for Depth {
    fn from(depth: i32) -> Self {
        match depth {
            0 => Depth::Itself,
            d if d < 0 => Depth::Unlimited,
            d => Depth::Levels(d as u32),
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Itself => write!(f, "0"),
            Depth::Levels(n) => write!(f, "{}", n),
            Depth::Unlimited => write!(f, "-1"),
        }
    }
}

/// One filesystem object as seen through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute normalized path inside the mount.
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub content_type: Option<String>,
    pub is_dir: bool,
    pub tier: Option<StorageTier>,
    pub metadata: BTreeMap<String, String>,
}

impl Entry {
    pub fn directory(path: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            modified,
            created: modified,
            content_type: None,
            is_dir: true,
            tier: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Final path component; the root is reported as `/`.
    pub fn file_name(&self) -> &str {
        match self.path.rsplit('/').next() {
            Some("") | None => "/",
            Some(name) => name,
        }
    }
}

/// Timestamps requested by `utimens`; `None` leaves the value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}
