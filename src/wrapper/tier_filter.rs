//! Storage-tier visibility filter.
//!
//! Objects moved to a cold tier still show up in bucket listings but cannot be
//! read until they are restored out of band. This wrapper hides such files
//! from `ls` so the mount never offers something that looks readable but is
//! not. Directories always stay visible so the tree remains navigable.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::Wrapper;
use crate::client::FilesystemClient;
use crate::fs::{Depth, Entry, FsResult, Parameters, StorageTier};

pub struct TierFilter {
    inner: Box<dyn FilesystemClient>,
    excluded: BTreeSet<StorageTier>,
}

impl TierFilter {
    pub fn new<I, T>(inner: Box<dyn FilesystemClient>, excluded: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<StorageTier>,
    {
        Self { inner, excluded: excluded.into_iter().map(Into::into).collect() }
    }

    pub fn excluded(&self) -> &BTreeSet<StorageTier> {
        &self.excluded
    }

    /// Whether an entry survives the filter.
    pub fn is_visible(&self, entry: &Entry) -> bool {
        entry.is_dir || entry.tier.as_ref().is_none_or(|tier| !self.excluded.contains(tier))
    }
}

#[async_trait]
impl Wrapper for TierFilter {
    const NAME: &'static str = "TierFilter";

    fn inner(&self) -> &dyn FilesystemClient {
        self.inner.as_ref()
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        let tiers: Vec<&str> = self.excluded.iter().map(StorageTier::as_str).collect();
        params.insert("excluded_tiers".to_string(), tiers.join(","));
        params
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        let entries = self.inner.ls(path, depth).await?;
        let before = entries.len();
        let visible: Vec<Entry> = entries.into_iter().filter(|e| self.is_visible(e)).collect();
        if visible.len() != before {
            tracing::debug!(path, hidden = before - visible.len(), "tier filter hid entries");
        }
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ObjectStoreClient;
    use crate::storage::MemoryObjectStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn file(path: &str, tier: Option<&str>) -> Entry {
        let mut entry = Entry::directory(path, Utc::now());
        entry.is_dir = false;
        entry.size = 1;
        entry.tier = tier.map(StorageTier::new);
        entry
    }

    fn filter_over(store: Arc<MemoryObjectStore>, excluded: &[&str]) -> TierFilter {
        TierFilter::new(Box::new(ObjectStoreClient::new(store)), excluded.iter().copied())
    }

    #[test]
    fn test_visibility_rules() {
        let filter = filter_over(Arc::new(MemoryObjectStore::new()), &["archive"]);
        assert!(filter.is_visible(&file("/a", Some("STANDARD"))));
        assert!(!filter.is_visible(&file("/b", Some("ARCHIVE"))));
        assert!(filter.is_visible(&file("/c", None)));

        let mut dir = file("/d", Some("ARCHIVE"));
        dir.is_dir = true;
        assert!(filter.is_visible(&dir));
    }

    #[tokio::test]
    async fn test_hides_archived_files() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert_with_tier("a.txt", b"a".to_vec(), StorageTier::standard());
        store.insert_with_tier("b.txt", b"b".to_vec(), StorageTier::archive());
        let filter: Arc<dyn FilesystemClient> = Arc::new(filter_over(store, &["ARCHIVE"]));

        let listing = filter.ls("/", Depth::Levels(1)).await.unwrap();
        let paths: Vec<_> = listing.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/a.txt"]);
        assert!(filter.ls("/b.txt", Depth::Itself).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_directory_kept_when_all_children_hidden() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert_with_tier("cold/x.bin", vec![1], StorageTier::archive());
        store.insert_with_tier("cold/y.bin", vec![2], StorageTier::new("DEEP_ARCHIVE"));
        let filter: Arc<dyn FilesystemClient> =
            Arc::new(filter_over(store, &["ARCHIVE", "DEEP_ARCHIVE"]));

        let listing = filter.ls("/", Depth::Unlimited).await.unwrap();
        let paths: Vec<_> = listing.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/cold"]);
        assert!(listing.iter().all(|e| e.is_dir));

        let cold = filter.ls("/cold", Depth::Levels(1)).await.unwrap();
        assert_eq!(cold.len(), 1);
        assert_eq!(cold[0].path, "/cold");
    }

    #[tokio::test]
    async fn test_other_operations_pass_through() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert_with_tier("frozen.dat", b"ice".to_vec(), StorageTier::archive());
        let filter: Arc<dyn FilesystemClient> = Arc::new(filter_over(store, &["ARCHIVE"]));

        // attrs is not filtered; only listings are.
        assert!(filter.attrs("/frozen.dat").await.unwrap().is_some());
        let mut sink = Vec::new();
        filter.download_range(&mut sink, "/frozen.dat", 0, 3).await.unwrap();
        assert_eq!(sink, b"ice");
    }

    #[test]
    fn test_parameters_sorted() {
        let filter =
            filter_over(Arc::new(MemoryObjectStore::new()), &["DEEP_ARCHIVE", "ARCHIVE"]);
        let params = Wrapper::parameters(&filter);
        assert_eq!(params.get("excluded_tiers").unwrap(), "ARCHIVE,DEEP_ARCHIVE");
        assert_eq!(
            FilesystemClient::summary(&filter),
            "TierFilter[excluded_tiers=ARCHIVE,DEEP_ARCHIVE]\n  └─ ObjectStoreClient[backend=memory]"
        );
    }
}
