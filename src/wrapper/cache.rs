//! Metadata cache.
//!
//! Remembers `attrs` and `ls` answers for a short TTL. Kernel dispatchers
//! stat the same paths over and over, and every miss is a round trip to the
//! bucket. Mutations that pass through this node invalidate what they touch;
//! changes made by other writers become visible when entries expire.
//!
//! A read that overlaps a mutation may return the pre-mutation answer, but it
//! is never stored: every invalidation advances a generation counter, and a
//! fetched value is only kept if the generation did not move while it was in
//! flight.

use async_trait::async_trait;
use moka::future::Cache;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::Wrapper;
use crate::client::FilesystemClient;
use crate::fs::path::{ancestors, normalize_path};
use crate::fs::{Depth, Entry, FileTimes, FsResult, Parameters};

pub const DEFAULT_TTL_SECS: u64 = 30;
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

pub struct MetadataCache {
    inner: Box<dyn FilesystemClient>,
    ttl: Duration,
    max_entries: u64,
    attrs: Cache<String, Option<Entry>>,
    listings: Cache<(String, Depth), Vec<Entry>>,
    generation: AtomicU64,
}

impl MetadataCache {
    pub fn new(inner: Box<dyn FilesystemClient>, ttl: Duration, max_entries: u64) -> Self {
        Self {
            inner,
            ttl,
            max_entries,
            attrs: Cache::builder().max_capacity(max_entries).time_to_live(ttl).build(),
            listings: Cache::builder().max_capacity(max_entries).time_to_live(ttl).build(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: Box<dyn FilesystemClient>) -> Self {
        Self::new(inner, Duration::from_secs(DEFAULT_TTL_SECS), DEFAULT_MAX_ENTRIES)
    }

    /// Drop cached state a mutation of `path` may have changed.
    ///
    /// A write can create or remove implicit parent directories, so every
    /// ancestor's attrs go too. Listings are cheap to rebuild and any of them
    /// might include `path`, so they are all dropped.
    async fn invalidate(&self, path: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match normalize_path(path) {
            Ok(path) => {
                self.attrs.invalidate(&path).await;
                for ancestor in ancestors(&path) {
                    self.attrs.invalidate(&ancestor).await;
                }
            }
            Err(_) => self.attrs.invalidate_all(),
        }
        self.listings.invalidate_all();
    }

    fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.attrs.invalidate_all();
        self.listings.invalidate_all();
    }

    /// Cache `value`, fetched while `generation` was current. If an
    /// invalidation started since, the value may predate the mutation and is
    /// dropped; the second check covers one that ran during the insert.
    async fn remember<K, V>(&self, cache: &Cache<K, V>, generation: u64, key: K, value: V)
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        cache.insert(key.clone(), value).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            cache.invalidate(&key).await;
        }
    }
}

#[async_trait]
impl Wrapper for MetadataCache {
    const NAME: &'static str = "MetadataCache";

    fn inner(&self) -> &dyn FilesystemClient {
        self.inner.as_ref()
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert("ttl_secs".to_string(), self.ttl.as_secs().to_string());
        params.insert("max_entries".to_string(), self.max_entries.to_string());
        params
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(Wrapper::attrs(self, path).await?.is_some())
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        let key = normalize_path(path)?;
        if let Some(hit) = self.attrs.get(&key).await {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let entry = self.inner.attrs(&key).await?;
        self.remember(&self.attrs, generation, key, entry.clone()).await;
        Ok(entry)
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        let key = (normalize_path(path)?, depth);
        if let Some(hit) = self.listings.get(&key).await {
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let entries = self.inner.ls(&key.0, depth).await?;
        self.remember(&self.listings, generation, key, entries.clone()).await;
        Ok(entries)
    }

    async fn utimens(&self, path: &str, times: FileTimes) -> FsResult<()> {
        let result = self.inner.utimens(path, times).await;
        self.invalidate(path).await;
        result
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        let result = self.inner.upload(content, path).await;
        self.invalidate(path).await;
        result
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let result = self.inner.delete(path).await;
        self.invalidate(path).await;
        result
    }

    async fn mv(&self, old_path: &str, path: &str) -> FsResult<()> {
        let result = self.inner.mv(old_path, path).await;
        // A directory move rewrites every path below it.
        self.invalidate_all();
        result
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        let result = self.inner.mkdir(path).await;
        self.invalidate(path).await;
        result
    }

    async fn rmdir(&self, path: &str) -> FsResult<()> {
        let result = self.inner.rmdir(path).await;
        self.invalidate(path).await;
        result
    }

    async fn flush(&self, path: &str) -> FsResult<()> {
        let result = self.inner.flush(path).await;
        self.invalidate(path).await;
        result
    }
}
