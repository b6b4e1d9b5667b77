//! In-memory object store.
//!
//! Used for tests and scratch mounts. All data is ephemeral. Behaves like a
//! flat bucket: directories exist only as markers or as prefixes of other keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::models::{ByteRange, ObjectMeta, StoreError, StoreResult};
use super::traits::ObjectStore;
use crate::fs::StorageTier;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    meta: ObjectMeta,
}

/// Thread-safe bucket held in a `BTreeMap` so listings come back key-ordered.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object in a specific tier, bypassing the normal `put` path.
    pub fn insert_with_tier(&self, key: &str, data: Vec<u8>, tier: StorageTier) {
        let meta = Self::meta_for(key, &data, super::models::guess_content_type(key), tier);
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.to_string(), StoredObject { data, meta });
        }
    }

    /// Number of stored objects, markers included.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn meta_for(
        key: &str,
        data: &[u8],
        content_type: Option<String>,
        tier: StorageTier,
    ) -> ObjectMeta {
        let now = Utc::now();
        ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            last_modified: now,
            created: now,
            content_type,
            etag: Some(blake3::hash(data).to_hex().to_string()),
            tier,
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Other(anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects.get(key).map(|o| o.meta.clone()))
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, o)| o.meta.clone())
            .collect())
    }

    async fn get(&self, key: &str, range: Option<ByteRange>) -> StoreResult<Vec<u8>> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        let object = objects.get(key).ok_or_else(|| StoreError::NoSuchKey(key.to_string()))?;
        Ok(match range {
            Some(range) => object.data[range.clamp(object.data.len() as u64)].to_vec(),
            None => object.data.clone(),
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<String>,
    ) -> StoreResult<ObjectMeta> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        // Overwrites keep their storage class and creation time.
        let (tier, created) = match objects.get(key) {
            Some(existing) => (existing.meta.tier.clone(), Some(existing.meta.created)),
            None => (StorageTier::standard(), None),
        };
        let mut meta = Self::meta_for(key, &body, content_type, tier);
        if let Some(created) = created {
            meta.created = created;
        }
        objects.insert(key.to_string(), StoredObject { data: body, meta: meta.clone() });
        Ok(meta)
    }

    async fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        let source = objects.get(from).ok_or_else(|| StoreError::NoSuchKey(from.to_string()))?;
        let mut copied = source.clone();
        let now = Utc::now();
        copied.meta.key = to.to_string();
        copied.meta.last_modified = now;
        copied.meta.created = now;
        objects.insert(to.to_string(), copied);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        objects.remove(key).map(|_| ()).ok_or_else(|| StoreError::NoSuchKey(key.to_string()))
    }

    async fn set_modified(&self, key: &str, modified: DateTime<Utc>) -> StoreResult<()> {
        let mut objects = self.objects.write().map_err(|_| Self::poisoned())?;
        let object =
            objects.get_mut(key).ok_or_else(|| StoreError::NoSuchKey(key.to_string()))?;
        object.meta.last_modified = modified;
        Ok(())
    }
}
