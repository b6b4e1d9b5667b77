// ObjectStoreClient - leaf node that maps the filesystem contract onto an object store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::interface::FilesystemClient;
use super::write_buffer::WriteBuffers;
use crate::fs::path::{
    ancestors, key_to_path, normalize_path, path_to_dir_key, path_to_key, relative_depth,
};
use crate::fs::{Depth, Entry, FileTimes, FsError, FsResult, Parameters};
use crate::storage::models::guess_content_type;
use crate::storage::{ByteRange, ObjectMeta, ObjectStore, StoreError};

/// Largest object a single put may create (5 GiB, the common single-request
/// ceiling for object stores). Range writes ending past it are refused.
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 5 * 1024 * 1024 * 1024;

pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    allow_overwrite_on_move: bool,
    max_object_bytes: u64,
    buffers: WriteBuffers,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
            allow_overwrite_on_move: false,
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
            buffers: WriteBuffers::new(),
        }
    }

    /// Root every key under `prefix` inside the store.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn with_overwrite_on_move(mut self, allow: bool) -> Self {
        self.allow_overwrite_on_move = allow;
        self
    }

    pub fn with_max_object_bytes(mut self, max: u64) -> Self {
        self.max_object_bytes = max;
        self
    }

    /// Paths with staged range writes that have not been flushed.
    pub fn pending_paths(&self) -> Vec<String> {
        self.buffers.pending_paths()
    }

    fn key(&self, path: &str) -> String {
        path_to_key(&self.prefix, path)
    }

    fn dir_key(&self, path: &str) -> String {
        path_to_dir_key(&self.prefix, path)
    }

    fn map_store_error(err: StoreError, path: &str) -> FsError {
        match err {
            StoreError::NoSuchKey(_) => FsError::NotFound(path.to_string()),
            StoreError::Timeout(msg) => {
                FsError::Unavailable(format!("{}: request timed out ({})", path, msg))
            }
            StoreError::Connection(msg) => FsError::Unavailable(format!("{}: {}", path, msg)),
            StoreError::Credentials(msg) => FsError::Configuration(msg),
            StoreError::Unsupported(msg) => FsError::Unsupported(msg),
            StoreError::Other(e) => FsError::Unavailable(format!("{}: {:#}", path, e)),
        }
    }

    fn file_entry(path: String, meta: ObjectMeta) -> Entry {
        let mut metadata = BTreeMap::new();
        metadata.insert("key".to_string(), meta.key);
        if let Some(etag) = meta.etag {
            metadata.insert("etag".to_string(), etag);
        }
        Entry {
            path,
            size: meta.size,
            modified: meta.last_modified,
            created: meta.created,
            content_type: meta.content_type,
            is_dir: false,
            tier: Some(meta.tier),
            metadata,
        }
    }

    fn marker_entry(path: String, meta: &ObjectMeta) -> Entry {
        let mut entry = Entry::directory(path, meta.last_modified);
        entry.created = meta.created;
        entry.metadata.insert("key".to_string(), meta.key.clone());
        entry
    }

    fn implicit_dir(path: String) -> Entry {
        Entry::directory(path, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Resolve a normalized path to its entry. Files shadow directories of the same name.
    async fn stat(&self, path: &str) -> FsResult<Option<Entry>> {
        if path != "/" {
            let key = self.key(path);
            if let Some(meta) =
                self.store.head(&key).await.map_err(|e| Self::map_store_error(e, path))?
            {
                return Ok(Some(Self::file_entry(path.to_string(), meta)));
            }
        }

        let dir_key = self.dir_key(path);
        if !dir_key.is_empty() {
            if let Some(meta) =
                self.store.head(&dir_key).await.map_err(|e| Self::map_store_error(e, path))?
            {
                return Ok(Some(Self::marker_entry(path.to_string(), &meta)));
            }
        }

        if path == "/" {
            return Ok(Some(Self::implicit_dir("/".to_string())));
        }

        let children =
            self.store.list(&dir_key).await.map_err(|e| Self::map_store_error(e, path))?;
        if children.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self::implicit_dir(path.to_string())))
        }
    }

    async fn is_directory(&self, path: &str) -> FsResult<bool> {
        Ok(self.stat(path).await?.is_some_and(|e| e.is_dir))
    }

    /// A path cannot be created below a file.
    async fn check_ancestors(&self, path: &str) -> FsResult<()> {
        for ancestor in ancestors(path) {
            if ancestor == "/" {
                continue;
            }
            let key = self.key(&ancestor);
            if self.store.head(&key).await.map_err(|e| Self::map_store_error(e, path))?.is_some() {
                return Err(FsError::NotDirectory(ancestor));
            }
        }
        Ok(())
    }

    fn too_large(&self, path: &str, size: u64) -> FsError {
        FsError::TooLarge { path: path.to_string(), size, limit: self.max_object_bytes }
    }

    /// Every entry below a directory, keyed by path, with implied parents filled in.
    async fn descendants(&self, path: &str) -> FsResult<BTreeMap<String, Entry>> {
        let objects =
            self.store.list(&self.dir_key(path)).await.map_err(|e| Self::map_store_error(e, path))?;

        let mut tree: BTreeMap<String, Entry> = BTreeMap::new();
        for meta in objects {
            let Some(object_path) = key_to_path(&self.prefix, &meta.key) else {
                continue;
            };
            if !relative_depth(path, &object_path).is_some_and(|level| level >= 1) {
                continue;
            }
            for ancestor in ancestors(&object_path) {
                if relative_depth(path, &ancestor).is_some_and(|level| level >= 1) {
                    tree.entry(ancestor.clone()).or_insert_with(|| Self::implicit_dir(ancestor));
                }
            }
            if meta.is_marker() {
                let shadowed = tree.get(&object_path).is_some_and(|e| !e.is_dir);
                if !shadowed {
                    tree.insert(object_path.clone(), Self::marker_entry(object_path, &meta));
                }
            } else {
                tree.insert(object_path.clone(), Self::file_entry(object_path, meta));
            }
        }
        Ok(tree)
    }

    async fn flush_normalized(&self, path: &str) -> FsResult<()> {
        let Some(guard) = self.buffers.lock(path).await else {
            return Ok(());
        };
        if guard.is_empty() {
            self.buffers.release(path, guard);
            return Ok(());
        }

        let key = self.key(path);
        let base = match self.store.get(&key, None).await {
            Ok(data) => data,
            Err(StoreError::NoSuchKey(_)) => {
                if self.is_directory(path).await? {
                    return Err(FsError::IsDirectory(path.to_string()));
                }
                self.check_ancestors(path).await?;
                Vec::new()
            }
            Err(e) => return Err(Self::map_store_error(e, path)),
        };

        let segments = guard.segments().len();
        let merged = guard.apply(base).ok_or_else(|| self.too_large(path, guard.end()))?;
        let size = merged.len();
        // On failure the guard drops with its segments intact for a later retry.
        self.store
            .put(&key, merged, guess_content_type(&key))
            .await
            .map_err(|e| Self::map_store_error(e, path))?;
        self.buffers.release(path, guard);

        tracing::debug!(path, segments, size, "flushed range writes");
        Ok(())
    }
}

#[async_trait]
impl FilesystemClient for ObjectStoreClient {
    fn node_name(&self) -> &'static str {
        "ObjectStoreClient"
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert("backend".to_string(), self.store.kind().to_string());
        params.insert("prefix".to_string(), self.prefix.clone());
        if self.allow_overwrite_on_move {
            params.insert("allow_overwrite_on_move".to_string(), "true".to_string());
        }
        if self.max_object_bytes != DEFAULT_MAX_OBJECT_BYTES {
            params.insert("max_object_bytes".to_string(), self.max_object_bytes.to_string());
        }
        params
    }

    async fn is_available(&self) -> FsResult<bool> {
        match self.store.ping().await {
            Ok(()) => Ok(true),
            Err(StoreError::Credentials(msg)) => Err(FsError::Configuration(msg)),
            Err(e) => {
                tracing::warn!(backend = self.store.kind(), error = %e, "backend unreachable");
                Ok(false)
            }
        }
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        let path = normalize_path(path)?;
        self.stat(&path).await
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        let path = normalize_path(path)?;
        tracing::debug!(path = %path, depth = %depth, "ls");

        let Some(entry) = self.stat(&path).await? else {
            return Ok(Vec::new());
        };
        if depth == Depth::Itself || !entry.is_dir {
            return Ok(vec![entry]);
        }

        // The directory itself sorts ahead of everything below it.
        let mut listing = vec![entry];
        listing.extend(
            self.descendants(&path).await?.into_values().filter(|e| {
                relative_depth(&path, &e.path).is_some_and(|level| depth.includes(level))
            }),
        );
        Ok(listing)
    }

    async fn utimens(&self, path: &str, times: FileTimes) -> FsResult<()> {
        let path = normalize_path(path)?;
        let entry = self.stat(&path).await?.ok_or_else(|| FsError::NotFound(path.clone()))?;
        let Some(modified) = times.modified else {
            return Ok(());
        };
        if entry.is_dir {
            return Ok(());
        }
        match self.store.set_modified(&self.key(&path), modified).await {
            Ok(()) => Ok(()),
            Err(StoreError::Unsupported(msg)) => {
                tracing::debug!(path = %path, reason = %msg, "utimens not representable");
                Ok(())
            }
            Err(e) => Err(Self::map_store_error(e, &path)),
        }
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        if content.len() as u64 > self.max_object_bytes {
            return Err(self.too_large(&path, content.len() as u64));
        }
        if self.is_directory(&path).await? {
            return Err(FsError::IsDirectory(path));
        }
        self.check_ancestors(&path).await?;
        self.buffers.discard(&path).await;

        let key = self.key(&path);
        tracing::debug!(path = %path, size = content.len(), "upload");
        self.store
            .put(&key, content.to_vec(), guess_content_type(&key))
            .await
            .map_err(|e| Self::map_store_error(e, &path))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        match self.stat(&path).await? {
            None => return Err(FsError::NotFound(path)),
            Some(entry) if entry.is_dir => return Err(FsError::IsDirectory(path)),
            Some(_) => {}
        }
        self.buffers.discard(&path).await;

        tracing::debug!(path = %path, "delete");
        self.store.delete(&self.key(&path)).await.map_err(|e| Self::map_store_error(e, &path))
    }

    async fn mv(&self, old_path: &str, path: &str) -> FsResult<()> {
        let old_path = normalize_path(old_path)?;
        let new_path = normalize_path(path)?;
        if old_path == new_path {
            return Ok(());
        }
        if old_path == "/" || relative_depth(&old_path, &new_path).is_some() {
            return Err(FsError::Conflict(format!(
                "cannot move {} into itself ({})",
                old_path, new_path
            )));
        }

        let source =
            self.stat(&old_path).await?.ok_or_else(|| FsError::NotFound(old_path.clone()))?;
        if let Some(target) = self.stat(&new_path).await? {
            if !self.allow_overwrite_on_move || target.is_dir || source.is_dir {
                return Err(FsError::Conflict(format!("destination exists: {}", new_path)));
            }
        }
        self.check_ancestors(&new_path).await?;

        tracing::debug!(from = %old_path, to = %new_path, is_dir = source.is_dir, "mv");

        if !source.is_dir {
            self.flush_normalized(&old_path).await?;
            self.buffers.discard(&new_path).await;
            let (from, to) = (self.key(&old_path), self.key(&new_path));
            self.store.copy(&from, &to).await.map_err(|e| Self::map_store_error(e, &old_path))?;
            return self
                .store
                .delete(&from)
                .await
                .map_err(|e| Self::map_store_error(e, &old_path));
        }

        for pending in self.buffers.pending_paths() {
            if relative_depth(&old_path, &pending).is_some() {
                self.flush_normalized(&pending).await?;
            }
        }

        let (from_prefix, to_prefix) = (self.dir_key(&old_path), self.dir_key(&new_path));
        let objects =
            self.store.list(&from_prefix).await.map_err(|e| Self::map_store_error(e, &old_path))?;
        for meta in &objects {
            let suffix = &meta.key[from_prefix.len()..];
            let target = format!("{}{}", to_prefix, suffix);
            self.store
                .copy(&meta.key, &target)
                .await
                .map_err(|e| Self::map_store_error(e, &old_path))?;
        }
        // Deepest keys first so local directory markers empty out before removal.
        for meta in objects.iter().rev() {
            match self.store.delete(&meta.key).await {
                Ok(()) | Err(StoreError::NoSuchKey(_)) => {}
                Err(e) => return Err(Self::map_store_error(e, &old_path)),
            }
        }
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        match self.stat(&path).await? {
            Some(entry) if entry.is_dir => return Ok(()),
            Some(_) => return Err(FsError::Conflict(format!("file exists: {}", path))),
            None => {}
        }
        self.check_ancestors(&path).await?;

        tracing::debug!(path = %path, "mkdir");
        self.store
            .put(&self.dir_key(&path), Vec::new(), None)
            .await
            .map_err(|e| Self::map_store_error(e, &path))?;
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        if path == "/" {
            return Err(FsError::Unsupported("cannot remove the root directory".to_string()));
        }
        match self.stat(&path).await? {
            None => return Err(FsError::NotFound(path)),
            Some(entry) if !entry.is_dir => return Err(FsError::NotDirectory(path)),
            Some(_) => {}
        }

        let dir_key = self.dir_key(&path);
        let objects =
            self.store.list(&dir_key).await.map_err(|e| Self::map_store_error(e, &path))?;
        if objects.iter().any(|meta| meta.key != dir_key) {
            return Err(FsError::NotEmpty(path));
        }

        tracing::debug!(path = %path, "rmdir");
        self.store.delete(&dir_key).await.map_err(|e| Self::map_store_error(e, &path))
    }

    async fn download_range(
        &self,
        sink: &mut Vec<u8>,
        path: &str,
        offset: u64,
        length: u64,
    ) -> FsResult<()> {
        let path = normalize_path(path)?;
        let key = self.key(&path);
        let meta = match self.store.head(&key).await.map_err(|e| Self::map_store_error(e, &path))? {
            Some(meta) => meta,
            None if self.is_directory(&path).await? => return Err(FsError::IsDirectory(path)),
            None => return Err(FsError::NotFound(path)),
        };

        if offset > meta.size {
            return Err(FsError::OutOfRange { path, offset, size: meta.size });
        }
        if length == 0 || offset == meta.size {
            return Ok(());
        }

        let data = self
            .store
            .get(&key, Some(ByteRange::new(offset, length)))
            .await
            .map_err(|e| Self::map_store_error(e, &path))?;
        tracing::debug!(path = %path, offset, requested = length, returned = data.len(), "download_range");
        sink.extend_from_slice(&data);
        Ok(())
    }

    async fn upload_range(&self, source: &[u8], path: &str, offset: u64) -> FsResult<()> {
        let path = normalize_path(path)?;
        if path == "/" {
            return Err(FsError::IsDirectory(path));
        }
        if source.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(source.len() as u64)
            .ok_or_else(|| self.too_large(&path, u64::MAX))?;
        if end > self.max_object_bytes {
            return Err(self.too_large(&path, end));
        }
        self.buffers.stage(&path, offset, source).await;
        Ok(())
    }

    async fn flush(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path)?;
        self.flush_normalized(&path).await
    }
}
