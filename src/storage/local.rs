//! Object store backed by a local directory tree.
//!
//! Keys map onto paths below `root`; every directory is treated as a marker.
//! Useful for development mounts and as a stand-in for a remote bucket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

use super::models::{ByteRange, ObjectMeta, StoreError, StoreResult, guess_content_type};
use super::traits::ObjectStore;
use crate::fs::StorageTier;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        let relative = key.trim_end_matches('/');
        if relative.is_empty() { self.root.clone() } else { self.root.join(relative) }
    }

    fn key_for(&self, path: &Path, is_dir: bool) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> =
            relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        if parts.is_empty() {
            return None;
        }
        let key = parts.join("/");
        Some(if is_dir { format!("{}/", key) } else { key })
    }

    fn meta_from_fs(key: &str, metadata: &std::fs::Metadata) -> ObjectMeta {
        let modified: DateTime<Utc> =
            metadata.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());
        let created = metadata.created().map(DateTime::from).unwrap_or(modified);
        let is_dir = metadata.is_dir();
        ObjectMeta {
            key: key.to_string(),
            size: if is_dir { 0 } else { metadata.len() },
            last_modified: modified,
            created,
            content_type: if is_dir { None } else { guess_content_type(key) },
            etag: None,
            tier: StorageTier::standard(),
        }
    }

    async fn ensure_parent(path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| map_io(e, path))?;
        }
        Ok(())
    }
}

fn map_io(err: io::Error, path: &Path) -> StoreError {
    match err.kind() {
        io::ErrorKind::NotFound => StoreError::NoSuchKey(path.display().to_string()),
        io::ErrorKind::TimedOut => StoreError::Timeout(path.display().to_string()),
        io::ErrorKind::PermissionDenied => {
            StoreError::Credentials(format!("permission denied: {}", path.display()))
        }
        _ => StoreError::Other(anyhow::Error::new(err).context(path.display().to_string())),
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn ping(&self) -> StoreResult<()> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Credentials(format!(
                "store root is not a directory: {}",
                self.root.display()
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Credentials(
                format!("store root does not exist: {}", self.root.display()),
            )),
            Err(e) => Err(map_io(e, &self.root)),
        }
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        let path = self.resolve(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() == key.ends_with('/') => {
                Ok(Some(Self::meta_from_fs(key, &meta)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io(e, &path)),
        }
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let start = match prefix.rfind('/') {
            Some(idx) => self.resolve(&prefix[..idx]),
            None => self.root.clone(),
        };

        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) if e.kind() == io::ErrorKind::NotADirectory => continue,
                Err(e) => return Err(map_io(e, &dir)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| map_io(e, &dir))? {
                let meta = entry.metadata().await.map_err(|e| map_io(e, &entry.path()))?;
                let Some(key) = self.key_for(&entry.path(), meta.is_dir()) else {
                    continue;
                };
                if meta.is_dir() {
                    stack.push(entry.path());
                }
                if key.starts_with(prefix) {
                    out.push(Self::meta_from_fs(&key, &meta));
                }
            }
        }
        // The marker for the start directory itself is never yielded by read_dir.
        if !prefix.is_empty() && prefix.ends_with('/') {
            if let Some(meta) = self.head(prefix).await? {
                out.push(meta);
            }
        }
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    async fn get(&self, key: &str, range: Option<ByteRange>) -> StoreResult<Vec<u8>> {
        let path = self.resolve(key);
        let data = tokio::fs::read(&path).await.map_err(|e| map_io(e, &path))?;
        Ok(match range {
            Some(range) => data[range.clamp(data.len() as u64)].to_vec(),
            None => data,
        })
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: Option<String>,
    ) -> StoreResult<ObjectMeta> {
        let path = self.resolve(key);
        if key.ends_with('/') {
            tokio::fs::create_dir_all(&path).await.map_err(|e| map_io(e, &path))?;
        } else {
            Self::ensure_parent(&path).await?;
            tokio::fs::write(&path, &body).await.map_err(|e| map_io(e, &path))?;
        }
        let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(e, &path))?;
        Ok(Self::meta_from_fs(key, &meta))
    }

    async fn copy(&self, from: &str, to: &str) -> StoreResult<()> {
        let source = self.resolve(from);
        let target = self.resolve(to);
        if from.ends_with('/') {
            tokio::fs::create_dir_all(&target).await.map_err(|e| map_io(e, &target))?;
            return Ok(());
        }
        Self::ensure_parent(&target).await?;
        tokio::fs::copy(&source, &target).await.map_err(|e| map_io(e, &source))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let path = self.resolve(key);
        let result = if key.ends_with('/') {
            tokio::fs::remove_dir(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.map_err(|e| map_io(e, &path))
    }

    async fn set_modified(&self, key: &str, modified: DateTime<Utc>) -> StoreResult<()> {
        if key.ends_with('/') {
            return Err(StoreError::Unsupported(format!("set_modified on marker {}", key)));
        }
        let path = self.resolve(key);
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::options().write(true).open(&target)?;
            file.set_modified(modified.into())
        })
        .await
        .map_err(|e| StoreError::Other(anyhow::Error::new(e)))?
        .map_err(|e| map_io(e, &path))
    }
}
