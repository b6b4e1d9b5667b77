//! Per-object size limit, checked before anything reaches the backend.

use async_trait::async_trait;

use super::Wrapper;
use crate::client::FilesystemClient;
use crate::fs::{FsError, FsResult, Parameters};

pub struct SizeLimit {
    inner: Box<dyn FilesystemClient>,
    max_object_bytes: u64,
}

impl SizeLimit {
    pub fn new(inner: Box<dyn FilesystemClient>, max_object_bytes: u64) -> Self {
        Self { inner, max_object_bytes }
    }

    fn check(&self, path: &str, size: u64) -> FsResult<()> {
        if size > self.max_object_bytes {
            return Err(FsError::TooLarge {
                path: path.to_string(),
                size,
                limit: self.max_object_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Wrapper for SizeLimit {
    const NAME: &'static str = "SizeLimit";

    fn inner(&self) -> &dyn FilesystemClient {
        self.inner.as_ref()
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert("max_object_bytes".to_string(), self.max_object_bytes.to_string());
        params
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        self.check(path, content.len() as u64)?;
        self.inner.upload(content, path).await
    }

    async fn upload_range(&self, source: &[u8], path: &str, offset: u64) -> FsResult<()> {
        self.check(path, offset.saturating_add(source.len() as u64))?;
        self.inner.upload_range(source, path, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ObjectStoreClient;
    use crate::storage::MemoryObjectStore;
    use std::sync::Arc;

    fn limited(store: Arc<MemoryObjectStore>, max: u64) -> Arc<dyn FilesystemClient> {
        Arc::new(SizeLimit::new(Box::new(ObjectStoreClient::new(store)), max))
    }

    #[tokio::test]
    async fn test_upload_within_limit() {
        let store = Arc::new(MemoryObjectStore::new());
        let node = limited(store.clone(), 8);
        node.upload(b"12345678", "/ok").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_over_limit_never_reaches_backend() {
        let store = Arc::new(MemoryObjectStore::new());
        let node = limited(store.clone(), 8);
        let err = node.upload(b"123456789", "/big").await.unwrap_err();
        assert_eq!(err, FsError::TooLarge { path: "/big".to_string(), size: 9, limit: 8 });
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_range_end_is_checked() {
        let node = limited(Arc::new(MemoryObjectStore::new()), 10);
        node.upload_range(b"abc", "/f", 7).await.unwrap();
        assert!(matches!(
            node.upload_range(b"abcd", "/f", 7).await,
            Err(FsError::TooLarge { size: 11, .. })
        ));
        assert!(matches!(
            node.upload_range(b"x", "/f", u64::MAX).await,
            Err(FsError::TooLarge { .. })
        ));
    }
}
