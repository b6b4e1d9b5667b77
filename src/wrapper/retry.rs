//! Retry of transient backend failures.
//!
//! Only operations that can safely be re-issued are retried, and only on
//! `Unavailable`. Everything else, errors included, passes straight through.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::Wrapper;
use crate::client::FilesystemClient;
use crate::fs::{Depth, Entry, FileTimes, FsError, FsResult, Parameters};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 100;

pub struct Retry {
    inner: Box<dyn FilesystemClient>,
    attempts: u32,
    backoff: Duration,
}

impl Retry {
    /// `attempts` counts the first try; values below 1 are raised to 1.
    pub fn new(inner: Box<dyn FilesystemClient>, attempts: u32, backoff: Duration) -> Self {
        Self { inner, attempts: attempts.max(1), backoff }
    }

    pub fn with_defaults(inner: Box<dyn FilesystemClient>) -> Self {
        Self::new(inner, DEFAULT_ATTEMPTS, Duration::from_millis(DEFAULT_BACKOFF_MS))
    }

    async fn pause(&self, attempt: u32, op: &str, path: &str, err: &FsError) {
        let delay = self.backoff * attempt;
        tracing::warn!(
            op,
            path,
            attempt,
            max_attempts = self.attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient backend failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }

    async fn run<T, F, Fut>(&self, op: &str, path: &str, mut call: F) -> FsResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FsResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    self.pause(attempt, op, path, &err).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl Wrapper for Retry {
    const NAME: &'static str = "Retry";

    fn inner(&self) -> &dyn FilesystemClient {
        self.inner.as_ref()
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert("attempts".to_string(), self.attempts.to_string());
        params.insert("backoff_ms".to_string(), self.backoff.as_millis().to_string());
        params
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        self.run("exists", path, || self.inner.exists(path)).await
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        self.run("attrs", path, || self.inner.attrs(path)).await
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        self.run("ls", path, || self.inner.ls(path, depth)).await
    }

    async fn utimens(&self, path: &str, times: FileTimes) -> FsResult<()> {
        self.run("utimens", path, || self.inner.utimens(path, times)).await
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        self.run("upload", path, || self.inner.upload(content, path)).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        self.run("mkdir", path, || self.inner.mkdir(path)).await
    }

    async fn flush(&self, path: &str) -> FsResult<()> {
        self.run("flush", path, || self.inner.flush(path)).await
    }

    async fn download_range(
        &self,
        sink: &mut Vec<u8>,
        path: &str,
        offset: u64,
        length: u64,
    ) -> FsResult<()> {
        // The sink is borrowed mutably per call, so this one is looped by hand.
        let mut attempt = 1;
        loop {
            let mark = sink.len();
            match self.inner.download_range(sink, path, offset, length).await {
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    sink.truncate(mark);
                    self.pause(attempt, "download_range", path, &err).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ObjectStoreClient;
    use crate::storage::{MockObjectStore, StoreError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky_store(failures: u32, calls: Arc<AtomicU32>) -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_head().returning(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                Err(StoreError::Connection("reset by peer".to_string()))
            } else {
                Ok(None)
            }
        });
        store.expect_list().returning(|_| Ok(Vec::new()));
        store
    }

    fn retrying(store: MockObjectStore, attempts: u32) -> Arc<dyn FilesystemClient> {
        Arc::new(Retry::new(
            Box::new(ObjectStoreClient::new(Arc::new(store))),
            attempts,
            Duration::from_millis(1),
        ))
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let node = retrying(flaky_store(2, calls.clone()), 3);

        assert!(node.attrs("/a").await.unwrap().is_none());
        // Two failed heads, then the file head and the marker head succeed.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let node = retrying(flaky_store(u32::MAX, calls.clone()), 3);

        assert!(matches!(node.attrs("/a").await, Err(FsError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_errors_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut store = MockObjectStore::new();
        store.expect_head().returning(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Credentials("expired token".to_string()))
        });
        let node = retrying(store, 5);

        assert!(matches!(node.attrs("/a").await, Err(FsError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let node = retrying(flaky_store(1, calls.clone()), 3);

        assert!(matches!(node.delete("/a").await, Err(FsError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attempts_floor() {
        let node = Retry::new(
            Box::new(ObjectStoreClient::new(Arc::new(MockObjectStore::new()))),
            0,
            Duration::from_millis(250),
        );
        let params = Wrapper::parameters(&node);
        assert_eq!(params.get("attempts").map(String::as_str), Some("1"));
        assert_eq!(params.get("backoff_ms").map(String::as_str), Some("250"));
    }
}
