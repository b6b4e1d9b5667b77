//! Wrapping components.
//!
//! A wrapper owns exactly one inner node and sits in front of it in the
//! pipeline. [`Wrapper`] carries a delegating default for every contract
//! operation, and the blanket impl below turns any `Wrapper` into a
//! [`FilesystemClient`], so a concrete wrapper overrides only the operations
//! whose behavior it changes.
//!
//! Callers should drive wrappers through `FilesystemClient` (usually as
//! `Arc<dyn FilesystemClient>`); both traits name their methods alike.

pub mod cache;
pub mod retry;
pub mod size_limit;
pub mod tier_filter;

use async_trait::async_trait;

use crate::client::{FilesystemClient, describe_node};
use crate::fs::{Depth, Entry, FileTimes, FsResult, Parameters};

pub use cache::MetadataCache;
pub use retry::Retry;
pub use size_limit::SizeLimit;
pub use tier_filter::TierFilter;

#[async_trait]
pub trait Wrapper: Send + Sync {
    /// Type name shown in pipeline summaries.
    const NAME: &'static str;

    /// The node this wrapper delegates to, fixed at construction.
    fn inner(&self) -> &dyn FilesystemClient;

    fn parameters(&self) -> Parameters {
        Parameters::new()
    }

    async fn is_available(&self) -> FsResult<bool> {
        self.inner().is_available().await
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        self.inner().exists(path).await
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        self.inner().attrs(path).await
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        self.inner().ls(path, depth).await
    }

    async fn utimens(&self, path: &str, times: FileTimes) -> FsResult<()> {
        self.inner().utimens(path, times).await
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        self.inner().upload(content, path).await
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        self.inner().delete(path).await
    }

    async fn mv(&self, old_path: &str, path: &str) -> FsResult<()> {
        self.inner().mv(old_path, path).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        self.inner().mkdir(path).await
    }

    async fn rmdir(&self, path: &str) -> FsResult<()> {
        self.inner().rmdir(path).await
    }

    async fn download_range(
        &self,
        sink: &mut Vec<u8>,
        path: &str,
        offset: u64,
        length: u64,
    ) -> FsResult<()> {
        self.inner().download_range(sink, path, offset, length).await
    }

    async fn upload_range(&self, source: &[u8], path: &str, offset: u64) -> FsResult<()> {
        self.inner().upload_range(source, path, offset).await
    }

    async fn flush(&self, path: &str) -> FsResult<()> {
        self.inner().flush(path).await
    }
}

/// Join a node's own description with its inner node's summary.
pub fn nest_summary(head: &str, inner: &str) -> String {
    format!("{}\n  └─ {}", head, inner.replace('\n', "\n  "))
}

#[async_trait]
impl<W: Wrapper> FilesystemClient for W {
    fn node_name(&self) -> &'static str {
        W::NAME
    }

    fn parameters(&self) -> Parameters {
        Wrapper::parameters(self)
    }

    fn summary(&self) -> String {
        let head = describe_node(W::NAME, &Wrapper::parameters(self));
        nest_summary(&head, &self.inner().summary())
    }

    fn inner_node(&self) -> Option<&dyn FilesystemClient> {
        Some(self.inner())
    }

    async fn is_available(&self) -> FsResult<bool> {
        Wrapper::is_available(self).await
    }

    async fn exists(&self, path: &str) -> FsResult<bool> {
        Wrapper::exists(self, path).await
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        Wrapper::attrs(self, path).await
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>> {
        Wrapper::ls(self, path, depth).await
    }

    async fn utimens(&self, path: &str, times: FileTimes) -> FsResult<()> {
        Wrapper::utimens(self, path, times).await
    }

    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()> {
        Wrapper::upload(self, content, path).await
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        Wrapper::delete(self, path).await
    }

    async fn mv(&self, old_path: &str, path: &str) -> FsResult<()> {
        Wrapper::mv(self, old_path, path).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        Wrapper::mkdir(self, path).await
    }

    async fn rmdir(&self, path: &str) -> FsResult<()> {
        Wrapper::rmdir(self, path).await
    }

    async fn download_range(
        &self,
        sink: &mut Vec<u8>,
        path: &str,
        offset: u64,
        length: u64,
    ) -> FsResult<()> {
        Wrapper::download_range(self, sink, path, offset, length).await
    }

    async fn upload_range(&self, source: &[u8], path: &str, offset: u64) -> FsResult<()> {
        Wrapper::upload_range(self, source, path, offset).await
    }

    async fn flush(&self, path: &str) -> FsResult<()> {
        Wrapper::flush(self, path).await
    }
}
