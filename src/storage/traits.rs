use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

use super::models::{ByteRange, ObjectMeta, StoreResult};

/// Remote object-storage API consumed by the backend client.
///
/// Keys carry no leading slash. A key ending in `/` is a directory marker.
#[cfg_attr(any(test, feature = "mockall"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend identifier used in diagnostics.
    fn kind(&self) -> &'static str;

    async fn ping(&self) -> StoreResult<()>;
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>>;

    /// Every object whose key starts with `prefix`, markers included, sorted by key.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>>;

    async fn get(&self, key: &str, range: Option<ByteRange>) -> StoreResult<Vec<u8>>;
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<String>,
    ) -> StoreResult<ObjectMeta>;
    async fn copy(&self, from: &str, to: &str) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
    async fn set_modified(&self, key: &str, modified: DateTime<Utc>) -> StoreResult<()>;
}
