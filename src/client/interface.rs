// Filesystem-client contract
//
// Every node of a pipeline implements this trait, whether it talks to a real
// object store (a leaf) or delegates to an inner node (a wrapper). The mount
// dispatcher only ever sees `Arc<dyn FilesystemClient>`.

use async_trait::async_trait;

use crate::fs::{Depth, Entry, FileTimes, FsResult, Parameters};

/// Unified filesystem-client interface
///
/// Calls may arrive concurrently for the same or different paths. Paths are
/// absolute; implementations normalize them before use.
#[async_trait]
pub trait FilesystemClient: Send + Sync {
    // Introspection
    /// Type name shown in pipeline summaries.
    fn node_name(&self) -> &'static str;

    fn parameters(&self) -> Parameters {
        Parameters::new()
    }

    /// Human-readable description of the pipeline from this node inward.
    fn summary(&self) -> String {
        describe_node(self.node_name(), &self.parameters())
    }

    /// The node this one delegates to. `None` marks a leaf.
    fn inner_node(&self) -> Option<&dyn FilesystemClient> {
        None
    }

    // Health
    async fn is_available(&self) -> FsResult<bool>;

    // Metadata operations
    async fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.attrs(path).await?.is_some())
    }

    async fn attrs(&self, path: &str) -> FsResult<Option<Entry>> {
        Ok(self.ls(path, Depth::Itself).await?.into_iter().next())
    }

    async fn ls(&self, path: &str, depth: Depth) -> FsResult<Vec<Entry>>;

    async fn utimens(&self, _path: &str, _times: FileTimes) -> FsResult<()> {
        Ok(())
    }

    // Whole-object operations
    async fn upload(&self, content: &[u8], path: &str) -> FsResult<()>;
    async fn delete(&self, path: &str) -> FsResult<()>;
    async fn mv(&self, old_path: &str, path: &str) -> FsResult<()>;

    // Directory operations
    async fn mkdir(&self, path: &str) -> FsResult<()>;
    async fn rmdir(&self, path: &str) -> FsResult<()>;

    // Range operations
    async fn download_range(
        &self,
        sink: &mut Vec<u8>,
        path: &str,
        offset: u64,
        length: u64,
    ) -> FsResult<()>;

    async fn upload_range(&self, source: &[u8], path: &str, offset: u64) -> FsResult<()>;

    /// Durability barrier for buffered range writes. No-op for synchronous backends.
    async fn flush(&self, _path: &str) -> FsResult<()> {
        Ok(())
    }
}

/// `Name[key=value, ...]`, with the brackets dropped when there is nothing to show.
pub fn describe_node(name: &str, parameters: &Parameters) -> String {
    let shown: Vec<String> = parameters
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    if shown.is_empty() { name.to_string() } else { format!("{}[{}]", name, shown.join(", ")) }
}
