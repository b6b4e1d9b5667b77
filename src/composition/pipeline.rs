// Pipeline assembly
//
// Turns a `Config` into a chain of filesystem clients: one leaf talking to the
// object store, wrapped by zero or more wrappers in list order. The result is
// handed to the mount dispatcher as a single `Arc<dyn FilesystemClient>`.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{FilesystemClient, ObjectStoreClient};
use crate::config::{BackendConfig, Config, WrapperSpec};
use crate::fs::{FsError, FsResult};
use crate::storage::{LocalObjectStore, MemoryObjectStore, ObjectStore};
use crate::wrapper::{MetadataCache, Retry, SizeLimit, TierFilter, cache, retry};

pub const BACKEND_KINDS: &[&str] = &["memory", "local"];
pub const WRAPPER_KINDS: &[&str] = &["tier_filter", "cache", "retry", "size_limit"];

/// An assembled, validated chain of filesystem clients.
pub struct Pipeline {
    client: Arc<dyn FilesystemClient>,
    wrappers: usize,
}

impl Pipeline {
    /// Build the backend client, then apply `config.wrappers` with the first
    /// entry wrapping the backend directly.
    pub fn assemble(config: &Config) -> FsResult<Self> {
        let mut builder = PipelineBuilder::new(build_backend(&config.backend)?);
        for spec in &config.wrappers {
            builder = builder.wrap_spec(spec)?;
        }
        let pipeline = builder.build()?;

        tracing::info!(
            backend = %config.backend.kind,
            wrappers = pipeline.wrappers,
            "pipeline assembled:\n{}",
            pipeline.summary()
        );
        Ok(pipeline)
    }

    /// The outermost node, which is what a dispatcher talks to.
    pub fn client(&self) -> Arc<dyn FilesystemClient> {
        Arc::clone(&self.client)
    }

    pub fn summary(&self) -> String {
        self.client.summary()
    }

    pub fn wrapper_count(&self) -> usize {
        self.wrappers
    }
}

/// Programmatic pipeline construction.
///
/// ```ignore
/// let pipeline = PipelineBuilder::new(Box::new(leaf))
///     .wrap(MetadataCache::with_defaults)
///     .wrap(|inner| TierFilter::new(inner, ["ARCHIVE"]))
///     .build()?;
/// ```
pub struct PipelineBuilder {
    node: Box<dyn FilesystemClient>,
    wrappers: usize,
}

impl PipelineBuilder {
    pub fn new(leaf: Box<dyn FilesystemClient>) -> Self {
        Self { node: leaf, wrappers: 0 }
    }

    /// Put a new outermost node in front of the current chain.
    pub fn wrap<W, F>(self, wrap: F) -> Self
    where
        F: FnOnce(Box<dyn FilesystemClient>) -> W,
        W: FilesystemClient + 'static,
    {
        Self { node: Box::new(wrap(self.node)), wrappers: self.wrappers + 1 }
    }

    /// Apply one configured wrapper.
    pub fn wrap_spec(self, spec: &WrapperSpec) -> FsResult<Self> {
        let builder = match spec.kind.as_str() {
            "tier_filter" => {
                let excluded = spec.require_string_list("excluded_tiers")?;
                self.wrap(|inner| TierFilter::new(inner, excluded))
            }
            "cache" => {
                let ttl = spec.u64_param("ttl_secs")?.unwrap_or(cache::DEFAULT_TTL_SECS);
                let max_entries =
                    spec.u64_param("max_entries")?.unwrap_or(cache::DEFAULT_MAX_ENTRIES);
                self.wrap(|inner| MetadataCache::new(inner, Duration::from_secs(ttl), max_entries))
            }
            "retry" => {
                let attempts = spec.u64_param("attempts")?.unwrap_or(retry::DEFAULT_ATTEMPTS as u64);
                let attempts = u32::try_from(attempts).map_err(|_| {
                    FsError::Configuration(format!("retry attempts out of range: {}", attempts))
                })?;
                let backoff = spec.u64_param("backoff_ms")?.unwrap_or(retry::DEFAULT_BACKOFF_MS);
                self.wrap(|inner| Retry::new(inner, attempts, Duration::from_millis(backoff)))
            }
            "size_limit" => {
                let max = spec.require_u64("max_object_bytes")?;
                self.wrap(|inner| SizeLimit::new(inner, max))
            }
            other => {
                return Err(FsError::Configuration(format!(
                    "unknown wrapper kind '{}' (expected one of: {})",
                    other,
                    WRAPPER_KINDS.join(", ")
                )));
            }
        };
        Ok(builder)
    }

    /// Validate the chain shape and freeze it.
    pub fn build(self) -> FsResult<Pipeline> {
        validate_chain(self.node.as_ref(), self.wrappers)?;
        Ok(Pipeline { client: Arc::from(self.node), wrappers: self.wrappers })
    }
}

/// Build the leaf client for a backend section.
pub fn build_backend(backend: &BackendConfig) -> FsResult<Box<dyn FilesystemClient>> {
    let store: Arc<dyn ObjectStore> = match backend.kind.as_str() {
        "memory" => Arc::new(MemoryObjectStore::new()),
        "local" => {
            let root = backend.root.as_ref().ok_or_else(|| {
                FsError::Configuration("backend 'local' requires 'root'".to_string())
            })?;
            Arc::new(LocalObjectStore::new(root.clone()))
        }
        other => {
            return Err(FsError::Configuration(format!(
                "unknown backend kind '{}' (expected one of: {})",
                other,
                BACKEND_KINDS.join(", ")
            )));
        }
    };

    let client = ObjectStoreClient::new(store)
        .with_prefix(backend.prefix.as_str())
        .with_overwrite_on_move(backend.allow_overwrite_on_move);
    Ok(Box::new(client))
}

/// Walk `inner_node()` from the outermost node: exactly `wrappers` nodes must
/// delegate inward before the chain ends at a leaf.
fn validate_chain(outermost: &dyn FilesystemClient, wrappers: usize) -> FsResult<()> {
    let mut node = outermost;
    let mut seen = 0;
    while let Some(inner) = node.inner_node() {
        seen += 1;
        if seen > wrappers {
            break;
        }
        node = inner;
    }

    if seen != wrappers {
        return Err(FsError::Configuration(format!(
            "pipeline has {} wrapping nodes, expected {}",
            seen, wrappers
        )));
    }
    Ok(())
}
