use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::fs::{FsError, FsResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Defaults to an in-memory store when the section is absent.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Wrappers in build order: the first entry wraps the backend client.
    #[serde(default)]
    pub wrappers: Vec<WrapperSpec>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend selector: `memory` or `local`.
    pub kind: String,
    /// Store root directory, required by `local`.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Key prefix the mount is rooted at inside the store.
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub allow_overwrite_on_move: bool,
}

/// One wrapper entry. Parameters stay loosely typed until the pipeline is
/// assembled, where missing or mistyped values become configuration errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WrapperSpec {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl Config {
    /// Load `bucketfs.toml` from the working directory (if present), then
    /// apply `BUCKETFS__SECTION__KEY` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(config::File::with_name("bucketfs").required(false))
    }

    /// Like [`Config::load`] but reading an explicit file, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_with(config::File::from(path.as_ref()).required(true))
    }

    fn load_with<S>(file: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("BUCKETFS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            wrappers: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            root: None,
            prefix: String::new(),
            allow_overwrite_on_move: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "bucketfs=debug,info".to_string(), json: false }
    }
}

impl WrapperSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), params: BTreeMap::new() }
    }

    pub fn with_param(mut self, name: &str, value: serde_json::Value) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    fn missing(&self, name: &str) -> FsError {
        FsError::Configuration(format!("wrapper '{}' requires parameter '{}'", self.kind, name))
    }

    fn mistyped(&self, name: &str, expected: &str) -> FsError {
        FsError::Configuration(format!(
            "wrapper '{}' parameter '{}' must be {}",
            self.kind, name, expected
        ))
    }

    /// Non-negative integer parameter. Numeric strings are accepted so values
    /// can come from environment variables.
    pub fn u64_param(&self, name: &str) -> FsResult<Option<u64>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(serde_json::Value::Number(n)) => {
                n.as_u64().map(Some).ok_or_else(|| self.mistyped(name, "a non-negative integer"))
            }
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.mistyped(name, "a non-negative integer")),
            Some(_) => Err(self.mistyped(name, "a non-negative integer")),
        }
    }

    pub fn require_u64(&self, name: &str) -> FsResult<u64> {
        self.u64_param(name)?.ok_or_else(|| self.missing(name))
    }

    /// List of strings; a single comma-separated string is also accepted.
    pub fn require_string_list(&self, name: &str) -> FsResult<Vec<String>> {
        match self.params.get(name) {
            None => Err(self.missing(name)),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.mistyped(name, "a list of strings"))
                })
                .collect(),
            Some(serde_json::Value::String(s)) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()),
            Some(_) => Err(self.mistyped(name, "a list of strings")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.backend.kind, "memory");
        assert!(config.backend.root.is_none());
        assert!(config.backend.prefix.is_empty());
        assert!(!config.backend.allow_overwrite_on_move);
        assert!(config.wrappers.is_empty());
        assert_eq!(config.logging.filter, "bucketfs=debug,info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [backend]
            kind = "local"
            root = "/srv/bucket"
            prefix = "team-a"

            [[wrappers]]
            kind = "tier_filter"
            params = { excluded_tiers = ["ARCHIVE", "DEEP_ARCHIVE"] }

            [[wrappers]]
            kind = "cache"
            [wrappers.params]
            ttl_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.kind, "local");
        assert_eq!(config.backend.root, Some(PathBuf::from("/srv/bucket")));
        assert_eq!(config.backend.prefix, "team-a");
        assert_eq!(config.wrappers.len(), 2);
        assert_eq!(config.wrappers[0].kind, "tier_filter");
        assert_eq!(
            config.wrappers[0].require_string_list("excluded_tiers").unwrap(),
            vec!["ARCHIVE", "DEEP_ARCHIVE"]
        );
        assert_eq!(config.wrappers[1].u64_param("ttl_secs").unwrap(), Some(10));
        assert!(!config.logging.json);
    }

    #[test]
    fn test_config_without_backend_uses_memory() {
        for source in ["", "wrappers = []", "[logging]\nfilter = \"warn\"\njson = false\n"] {
            let config = Config::from_toml_str(source).unwrap();
            assert_eq!(config.backend.kind, "memory", "source: {:?}", source);
            assert!(config.backend.root.is_none());
            assert!(config.backend.prefix.is_empty());
        }
    }

    #[test]
    #[serial]
    fn test_load_without_file_or_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend.kind, "memory");
        assert!(config.wrappers.is_empty());
        assert_eq!(config.logging.filter, "bucketfs=debug,info");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config);
        assert!(json.is_ok());
    }

    #[test]
    fn test_u64_param_variants() {
        let spec = WrapperSpec::new("retry")
            .with_param("a", json!(3))
            .with_param("b", json!("42"))
            .with_param("c", json!(-1))
            .with_param("d", json!(true));
        assert_eq!(spec.u64_param("a").unwrap(), Some(3));
        assert_eq!(spec.u64_param("b").unwrap(), Some(42));
        assert!(matches!(spec.u64_param("c"), Err(FsError::Configuration(_))));
        assert!(matches!(spec.u64_param("d"), Err(FsError::Configuration(_))));
        assert_eq!(spec.u64_param("missing").unwrap(), None);
        assert!(matches!(spec.require_u64("missing"), Err(FsError::Configuration(_))));
    }

    #[test]
    fn test_string_list_from_comma_string() {
        let spec = WrapperSpec::new("tier_filter").with_param("tiers", json!("ARCHIVE, GLACIER,"));
        assert_eq!(spec.require_string_list("tiers").unwrap(), vec!["ARCHIVE", "GLACIER"]);

        let bad = WrapperSpec::new("tier_filter").with_param("tiers", json!([1, 2]));
        assert!(matches!(bad.require_string_list("tiers"), Err(FsError::Configuration(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mount.toml");
        std::fs::write(
            &path,
            "[backend]\nkind = \"memory\"\nprefix = \"p\"\n\n[logging]\nfilter = \"warn\"\njson = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend.prefix, "p");
        assert_eq!(config.logging.filter, "warn");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(Config::load_from("/nonexistent/bucketfs.toml").is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_environment() {
        // SAFETY: serialized with other environment-touching tests.
        unsafe {
            std::env::set_var("BUCKETFS__BACKEND__KIND", "local");
            std::env::set_var("BUCKETFS__BACKEND__ROOT", "/var/lib/bucketfs");
            std::env::set_var("BUCKETFS__BACKEND__ALLOW_OVERWRITE_ON_MOVE", "true");
        }

        let config = Config::load();

        unsafe {
            std::env::remove_var("BUCKETFS__BACKEND__KIND");
            std::env::remove_var("BUCKETFS__BACKEND__ROOT");
            std::env::remove_var("BUCKETFS__BACKEND__ALLOW_OVERWRITE_ON_MOVE");
        }

        let config = config.unwrap();
        assert_eq!(config.backend.kind, "local");
        assert_eq!(config.backend.root, Some(PathBuf::from("/var/lib/bucketfs")));
        assert!(config.backend.allow_overwrite_on_move);
        assert!(config.wrappers.is_empty());
    }
}
