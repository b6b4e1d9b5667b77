use crate::fs::error::{FsError, FsResult};

const MAX_PATH_LENGTH: usize = 4096;
const MAX_FILENAME_LENGTH: usize = 255;

/// Normalize a mount path: absolute, no empty components, no trailing slash.
///
/// `.` components are dropped and `..` is rejected; object keys have no
/// notion of a parent link.
pub fn normalize_path(path: &str) -> FsResult<String> {
    if path.is_empty() {
        return Err(FsError::InvalidPath("Empty path".to_string()));
    }

    if path.contains('\0') {
        return Err(FsError::InvalidPath("Path contains NULL character".to_string()));
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(FsError::InvalidPath(format!(
            "Path too long: {} bytes (max {})",
            path.len(),
            MAX_PATH_LENGTH
        )));
    }

    if !path.starts_with('/') {
        return Err(FsError::InvalidPath(format!("Path must start with /: {}", path)));
    }

    let mut parts = Vec::new();
    for part in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if part == ".." {
            return Err(FsError::InvalidPath(format!("Parent components not allowed: {}", path)));
        }
        if part.len() > MAX_FILENAME_LENGTH {
            return Err(FsError::InvalidPath(format!(
                "Filename too long: {} bytes (max {})",
                part.len(),
                MAX_FILENAME_LENGTH
            )));
        }
        parts.push(part);
    }

    Ok(format!("/{}", parts.join("/")))
}

/// Parent of a normalized path. The root has no parent.
pub fn parent_path(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

/// All strict ancestors of a normalized path, nearest first, ending at `/`.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = parent_path(path);
    while let Some(p) = current {
        current = parent_path(&p);
        out.push(p);
    }
    out
}

/// Number of components of `path` below `base`, or `None` when `path` is not
/// inside `base`. Both must be normalized.
pub fn relative_depth(base: &str, path: &str) -> Option<usize> {
    if base == path {
        return Some(0);
    }
    let rest = if base == "/" {
        path.strip_prefix('/')?
    } else {
        path.strip_prefix(base)?.strip_prefix('/')?
    };
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').count())
}

/// Object key for a normalized path under an optional store prefix.
pub fn path_to_key(prefix: &str, path: &str) -> String {
    let relative = path.trim_start_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), relative)
    }
}

/// Directory marker key for a normalized path; the root maps to the prefix itself.
pub fn path_to_dir_key(prefix: &str, path: &str) -> String {
    let key = path_to_key(prefix, path);
    if key.is_empty() || key.ends_with('/') { key } else { format!("{}/", key) }
}

/// Inverse of [`path_to_key`]; trailing marker slashes are dropped.
pub fn key_to_path(prefix: &str, key: &str) -> Option<String> {
    let relative = if prefix.is_empty() {
        key
    } else {
        let stripped = key.strip_prefix(prefix.trim_end_matches('/'))?;
        if !stripped.is_empty() && !stripped.starts_with('/') {
            return None;
        }
        stripped.trim_start_matches('/')
    };
    let relative = relative.trim_end_matches('/');
    Some(format!("/{}", relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_root() {
        assert_eq!(normalize_path("/").unwrap(), "/");
    }

    #[test]
    fn test_normalize_path_trailing_slash() {
        assert_eq!(normalize_path("/data/").unwrap(), "/data");
    }

    #[test]
    fn test_normalize_path_multiple_slashes() {
        assert_eq!(normalize_path("//data//files//").unwrap(), "/data/files");
    }

    #[test]
    fn test_normalize_path_current_dir() {
        assert_eq!(normalize_path("/data/./files").unwrap(), "/data/files");
    }

    #[test]
    fn test_normalize_path_rejects_parent() {
        assert!(matches!(normalize_path("/data/../etc"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_normalize_path_empty() {
        assert!(normalize_path("").is_err());
    }

    #[test]
    fn test_normalize_path_no_leading_slash() {
        assert!(normalize_path("data").is_err());
    }

    #[test]
    fn test_normalize_path_long_filename() {
        let path = format!("/{}", "a".repeat(300));
        assert!(normalize_path(&path).is_err());
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/a"), Some("/".to_string()));
        assert_eq!(parent_path("/a/b/c"), Some("/a/b".to_string()));
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a/b", "/a", "/"]);
        assert!(ancestors("/").is_empty());
    }

    #[test]
    fn test_relative_depth() {
        assert_eq!(relative_depth("/", "/"), Some(0));
        assert_eq!(relative_depth("/", "/a"), Some(1));
        assert_eq!(relative_depth("/", "/a/b"), Some(2));
        assert_eq!(relative_depth("/a", "/a/b/c"), Some(2));
        assert_eq!(relative_depth("/a", "/ab/c"), None);
        assert_eq!(relative_depth("/a/b", "/a"), None);
    }

    #[test]
    fn test_key_mapping_without_prefix() {
        assert_eq!(path_to_key("", "/a/b.txt"), "a/b.txt");
        assert_eq!(path_to_dir_key("", "/a"), "a/");
        assert_eq!(path_to_dir_key("", "/"), "");
        assert_eq!(key_to_path("", "a/b.txt"), Some("/a/b.txt".to_string()));
        assert_eq!(key_to_path("", "a/"), Some("/a".to_string()));
    }

    #[test]
    fn test_key_mapping_with_prefix() {
        assert_eq!(path_to_key("mnt", "/a/b.txt"), "mnt/a/b.txt");
        assert_eq!(path_to_dir_key("mnt/", "/"), "mnt/");
        assert_eq!(key_to_path("mnt", "mnt/a/b.txt"), Some("/a/b.txt".to_string()));
        assert_eq!(key_to_path("mnt", "mnt/"), Some("/".to_string()));
        assert_eq!(key_to_path("mnt", "mntx/a"), None);
        assert_eq!(key_to_path("mnt", "other/a"), None);
    }
}
