//! Key and path translation
//!
//! Object keys always use `/` as their separator. Local paths use whatever the
//! platform uses. This module is the only place where one is turned into the
//! other.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Canonical separator inside object keys
pub const KEY_SEPARATOR: char = '/';

/// A validated object key: never empty and never containing a backslash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a key
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidKey("key cannot be empty".into()));
        }
        if key.contains('\\') {
            return Err(Error::InvalidKey(format!(
                "'{key}' contains a backslash separator"
            )));
        }
        Ok(Self(key))
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where objects live in the bucket and which local files take part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixFilter {
    /// Bucket-side directory every key starts with (may be empty)
    pub storage_prefix: String,

    /// Only local files whose file name starts with this
    pub filename_prefix: Option<String>,
}

impl PrefixFilter {
    pub fn new(storage_prefix: impl Into<String>) -> Self {
        Self {
            storage_prefix: storage_prefix.into(),
            filename_prefix: None,
        }
    }

    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.filename_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Whether a file's own name (not its relative path) passes the filter
    pub fn matches_file_name(&self, file_name: &str) -> bool {
        self.filename_prefix
            .as_deref()
            .is_none_or(|prefix| file_name.starts_with(prefix))
    }
}

/// Join a storage prefix and a key prefix with the canonical separator.
///
/// An empty storage prefix leaves `prefix` untouched, so an empty pair yields
/// an empty (bucket-wide) prefix.
pub fn join_prefix(storage_prefix: &str, prefix: &str) -> String {
    let base = storage_prefix.trim_end_matches(KEY_SEPARATOR);
    if base.is_empty() {
        prefix.to_string()
    } else {
        format!("{base}{KEY_SEPARATOR}{prefix}")
    }
}

/// Build the destination key for a file below the upload root.
///
/// `relative` must be relative to the root; each of its components becomes
/// one key segment regardless of the native separator.
pub fn to_key(relative: &Path, storage_prefix: &str) -> Result<ObjectKey> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::InvalidPath(format!("{} is not valid UTF-8", relative.display()))
                })?;
                segments.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidPath(format!(
                    "{} is not a path inside the upload root",
                    relative.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} does not name a file",
            relative.display()
        )));
    }

    let relative_key = segments.join("/");
    ObjectKey::new(join_prefix(storage_prefix, &relative_key))
}

/// Resolve where an object should be written below `local_dir`.
///
/// Exactly one leading segment is stripped from the key, so
/// `team/backup/a.txt` lands at `local_dir/backup/a.txt`. A key without any
/// separator is used as-is. Every remaining segment must be a plain name; `..`
/// and anything that would be read as a root, drive or second separator is
/// rejected with [`Error::PathTraversal`].
pub fn to_local_path(key: &str, local_dir: &Path) -> Result<PathBuf> {
    let remainder = strip_leading_segment(key);

    let mut path = local_dir.to_path_buf();
    let mut pushed = 0;
    for segment in remainder.split(KEY_SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => return Err(Error::PathTraversal(key.to_string())),
            _ if !is_plain_name(segment) => return Err(Error::PathTraversal(key.to_string())),
            _ => {
                path.push(segment);
                pushed += 1;
            }
        }
    }

    if pushed == 0 {
        return Err(Error::InvalidKey(format!(
            "'{key}' does not name an object below its prefix"
        )));
    }

    if !path.starts_with(local_dir) {
        return Err(Error::PathTraversal(key.to_string()));
    }

    Ok(path)
}

fn strip_leading_segment(key: &str) -> &str {
    match key.split_once(KEY_SEPARATOR) {
        Some((_, rest)) => rest,
        None => key,
    }
}

/// A segment that maps to exactly one ordinary path component on every platform
fn is_plain_name(segment: &str) -> bool {
    if segment.contains('\\') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_validation() {
        assert!(ObjectKey::new("backup/a.txt").is_ok());
        assert!(matches!(ObjectKey::new(""), Err(Error::InvalidKey(_))));
        assert!(matches!(
            ObjectKey::new("backup\\a.txt"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_filename_filter_checks_name_only() {
        let filter = PrefixFilter::new("backup").with_filename_prefix("ops-");
        assert!(filter.matches_file_name("ops-2024.log"));
        assert!(!filter.matches_file_name("nightly-ops-2024.log"));

        let open = PrefixFilter::new("backup").with_filename_prefix("");
        assert!(open.filename_prefix.is_none());
        assert!(open.matches_file_name("anything"));
    }

    #[test]
    fn test_join_prefix() {
        assert_eq!(join_prefix("backup", "logs-"), "backup/logs-");
        assert_eq!(join_prefix("backup/", "logs-"), "backup/logs-");
        assert_eq!(join_prefix("backup", ""), "backup/");
        assert_eq!(join_prefix("", "logs-"), "logs-");
        assert_eq!(join_prefix("", ""), "");
    }

    #[test]
    fn test_to_key_uses_forward_slashes() {
        let relative: PathBuf = ["nested", "deeper", "file.log"].iter().collect();
        let key = to_key(&relative, "backup").unwrap();
        assert_eq!(key.as_str(), "backup/nested/deeper/file.log");
    }

    #[test]
    fn test_to_key_without_storage_prefix() {
        let key = to_key(Path::new("file.log"), "").unwrap();
        assert_eq!(key.as_str(), "file.log");
    }

    #[test]
    fn test_to_key_rejects_escaping_paths() {
        assert!(to_key(Path::new("../file.log"), "backup").is_err());
        assert!(to_key(Path::new("/etc/passwd"), "backup").is_err());
        assert!(to_key(Path::new(""), "backup").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_to_key_rejects_backslash_in_file_name() {
        let result = to_key(Path::new("odd\\name.txt"), "backup");
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_to_local_path_strips_first_segment() {
        let dir = Path::new("/tmp/target");
        let path = to_local_path("backup/a/b.txt", dir).unwrap();
        assert_eq!(path, dir.join("a").join("b.txt"));
    }

    #[test]
    fn test_to_local_path_strips_one_segment_of_nested_prefix() {
        let dir = Path::new("/tmp/target");
        let path = to_local_path("team/backup/a.txt", dir).unwrap();
        assert_eq!(path, dir.join("backup").join("a.txt"));
    }

    #[test]
    fn test_to_local_path_ignores_first_segment_name() {
        let dir = Path::new("/tmp/target");
        let path = to_local_path("other/a/b.txt", dir).unwrap();
        assert_eq!(path, dir.join("a").join("b.txt"));
    }

    #[test]
    fn test_to_local_path_single_segment_key() {
        let dir = Path::new("/tmp/target");
        let path = to_local_path("file.txt", dir).unwrap();
        assert_eq!(path, dir.join("file.txt"));
    }

    #[test]
    fn test_to_local_path_skips_empty_segments() {
        let dir = Path::new("/tmp/target");
        let path = to_local_path("backup//etc/passwd", dir).unwrap();
        assert_eq!(path, dir.join("etc").join("passwd"));
    }

    #[test]
    fn test_to_local_path_rejects_parent_segments() {
        let dir = Path::new("/tmp/target");
        for key in [
            "backup/../../etc/passwd",
            "backup/a/../../b",
            "backup/..",
        ] {
            let result = to_local_path(key, dir);
            assert!(
                matches!(result, Err(Error::PathTraversal(_))),
                "{key} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_to_local_path_rejects_backslash_segments() {
        let dir = Path::new("/tmp/target");
        let result = to_local_path("backup/..\\..\\escape", dir);
        assert!(matches!(result, Err(Error::PathTraversal(_))));
    }

    #[test]
    fn test_to_local_path_rejects_directory_markers() {
        let dir = Path::new("/tmp/target");
        let result = to_local_path("backup/", dir);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }
}
