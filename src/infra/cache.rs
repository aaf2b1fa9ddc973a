//! File-backed key/value cache
//!
//! Memoizes geocoding results, street networks, feature queries and ocean
//! clips. Each key maps to one JSON file in the cache directory. There is no
//! eviction and no invalidation beyond the caller-side refresh flag.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CacheError;
use crate::infra::dirs::PosterDirs;

/// Extension used for cache entries
const ENTRY_EXTENSION: &str = "json";

/// Keys longer than this are truncated and suffixed with a digest
const MAX_KEY_LEN: usize = 120;

/// Cache information
#[derive(Debug)]
pub struct CacheInfo {
    /// Cache directory path
    pub path: PathBuf,
    /// Total size in bytes
    pub size_bytes: u64,
    /// Number of cached items
    pub item_count: usize,
    /// Whether cache exists
    pub exists: bool,
}

impl CacheInfo {
    /// Format size for display
    pub fn format_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count for display
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        "0 bytes".to_string()
    } else if size_bytes < 1024 {
        format!("{size_bytes} bytes")
    } else if size_bytes < 1024 * 1024 {
        format!("{:.1} KB", size_bytes as f64 / 1024.0)
    } else if size_bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", size_bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Key/value store of serialized values, one file per key
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `dir` (created lazily on first write)
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Create a cache in the platform cache directory
    pub fn from_dirs(dirs: &PosterDirs) -> Self {
        Self::new(dirs.cache_dir())
    }

    /// Get the cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", sanitize_key(key)))
    }

    /// Whether an entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Retrieve a cached value
    ///
    /// Returns `Ok(None)` when nothing is stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }

        let bytes = fs::read(&path).map_err(|e| CacheError::Read {
            key: key.to_string(),
            error: e.to_string(),
        })?;

        let value = serde_json::from_slice(&bytes).map_err(|e| CacheError::Read {
            key: key.to_string(),
            error: e.to_string(),
        })?;

        tracing::debug!("Cache hit: {key}");
        Ok(Some(value))
    }

    /// Store a value, replacing any previous entry
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let write_err = |e: &dyn std::fmt::Display| CacheError::Write {
            key: key.to_string(),
            error: e.to_string(),
        };

        fs::create_dir_all(&self.dir).map_err(|e| write_err(&e))?;

        let bytes = serde_json::to_vec(value).map_err(|e| write_err(&e))?;
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{ENTRY_EXTENSION}.tmp"));

        let mut file = fs::File::create(&tmp).map_err(|e| write_err(&e))?;
        file.write_all(&bytes).map_err(|e| write_err(&e))?;
        file.sync_all().map_err(|e| write_err(&e))?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| write_err(&e))?;

        tracing::debug!("Cache store: {key} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Remove the entry for `key`, returning whether one existed
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| CacheError::Write {
            key: key.to_string(),
            error: e.to_string(),
        })?;
        Ok(true)
    }

    /// Get cache information
    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            path: self.dir.clone(),
            size_bytes: calculate_dir_size(&self.dir),
            item_count: count_items(&self.dir),
            exists: self.dir.exists(),
        }
    }

    /// Remove every entry, returning the number of bytes freed
    pub fn clean(&self) -> Result<u64, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let size_before = calculate_dir_size(&self.dir);

        fs::remove_dir_all(&self.dir).map_err(|e| CacheError::Clean {
            path: self.dir.clone(),
            error: e.to_string(),
        })?;

        Ok(size_before)
    }
}

/// Turn a cache key into a safe file stem
fn sanitize_key(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if safe == key && safe.len() <= MAX_KEY_LEN {
        return safe;
    }

    // Altered or truncated stems are no longer unique on their own
    let digest = Sha256::digest(key.as_bytes());
    let stem = &safe[..safe.len().min(MAX_KEY_LEN)];
    format!("{}_{}", stem, hex::encode(&digest[..8]))
}

/// Calculate directory size recursively
fn calculate_dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Count cache entries
fn count_items(path: &Path) -> usize {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == ENTRY_EXTENSION)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn temp_cache() -> (TempDir, FileCache) {
        let temp = TempDir::new().unwrap();
        let cache = FileCache::new(temp.path().join("cache"));
        (temp, cache)
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (_temp, cache) = temp_cache();
        let value: Option<(f64, f64)> = cache.get("coords_paris_france").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_set_then_get_returns_stored_value() {
        let (_temp, cache) = temp_cache();
        cache.set("coords_paris_france", &(48.8566, 2.3522)).unwrap();

        let value: Option<(f64, f64)> = cache.get("coords_paris_france").unwrap();
        assert_eq!(value, Some((48.8566, 2.3522)));
    }

    #[test]
    fn test_set_overwrites_previous_value() {
        let (_temp, cache) = temp_cache();
        cache.set("k", &1u32).unwrap();
        cache.set("k", &2u32).unwrap();
        assert_eq!(cache.get::<u32>("k").unwrap(), Some(2));
    }

    #[test]
    fn test_corrupt_entry_is_read_error() {
        let (_temp, cache) = temp_cache();
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.path_for("broken"), b"not json").unwrap();

        let result = cache.get::<u32>("broken");
        assert!(matches!(result, Err(CacheError::Read { .. })));
    }

    #[test]
    fn test_key_with_separator_stays_in_cache_dir() {
        let (_temp, cache) = temp_cache();
        let path = cache.path_for("graph_../../etc/passwd");
        assert_eq!(path.parent().unwrap(), cache.dir());
        assert!(!path.to_string_lossy().contains("/etc/"));
    }

    #[test]
    fn test_long_keys_do_not_collide() {
        let (_temp, cache) = temp_cache();
        let prefix = "x".repeat(200);
        let a = cache.path_for(&format!("{prefix}_a"));
        let b = cache.path_for(&format!("{prefix}_b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_ascii_keys_do_not_share_an_entry() {
        let (_temp, cache) = temp_cache();
        cache.set("coords_東京_日本", &(35.68, 139.69)).unwrap();

        let beijing: Option<(f64, f64)> = cache.get("coords_北京_中国").unwrap();
        assert!(beijing.is_none());
        assert_ne!(
            cache.path_for("coords_東京_日本"),
            cache.path_for("coords_北京_中国")
        );

        let tokyo: Option<(f64, f64)> = cache.get("coords_東京_日本").unwrap();
        assert_eq!(tokyo, Some((35.68, 139.69)));
    }

    #[test]
    fn test_replaced_characters_do_not_collide() {
        let (_temp, cache) = temp_cache();
        assert_ne!(
            cache.path_for("coords_new york_usa"),
            cache.path_for("coords_new_york_usa")
        );
    }

    #[test]
    fn test_plain_keys_keep_readable_file_name() {
        let (_temp, cache) = temp_cache();
        assert_eq!(
            cache.path_for("coords_paris_france"),
            cache.dir().join("coords_paris_france.json")
        );
    }

    #[test]
    fn test_remove_entry() {
        let (_temp, cache) = temp_cache();
        cache.set("gone", &"value").unwrap();
        assert!(cache.contains("gone"));
        assert!(cache.remove("gone").unwrap());
        assert!(!cache.contains("gone"));
        assert!(!cache.remove("gone").unwrap());
    }

    #[test]
    fn test_info_and_clean() {
        let (_temp, cache) = temp_cache();
        let info = cache.info();
        assert!(!info.exists);
        assert_eq!(info.item_count, 0);

        cache.set("a", &vec![1, 2, 3]).unwrap();
        cache.set("b", &"hello").unwrap();
        let info = cache.info();
        assert!(info.exists);
        assert_eq!(info.item_count, 2);
        assert!(info.size_bytes > 0);

        let freed = cache.clean().unwrap();
        assert_eq!(freed, info.size_bytes);
        assert!(!cache.dir().exists());
        assert_eq!(cache.clean().unwrap(), 0);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(512), "512 bytes");
        assert!(format_size(1024 * 100).contains("KB"));
        assert!(format_size(1024 * 1024 * 50).contains("MB"));
        assert!(format_size(1024 * 1024 * 1024 * 2).contains("GB"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_sanitized_key_is_single_safe_component(key in ".{0,300}") {
            let stem = sanitize_key(&key);
            prop_assert!(stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
            prop_assert!(stem.len() <= MAX_KEY_LEN + 17);
        }

        #[test]
        fn prop_distinct_keys_map_to_distinct_stems(a in ".{0,40}", b in ".{0,40}") {
            prop_assume!(a != b);
            prop_assert_ne!(sanitize_key(&a), sanitize_key(&b));
        }
    }
}
