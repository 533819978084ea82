//! Modification-time file cache
//!
//! Remembers a value per source file together with the file's modification time
//! so later runs can tell whether the file changed. The cache is persisted as
//! JSON at the configured cache file.

use crate::error::{CompilerError, CompilerResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Cached state of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCacheEntry {
    /// Modification time, seconds since the Unix epoch
    pub modified_secs: u64,
    /// Sub-second part of the modification time
    pub modified_nanos: u32,
    /// Value stored alongside the timestamp
    pub value: Value,
}

/// JSON-persisted map of path to (modification time, value)
#[derive(Debug)]
pub struct FileCache {
    location: PathBuf,
    entries: BTreeMap<PathBuf, FileCacheEntry>,
    dirty: bool,
}

impl FileCache {
    /// Open the cache stored at `location`, starting empty if the file is absent
    pub fn open(location: impl Into<PathBuf>) -> CompilerResult<Self> {
        let location = location.into();
        let entries = if location.is_file() {
            let content =
                fs::read_to_string(&location).map_err(|e| CompilerError::io(&location, e))?;
            serde_json::from_str(&content).map_err(|e| {
                CompilerError::CacheError(format!("{}: {}", location.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            location,
            entries,
            dirty: false,
        })
    }

    /// Create an empty cache that will be written to `location` on save
    pub fn empty(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether the file changed since it was stored (unknown files count as modified)
    pub fn is_modified(&self, path: &Path) -> bool {
        let Some(entry) = self.entries.get(path) else {
            return true;
        };
        match Self::read_mtime(path) {
            Ok((secs, nanos)) => secs != entry.modified_secs || nanos != entry.modified_nanos,
            Err(_) => true,
        }
    }

    /// Store a value for a file, capturing its current modification time
    pub fn store(&mut self, path: &Path, value: impl Into<Value>) -> CompilerResult<()> {
        let (modified_secs, modified_nanos) =
            Self::read_mtime(path).map_err(|e| CompilerError::io(path, e))?;
        self.entries.insert(
            path.to_path_buf(),
            FileCacheEntry {
                modified_secs,
                modified_nanos,
                value: value.into(),
            },
        );
        self.dirty = true;
        Ok(())
    }

    /// Value stored for a file, regardless of whether it changed since
    pub fn fetch(&self, path: &Path) -> Option<&Value> {
        self.entries.get(path).map(|entry| &entry.value)
    }

    /// Forget a file
    pub fn remove(&mut self, path: &Path) -> Option<FileCacheEntry> {
        let removed = self.entries.remove(path);
        self.dirty |= removed.is_some();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the cache to its location if anything changed
    pub fn save(&mut self) -> CompilerResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.location.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CompilerError::io(parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CompilerError::CacheError(e.to_string()))?;
        fs::write(&self.location, content).map_err(|e| CompilerError::io(&self.location, e))?;
        self.dirty = false;
        Ok(())
    }

    fn read_mtime(path: &Path) -> std::io::Result<(u64, u32)> {
        let modified = fs::metadata(path)?.modified()?;
        // pre-epoch timestamps collapse to zero
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok((since_epoch.as_secs(), since_epoch.subsec_nanos()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_unknown_file_is_modified() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "content").unwrap();

        let cache = FileCache::empty(temp_dir.path().join("cache.json"));
        assert!(cache.is_modified(&file_path));
    }

    #[test]
    fn test_store_then_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "content").unwrap();

        let mut cache = FileCache::empty(temp_dir.path().join("cache.json"));
        cache.store(&file_path, json!({"classes": 3})).unwrap();

        assert!(!cache.is_modified(&file_path));
        assert_eq!(cache.fetch(&file_path), Some(&json!({"classes": 3})));
    }

    #[test]
    fn test_detect_modified_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "original").unwrap();

        let mut cache = FileCache::empty(temp_dir.path().join("cache.json"));
        cache.store(&file_path, 1).unwrap();

        thread::sleep(Duration::from_millis(20));
        fs::write(&file_path, "modified").unwrap();
        let file = fs::File::options().write(true).open(&file_path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();

        assert!(cache.is_modified(&file_path));
    }

    #[test]
    fn test_removed_file_is_modified() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "content").unwrap();

        let mut cache = FileCache::empty(temp_dir.path().join("cache.json"));
        cache.store(&file_path, 1).unwrap();
        fs::remove_file(&file_path).unwrap();

        assert!(cache.is_modified(&file_path));
    }

    #[test]
    fn test_save_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");
        fs::write(&file_path, "content").unwrap();
        let location = temp_dir.path().join("data").join("cache.json");

        let mut cache = FileCache::empty(&location);
        cache.store(&file_path, "value").unwrap();
        cache.save().unwrap();

        let reopened = FileCache::open(&location).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.fetch(&file_path), Some(&json!("value")));
        assert!(!reopened.is_modified(&file_path));
    }

    #[test]
    fn test_open_corrupt_cache() {
        let temp_dir = TempDir::new().unwrap();
        let location = temp_dir.path().join("cache.json");
        fs::write(&location, "{ not json").unwrap();

        assert!(matches!(
            FileCache::open(&location),
            Err(CompilerError::CacheError(_))
        ));
    }
}
