//! Composer package precedence shared through the value cache

use crate::cache::ValueCache;
use crate::error::{CompilerError, CompilerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root-domain cache name of the ordered composer packages
pub const CACHE_PACKAGES_NAME: &str = "composer-packages";

/// A composer package and the directory holding its composer.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerPackage {
    pub name: String,
    pub path: PathBuf,
}

/// Ordered packages, dependencies first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOrder {
    packages: Vec<ComposerPackage>,
}

impl PackageOrder {
    pub fn new(packages: Vec<ComposerPackage>) -> Self {
        Self { packages }
    }

    /// Read the order published under [`CACHE_PACKAGES_NAME`], if any
    pub fn from_cache(cache: &ValueCache) -> Option<Self> {
        let value = cache.fetch_value(CACHE_PACKAGES_NAME, "")?;
        match serde_json::from_value::<Vec<ComposerPackage>>(value.clone()) {
            Ok(packages) => Some(Self::new(packages)),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed package order");
                None
            }
        }
    }

    /// Publish the order under [`CACHE_PACKAGES_NAME`]
    pub fn post(&self, cache: &mut ValueCache) -> CompilerResult<()> {
        let value = serde_json::to_value(&self.packages)
            .map_err(|e| CompilerError::CacheError(format!("Cannot publish package order: {}", e)))?;
        cache.post_value(value, CACHE_PACKAGES_NAME, "");
        Ok(())
    }

    pub fn packages(&self) -> &[ComposerPackage] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Position of a package by name
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.name == name)
    }

    /// Position of the package owning `path` (longest matching package directory)
    pub fn index_of_path(&self, path: &Path) -> Option<usize> {
        self.packages
            .iter()
            .enumerate()
            .filter(|(_, p)| path.starts_with(&p.path))
            .max_by_key(|(_, p)| p.path.components().count())
            .map(|(idx, _)| idx)
    }

    /// Sort key placing unattributable paths last
    pub fn rank(&self, path: &Path) -> usize {
        self.index_of_path(path).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(name: &str, path: &str) -> ComposerPackage {
        ComposerPackage {
            name: name.to_string(),
            path: PathBuf::from(path),
        }
    }

    #[test]
    fn test_longest_directory_wins() {
        let order = PackageOrder::new(vec![
            package("app/root", "/srv/app"),
            package("vendor/lib", "/srv/app/vendor/lib"),
        ]);

        assert_eq!(order.index_of_path(Path::new("/srv/app/vendor/lib/src/a.php")), Some(1));
        assert_eq!(order.index_of_path(Path::new("/srv/app/src/b.php")), Some(0));
        assert_eq!(order.rank(Path::new("/elsewhere/c.php")), usize::MAX);
    }

    #[test]
    fn test_cache_round_trip() {
        let order = PackageOrder::new(vec![package("a/a", "/a"), package("b/b", "/b")]);
        let mut cache = ValueCache::new();
        order.post(&mut cache).unwrap();

        assert_eq!(PackageOrder::from_cache(&cache), Some(order));
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_malformed_cache_entry_ignored() {
        let mut cache = ValueCache::new();
        cache.post_value("not a list", CACHE_PACKAGES_NAME, "");
        assert_eq!(PackageOrder::from_cache(&cache), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unpublishable_order_is_an_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let order = PackageOrder::new(vec![ComposerPackage {
            name: "bad/path".to_string(),
            path: PathBuf::from(OsStr::from_bytes(b"/srv/\xff")),
        }]);
        let mut cache = ValueCache::new();

        assert!(matches!(order.post(&mut cache), Err(CompilerError::CacheError(_))));
        assert_eq!(cache.count(), 0);
    }
}
