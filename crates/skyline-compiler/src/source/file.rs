//! Discovered source file

use crate::error::{CompilerError, CompilerResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A path captured during discovery
///
/// Equality and hashing use the key, which is either the literal path or the
/// canonical real path depending on how the file was discovered.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    key: String,
    is_file: bool,
}

impl SourceFile {
    /// Capture an existing path, keyed by its literal form
    pub fn new(path: impl Into<PathBuf>) -> CompilerResult<Self> {
        Self::with_real_paths(path, false)
    }

    /// Capture an existing path, keyed by its real path when `use_real_paths` is set
    pub fn with_real_paths(path: impl Into<PathBuf>, use_real_paths: bool) -> CompilerResult<Self> {
        let path = path.into();
        let metadata = path
            .metadata()
            .map_err(|_| CompilerError::not_found(&path))?;

        let key = if use_real_paths {
            path.canonicalize()
                .map_err(|e| CompilerError::io(&path, e))?
                .to_string_lossy()
                .into_owned()
        } else {
            path.to_string_lossy().into_owned()
        };

        Ok(Self {
            path,
            key,
            is_file: metadata.is_file(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stringified path used as map key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// Base name of the path
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for SourceFile {}

impl Hash for SourceFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl AsRef<Path> for SourceFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
