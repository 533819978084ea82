//! Skyline Configuration System
//!
//! Provides configuration management for the Skyline compiler pipeline:
//! - Compiler settings (`[compiler]` in skyline.toml) with built-in defaults
//! - The project descriptor (`[project]`): root, public directory, search paths, attributes
//! - Configuration-declared compilers (`[[compilers]]`)
//!
//! # Configuration Hierarchy
//!
//! Settings are resolved in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project manifest (./skyline.toml, searched upward)
//! 3. Environment variables (SKYLINE_*)
//! 4. CLI flags (handled by caller)
//!
//! # Example
//!
//! ```no_run
//! use skyline_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod compiler;
pub mod loader;
pub mod manifest;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Project root directory does not exist: {0}")]
    MissingProjectRoot(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use compiler::{AppDirectory, CompilerConfiguration, DirectoryNames};
pub use loader::{Config, ConfigLoader, MANIFEST_FILE_NAME};
pub use manifest::{CompilerDescription, Manifest, ProjectSection};
pub use project::{AttributeValue, Project, SearchPaths};
