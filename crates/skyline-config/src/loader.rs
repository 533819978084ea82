//! Configuration Loader
//!
//! Locates skyline.toml and applies environment overrides:
//! 1. Built-in defaults - lowest priority
//! 2. Project manifest (./skyline.toml) - overrides defaults
//! 3. Environment variables (SKYLINE_*) - overrides the manifest
//! 4. CLI flags - highest priority (handled by caller)

use crate::compiler::CompilerConfiguration;
use crate::manifest::{CompilerDescription, Manifest};
use crate::project::Project;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// File name of the project manifest
pub const MANIFEST_FILE_NAME: &str = "skyline.toml";

/// Configuration loader
pub struct ConfigLoader {
    /// Apply SKYLINE_* environment overrides
    apply_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Effective compiler settings (manifest + environment)
    pub compiler: CompilerConfiguration,

    /// Project described by the manifest
    pub project: Option<Project>,

    /// Configuration-declared compilers
    pub compilers: Vec<CompilerDescription>,

    /// Directory containing skyline.toml
    pub manifest_dir: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { apply_env: true }
    }

    /// Ignore SKYLINE_* environment variables
    pub fn without_env(mut self) -> Self {
        self.apply_env = false;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find skyline.toml. Without a manifest the
    /// defaults are returned and no project is set.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        match Self::find_manifest(start_dir) {
            Some(path) => self.load_from_file(&path),
            None => Ok(Config {
                compiler: self.apply_env_overrides(CompilerConfiguration::default()),
                project: None,
                compilers: Vec::new(),
                manifest_dir: None,
            }),
        }
    }

    /// Load configuration from a specific manifest file
    pub fn load_from_file(&self, manifest_path: &Path) -> ConfigResult<Config> {
        let manifest = Manifest::load_from_file(manifest_path)?;
        let manifest_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let project = Project::from_section(&manifest.project, &manifest_dir);
        if !project.root_directory().is_dir() {
            return Err(ConfigError::MissingProjectRoot(
                project.root_directory().to_path_buf(),
            ));
        }

        Ok(Config {
            compiler: self.apply_env_overrides(manifest.compiler),
            project: Some(project),
            compilers: manifest.compilers,
            manifest_dir: Some(manifest_dir),
        })
    }

    /// Find skyline.toml by walking up the directory tree
    fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let candidate = dir.join(MANIFEST_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }
        None
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: SKYLINE_DEBUG, SKYLINE_TEST, SKYLINE_ZERO_LINKS
    fn apply_env_overrides(&self, mut config: CompilerConfiguration) -> CompilerConfiguration {
        if !self.apply_env {
            return config;
        }
        if let Some(debug) = env_flag("SKYLINE_DEBUG") {
            config.debug = debug;
        }
        if let Some(test) = env_flag("SKYLINE_TEST") {
            config.test = test;
        }
        if let Some(zero) = env_flag("SKYLINE_ZERO_LINKS") {
            config.zero_links = zero;
        }
        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "true" | "1" | "yes"))
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project.as_ref().map(Project::root_directory)
    }

    /// Check if a skyline.toml was found
    pub fn is_project(&self) -> bool {
        self.manifest_dir.is_some()
    }
}
