//! Compiler Configuration (`[compiler]` table)
//!
//! Every key has a built-in default so an empty table (or no table at all)
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every compiler of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CompilerConfiguration {
    /// File used by the persistent file cache, relative to the project root
    pub cache_file: PathBuf,

    /// Additional source directories forming the "sources" bank
    pub source_dirs: Vec<PathBuf>,

    /// Development context (`--dev`)
    pub debug: bool,

    /// Test context (`--test`)
    pub test: bool,

    /// Store absolute, canonical file references instead of project relative ones
    pub zero_links: bool,

    /// Application data directory name below the project root
    pub app_data_dir: PathBuf,

    /// Public data directory name below the project root
    pub public_data_dir: PathBuf,

    /// Sub-directory names of the application data directory
    pub directories: DirectoryNames,
}

impl Default for CompilerConfiguration {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("compiler-cache.json"),
            source_dirs: Vec::new(),
            debug: false,
            test: false,
            zero_links: false,
            app_data_dir: PathBuf::from("SkylineAppData"),
            public_data_dir: PathBuf::from("public_html"),
            directories: DirectoryNames::default(),
        }
    }
}

impl CompilerConfiguration {
    /// Name of an application data sub-directory
    pub fn directory_name(&self, dir: AppDirectory) -> &Path {
        self.directories.get(dir)
    }
}

/// Well-known sub-directories of the application data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppDirectory {
    Compiled,
    Modules,
    Cache,
    Classes,
    Config,
    Templates,
    Controllers,
    UserInterface,
    Logs,
}

impl AppDirectory {
    /// Directories created by a fresh pipeline run
    pub fn skeleton() -> [AppDirectory; 5] {
        [
            Self::Classes,
            Self::Compiled,
            Self::Config,
            Self::Modules,
            Self::Logs,
        ]
    }
}

/// Configurable names for [`AppDirectory`] entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct DirectoryNames {
    pub compiled: PathBuf,
    pub modules: PathBuf,
    pub cache: PathBuf,
    pub classes: PathBuf,
    pub config: PathBuf,
    pub templates: PathBuf,
    pub controllers: PathBuf,
    pub ui: PathBuf,
    pub logs: PathBuf,
}

impl Default for DirectoryNames {
    fn default() -> Self {
        Self {
            compiled: PathBuf::from("Compiled"),
            modules: PathBuf::from("Modules"),
            cache: PathBuf::from("Cache"),
            classes: PathBuf::from("Classes"),
            config: PathBuf::from("Config"),
            templates: PathBuf::from("Templates"),
            controllers: PathBuf::from("Classes/Controller"),
            ui: PathBuf::from("UI"),
            logs: PathBuf::from("Logs"),
        }
    }
}

impl DirectoryNames {
    pub fn get(&self, dir: AppDirectory) -> &Path {
        match dir {
            AppDirectory::Compiled => &self.compiled,
            AppDirectory::Modules => &self.modules,
            AppDirectory::Cache => &self.cache,
            AppDirectory::Classes => &self.classes,
            AppDirectory::Config => &self.config,
            AppDirectory::Templates => &self.templates,
            AppDirectory::Controllers => &self.controllers,
            AppDirectory::UserInterface => &self.ui,
            AppDirectory::Logs => &self.logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfiguration::default();
        assert_eq!(config.app_data_dir, PathBuf::from("SkylineAppData"));
        assert_eq!(config.public_data_dir, PathBuf::from("public_html"));
        assert!(!config.debug);
        assert!(!config.test);
        assert!(!config.zero_links);
        assert_eq!(
            config.directory_name(AppDirectory::Controllers),
            Path::new("Classes/Controller")
        );
    }

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: CompilerConfiguration = toml::from_str("").unwrap();
        assert_eq!(config, CompilerConfiguration::default());
    }

    #[test]
    fn test_partial_override() {
        let config: CompilerConfiguration = toml::from_str(
            r#"
debug = true
app-data-dir = "AppData"

[directories]
logs = "var/log"
"#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.app_data_dir, PathBuf::from("AppData"));
        assert_eq!(config.directory_name(AppDirectory::Logs), Path::new("var/log"));
        assert_eq!(
            config.directory_name(AppDirectory::Compiled),
            Path::new("Compiled")
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<CompilerConfiguration, _> = toml::from_str("optimize = true");
        assert!(result.is_err());
    }
}
