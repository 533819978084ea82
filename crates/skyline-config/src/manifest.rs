//! Project Manifest (skyline.toml)
//!
//! The manifest groups the project descriptor, the compiler settings and any
//! configuration-declared compilers in one file at the project root.

use crate::compiler::CompilerConfiguration;
use crate::project::AttributeValue;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Parsed skyline.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project descriptor
    #[serde(default)]
    pub project: ProjectSection,

    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerConfiguration,

    /// Additional compilers declared by the project
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compilers: Vec<CompilerDescription>,
}

/// `[project]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Project root, relative to the manifest directory
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Public (web) directory, relative to the project root
    #[serde(default = "default_public")]
    pub public: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Named search path lists (vendor, classes, modules, config, ...)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub search_paths: BTreeMap<String, Vec<PathBuf>>,

    /// Free-form project attributes
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,

    /// Initial compiler context parameters
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_public() -> PathBuf {
    PathBuf::from("public")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            public: default_public(),
            title: None,
            description: None,
            search_paths: BTreeMap::new(),
            attributes: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }
}

/// A compiler declared by name, instantiated through a compiler registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompilerDescription {
    /// Unique compiler id
    pub id: String,

    /// Registered compiler kind, e.g. "directory-protection"
    pub kind: String,

    /// Ids of compilers that must run first
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Kind specific constructor arguments
    #[serde(default)]
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub arguments: serde_json::Value,
}

impl CompilerDescription {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            dependencies: Vec::new(),
            arguments: serde_json::Value::Null,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_arguments(mut self, arguments: serde_json::Value) -> Self {
        self.arguments = arguments;
        self
    }
}

impl Manifest {
    /// Load manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let manifest: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        if self.compiler.app_data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compiler.app-data-dir".to_string(),
                reason: "directory name cannot be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for description in &self.compilers {
            if description.id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "compilers.id".to_string(),
                    reason: "id cannot be empty".to_string(),
                });
            }
            if description.kind.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("compilers.{}.kind", description.id),
                    reason: "kind cannot be empty".to_string(),
                });
            }
            if !seen.insert(description.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "compiler '{}' is declared more than once",
                    description.id
                )));
            }
        }

        Ok(())
    }
}
