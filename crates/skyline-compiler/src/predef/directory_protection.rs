//! Places deny-all markers in generated directories

use crate::compiler::Compiler;
use crate::context::CompilerContext;
use crate::error::{CompilerError, CompilerResult};
use crate::logger::Verbosity;
use serde::Deserialize;
use skyline_config::CompilerDescription;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker file placed in every protected directory
pub const PROTECTION_FILE_NAME: &str = ".htaccess";

/// Content of a new marker file
pub const PROTECTION_MARKER: &str = "Deny from all";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
struct Arguments {
    directories: Vec<PathBuf>,
}

/// Recursively protects directories, skipping dot entries and keeping existing markers
///
/// Relative directories are resolved against the project root. Without any
/// configured directory the app-data directory is protected.
#[derive(Debug, Clone)]
pub struct DirectoryProtectionCompiler {
    id: String,
    dependencies: Vec<String>,
    directories: Vec<PathBuf>,
}

impl DirectoryProtectionCompiler {
    pub fn new(id: impl Into<String>, directories: Vec<PathBuf>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            directories,
        }
    }

    pub fn from_description(description: &CompilerDescription) -> CompilerResult<Self> {
        let arguments: Arguments = super::parse_arguments(description)?;
        Ok(Self {
            id: description.id.clone(),
            dependencies: description.dependencies.clone(),
            directories: arguments.directories,
        })
    }

    fn protect(&self, root: &Path, context: &CompilerContext) -> CompilerResult<usize> {
        let mut created = 0;
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_dot_entry(entry.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| CompilerError::compilation(&self.id, e))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let marker = entry.path().join(PROTECTION_FILE_NAME);
            if marker.exists() {
                continue;
            }
            fs::write(&marker, PROTECTION_MARKER).map_err(|e| CompilerError::io(&marker, e))?;
            created += 1;
        }

        context.logger().log_text(
            &format!("Protected {} directories below {}", created, root.display()),
            Verbosity::Verbose,
        );
        Ok(created)
    }
}

fn is_dot_entry(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

impl Compiler for DirectoryProtectionCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        let roots = if self.directories.is_empty() {
            vec![context.app_data_directory()?]
        } else {
            let root = context.require_project()?.root_directory().to_path_buf();
            self.directories.iter().map(|dir| root.join(dir)).collect()
        };

        for dir in roots.iter().filter(|dir| dir.is_dir()) {
            self.protect(dir, context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::SilentLogger;
    use skyline_config::Project;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[test]
    fn test_protects_every_directory_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("data");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join("a").join(PROTECTION_FILE_NAME), "test").unwrap();

        let mut context = CompilerContext::new(Project::new(temp_dir.path()))
            .with_logger(Rc::new(SilentLogger::new()));
        context.add_unit(DirectoryProtectionCompiler::new(
            "protect",
            vec![PathBuf::from("data")],
        ));
        assert!(context.compile().unwrap().is_success());

        let read = |p: PathBuf| fs::read_to_string(p.join(PROTECTION_FILE_NAME)).unwrap();
        assert_eq!(read(root.clone()), PROTECTION_MARKER);
        assert_eq!(read(root.join("a")), "test");
        assert_eq!(read(root.join("a/b")), PROTECTION_MARKER);
        assert!(!root.join(".git").join(PROTECTION_FILE_NAME).exists());
        assert!(!root.join(".git/objects").join(PROTECTION_FILE_NAME).exists());
    }

    #[test]
    fn test_missing_directory_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let mut context = CompilerContext::new(Project::new(temp_dir.path()))
            .with_logger(Rc::new(SilentLogger::new()));
        context.add_unit(DirectoryProtectionCompiler::new(
            "protect",
            vec![PathBuf::from("nope")],
        ));

        assert!(context.compile().unwrap().is_success());
    }
}
