//! Creates a fresh application data skeleton

use crate::compiler::Compiler;
use crate::context::CompilerContext;
use crate::error::CompilerResult;
use crate::logger::Verbosity;
use serde::Deserialize;
use skyline_config::{AppDirectory, CompilerDescription};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
struct Arguments {
    directories: Option<Vec<PathBuf>>,
}

/// Creates the app-data directory, then removes and recreates each named sub-directory
///
/// Without explicit names the configured skeleton directories are used.
/// Filesystem failures are logged as warnings and never abort the run.
#[derive(Debug, Clone)]
pub struct CreateDirectoriesCompiler {
    id: String,
    dependencies: Vec<String>,
    directories: Option<Vec<PathBuf>>,
}

impl CreateDirectoriesCompiler {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            directories: None,
        }
    }

    pub fn with_directories(mut self, directories: Vec<PathBuf>) -> Self {
        self.directories = Some(directories);
        self
    }

    pub fn from_description(description: &CompilerDescription) -> CompilerResult<Self> {
        let arguments: Arguments = super::parse_arguments(description)?;
        Ok(Self {
            id: description.id.clone(),
            dependencies: description.dependencies.clone(),
            directories: arguments.directories,
        })
    }

    fn directory_names(&self, context: &CompilerContext) -> Vec<PathBuf> {
        match &self.directories {
            Some(names) => names.clone(),
            None => AppDirectory::skeleton()
                .iter()
                .map(|dir| context.configuration().directory_name(*dir).to_path_buf())
                .collect(),
        }
    }

    fn make_dir(&self, dir: &Path, context: &CompilerContext) {
        match fs::create_dir_all(dir) {
            Ok(()) => context
                .logger()
                .log_text(&format!("Created directory {}", dir.display()), Verbosity::Verbose),
            Err(e) => context.logger().log_warning(
                &format!("Creating directory {} failed: {}", dir.display(), e),
                Some(&self.id),
            ),
        }
    }

    fn remove_dir(&self, dir: &Path, context: &CompilerContext) -> bool {
        match fs::remove_dir_all(dir) {
            Ok(()) => {
                context.logger().log_text(
                    &format!("Directory {} removed", dir.display()),
                    Verbosity::VeryVerbose,
                );
                true
            }
            Err(e) => {
                context.logger().log_warning(
                    &format!("Removing directory {} failed: {}", dir.display(), e),
                    Some(&self.id),
                );
                false
            }
        }
    }
}

impl Compiler for CreateDirectoriesCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        let app_data = context.app_data_directory()?;
        if !app_data.exists() {
            self.make_dir(&app_data, context);
        }

        for name in self.directory_names(context) {
            let dir = app_data.join(name);
            if dir.exists() && !self.remove_dir(&dir, context) {
                continue;
            }
            self.make_dir(&dir, context);
        }
        Ok(())
    }
}
