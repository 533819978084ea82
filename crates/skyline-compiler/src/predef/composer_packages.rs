//! Orders composer packages by their requirements

use crate::compiler::Compiler;
use crate::context::CompilerContext;
use crate::dependency::DependencyCollection;
use crate::error::{CompilerError, CompilerResult};
use crate::logger::Verbosity;
use crate::source::{ComposerPackage, PackageOrder, SearchBanks};
use serde::Deserialize;
use serde_json::Value;
use skyline_config::project::SEARCH_PATH_VENDOR;
use skyline_config::CompilerDescription;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

const COMPOSER_FILE_NAME: &str = "composer.json";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
struct Arguments {
    root_composer_directory: PathBuf,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            root_composer_directory: PathBuf::from("."),
        }
    }
}

/// The parts of a composer.json this compiler reads
#[derive(Debug, Default, Deserialize)]
struct ComposerManifest {
    name: Option<String>,
    #[serde(default)]
    require: BTreeMap<String, Value>,
    #[serde(default)]
    repositories: Vec<Repository>,
}

#[derive(Debug, Default, Deserialize)]
struct Repository {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    url: String,
}

/// Publishes the dependency-ordered composer packages of the project
///
/// Packages come from local `path` repositories of the root composer.json,
/// every composer.json in the vendor bank and the root package itself. A
/// package appearing twice keeps its first position with the last definition;
/// requirements that are not packages of the project are ignored.
#[derive(Debug, Clone)]
pub struct ComposerPackagesOrderCompiler {
    id: String,
    dependencies: Vec<String>,
    root_composer_directory: PathBuf,
}

impl ComposerPackagesOrderCompiler {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            root_composer_directory: PathBuf::from("."),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn from_description(description: &CompilerDescription) -> CompilerResult<Self> {
        let arguments: Arguments = super::parse_arguments(description)?;
        Ok(Self {
            id: description.id.clone(),
            dependencies: description.dependencies.clone(),
            root_composer_directory: arguments.root_composer_directory,
        })
    }

    fn read_manifest(path: &Path) -> CompilerResult<ComposerManifest> {
        let content = fs::read_to_string(path).map_err(|e| CompilerError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| CompilerError::bad_source(path, e))
    }

    fn register(
        &self,
        collection: &mut DependencyCollection<ComposerPackage>,
        manifest: &ComposerManifest,
        dir: &Path,
        context: &CompilerContext,
    ) -> CompilerResult<()> {
        let Some(name) = &manifest.name else {
            context.logger().log_text(
                &format!("Unnamed composer package at {}", dir.display()),
                Verbosity::VeryVerbose,
            );
            return Ok(());
        };

        let package = ComposerPackage {
            name: name.clone(),
            path: normalize_path(dir),
        };
        collection.add(name.clone(), package, manifest.require.keys().cloned())
    }
}

/// Resolve `.` and `..` lexically so package paths share the form of walked paths
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

impl Compiler for ComposerPackagesOrderCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        let root_dir = context
            .require_project()?
            .root_directory()
            .join(&self.root_composer_directory);
        let root_file = root_dir.join(COMPOSER_FILE_NAME);
        let root = if root_file.is_file() {
            Some(Self::read_manifest(&root_file)?)
        } else {
            context.logger().log_warning(
                &format!("Root {} not found", root_file.display()),
                Some(&self.id),
            );
            None
        };

        let mut collection = DependencyCollection::new().with_accepts_duplicates(true);

        for repository in root.iter().flat_map(|r| &r.repositories) {
            if repository.kind != "path" {
                continue;
            }
            let dir = normalize_path(&root_dir.join(&repository.url));
            if !dir.is_dir() {
                continue;
            }
            let file = dir.join(COMPOSER_FILE_NAME);
            if file.is_file() {
                let manifest = Self::read_manifest(&file)?;
                self.register(&mut collection, &manifest, &dir, context)?;
            }
        }

        let vendor_files = context.source_files(
            Some(r"(?i)^composer\.json$"),
            &SearchBanks::only([SEARCH_PATH_VENDOR]),
        )?;
        for file in vendor_files {
            match Self::read_manifest(file.path()) {
                Ok(manifest) => {
                    let dir = file.path().parent().unwrap_or(file.path());
                    self.register(&mut collection, &manifest, dir, context)?;
                }
                Err(e) => context.logger().log_warning(&e.to_string(), Some(&self.id)),
            }
        }

        if let Some(root) = &root {
            self.register(&mut collection, root, &root_dir, context)?;
        }

        let order = PackageOrder::new(collection.into_ordered_elements()?);
        context.logger().log_text(
            &format!("Ordered {} composer packages", order.len()),
            Verbosity::Verbose,
        );
        order.post(context.value_cache_mut())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::SilentLogger;
    use pretty_assertions::assert_eq;
    use skyline_config::Project;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn write_package(dir: &Path, name: &str, requires: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        let require: serde_json::Map<String, Value> = requires
            .iter()
            .map(|r| (r.to_string(), Value::String("*".into())))
            .collect();
        let json = serde_json::json!({ "name": name, "require": require });
        fs::write(dir.join(COMPOSER_FILE_NAME), json.to_string()).unwrap();
    }

    #[test]
    fn test_packages_ordered_by_requirements() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write_package(root, "app/root", &["acme/http", "php"]);
        write_package(&root.join("vendor/acme/http"), "acme/http", &["acme/core"]);
        write_package(&root.join("vendor/acme/core"), "acme/core", &["ext-json"]);

        let project = Project::new(root).with_search_path(SEARCH_PATH_VENDOR, "vendor");
        let mut context =
            CompilerContext::new(project).with_logger(Rc::new(SilentLogger::new()));
        context.add_unit(ComposerPackagesOrderCompiler::new("composer-packages-order"));
        assert!(context.compile().unwrap().is_success());

        let order = PackageOrder::from_cache(context.value_cache()).unwrap();
        let names: Vec<&str> = order.packages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["acme/core", "acme/http", "app/root"]);
        assert_eq!(order.packages()[0].path, root.join("vendor/acme/core"));
    }

    #[test]
    fn test_path_repository_included() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("app");
        let local = temp_dir.path().join("local-lib");
        write_package(&local, "local/lib", &[]);
        fs::create_dir_all(&root).unwrap();
        let json = serde_json::json!({
            "name": "app/root",
            "require": { "local/lib": "*" },
            "repositories": [{ "type": "path", "url": "../local-lib" }]
        });
        fs::write(root.join(COMPOSER_FILE_NAME), json.to_string()).unwrap();

        let mut context =
            CompilerContext::new(Project::new(&root)).with_logger(Rc::new(SilentLogger::new()));
        context.add_unit(ComposerPackagesOrderCompiler::new("order"));
        context.compile().unwrap();

        let order = PackageOrder::from_cache(context.value_cache()).unwrap();
        assert_eq!(order.index_of_name("local/lib"), Some(0));
        assert_eq!(order.index_of_name("app/root"), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_package_paths_keep_project_root_form() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real-app");
        let root = temp_dir.path().join("app");
        write_package(&real.join("packages/local"), "local/lib", &[]);
        let json = serde_json::json!({
            "name": "app/root",
            "require": { "local/lib": "*" },
            "repositories": [{ "type": "path", "url": "./packages/local" }]
        });
        fs::write(real.join(COMPOSER_FILE_NAME), json.to_string()).unwrap();
        std::os::unix::fs::symlink(&real, &root).unwrap();

        let mut context =
            CompilerContext::new(Project::new(&root)).with_logger(Rc::new(SilentLogger::new()));
        context.add_unit(ComposerPackagesOrderCompiler::new("order"));
        context.compile().unwrap();

        let order = PackageOrder::from_cache(context.value_cache()).unwrap();
        assert_eq!(order.packages()[0].path, root.join("packages/local"));
        assert_eq!(order.packages()[1].path, root);
        assert_eq!(order.rank(&root.join("packages/local/config/local.config.json")), 0);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/srv/app/./../lib")), PathBuf::from("/srv/lib"));
        assert_eq!(normalize_path(Path::new("/srv/app/.")), PathBuf::from("/srv/app"));
    }
}
