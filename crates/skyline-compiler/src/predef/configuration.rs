//! Merges configuration sources into one compiled file

use crate::compiler::Compiler;
use crate::context::CompilerContext;
use crate::error::{CompilerError, CompilerResult};
use crate::logger::Verbosity;
use crate::source::{PackageOrder, SearchBanks, SourceFile};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use skyline_config::project::{SEARCH_PATH_CONFIG, SEARCH_PATH_USER_CONFIG};
use skyline_config::{AppDirectory, CompilerDescription};
use std::fs;
use std::path::{Path, PathBuf};

/// What to collect and where to write it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigurationInfo {
    /// File name written below the compiled directory
    pub target: String,
    /// Regex matched against source base names
    pub pattern: String,
    /// Default file looked up in the user-config search paths
    pub default: Option<String>,
    /// Development file, applied in development contexts
    pub dev: Option<String>,
    /// Test file, applied in test contexts
    pub test: Option<String>,
    /// Regex excluding sources by full path
    pub exclude: Option<String>,
}

/// Collects configuration sources and deep-merges them into `Compiled/<target>`
///
/// Objects merge recursively, arrays append and scalars are replaced by later
/// sources. The ordered variant sorts sources by composer package precedence.
#[derive(Debug, Clone)]
pub struct ConfigurationCompiler {
    id: String,
    dependencies: Vec<String>,
    info: ConfigurationInfo,
    ordered: bool,
    ignore_module_configuration: bool,
}

impl ConfigurationCompiler {
    pub fn new(id: impl Into<String>, info: ConfigurationInfo) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            info,
            ordered: false,
            ignore_module_configuration: true,
        }
    }

    /// Variant ordering sources by composer package precedence
    pub fn ordered(id: impl Into<String>, info: ConfigurationInfo) -> Self {
        Self {
            ordered: true,
            ..Self::new(id, info)
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Also merge configuration files that belong to modules
    pub fn include_module_configuration(mut self) -> Self {
        self.ignore_module_configuration = false;
        self
    }

    pub fn from_description(description: &CompilerDescription, ordered: bool) -> CompilerResult<Self> {
        let info: ConfigurationInfo = super::parse_arguments(description)?;
        if info.target.is_empty() || info.pattern.is_empty() {
            return Err(CompilerError::invalid_arguments(
                &description.id,
                "`target` and `pattern` are required",
            ));
        }

        let compiler = Self::new(&description.id, info).with_dependencies(description.dependencies.clone());
        Ok(Self { ordered, ..compiler })
    }

    pub fn info(&self) -> &ConfigurationInfo {
        &self.info
    }

    fn reserved_names(&self) -> [Option<&str>; 3] {
        [
            self.info.default.as_deref(),
            self.info.dev.as_deref(),
            self.info.test.as_deref(),
        ]
    }

    /// Configuration files from the config search paths, restricted to the project
    fn configuration_files(&self, context: &mut CompilerContext) -> CompilerResult<Vec<SourceFile>> {
        let previous = context.source_code_manager()?.set_restrict_to_project(true);
        let result = context.source_files(
            Some(&self.info.pattern),
            &SearchBanks::only([SEARCH_PATH_CONFIG]),
        );
        context.source_code_manager()?.set_restrict_to_project(previous);

        let mut files: Vec<SourceFile> = result?
            .into_iter()
            .filter(|file| Some(file.file_name()) != self.info.default.as_deref())
            .collect();

        if self.ordered {
            if let Some(order) = PackageOrder::from_cache(context.value_cache()) {
                files.sort_by_key(|file| order.rank(file.path()));
            }
        }
        Ok(files)
    }

    /// Parse a source unless it is skipped; problems are logged
    fn add_source(
        &self,
        path: &Path,
        skip_check: bool,
        context: &mut CompilerContext,
        sources: &mut Vec<Value>,
    ) -> CompilerResult<()> {
        if !path.is_file() {
            context
                .logger()
                .log_warning(&format!("Source not found: {}", path.display()), Some(&self.id));
            return Ok(());
        }

        if self.ignore_module_configuration
            && context.source_code_manager()?.is_file_part_of_module(path)
        {
            context.logger().log_text(
                &format!("Source {} ignored: {}", self.id, path.display()),
                Verbosity::VeryVerbose,
            );
            return Ok(());
        }

        let name = path.file_name().and_then(|n| n.to_str());
        if !skip_check && name.is_some() && self.reserved_names().contains(&name) {
            context.logger().log_warning(
                &format!("Source {} conflicts with default", path.display()),
                Some(&self.id),
            );
            return Ok(());
        }

        context.logger().log_text(
            &format!("Source for {} found: {}", self.id, path.display()),
            Verbosity::VeryVerbose,
        );
        match read_source(path) {
            Ok(value) => sources.push(value),
            Err(e) => context
                .logger()
                .log_warning(&format!("Source Error: {}", e), Some(&self.id)),
        }
        Ok(())
    }

    /// First existing `file_name` in the user-config search paths
    fn user_config_file(context: &CompilerContext, file_name: &str) -> Option<PathBuf> {
        context
            .project_search_paths(SEARCH_PATH_USER_CONFIG)
            .into_iter()
            .map(|dir| dir.join(file_name))
            .find(|path| path.is_file())
    }
}

impl Compiler for ConfigurationCompiler {
    fn id(&self) -> &str {
        &self.id
    }

    fn depends_on(&self) -> &[String] {
        &self.dependencies
    }

    fn compile(&self, context: &mut CompilerContext) -> CompilerResult<()> {
        let exclude = self
            .info
            .exclude
            .as_deref()
            .map(|p| {
                Regex::new(p).map_err(|e| CompilerError::InvalidPattern {
                    pattern: p.to_string(),
                    error: e.to_string(),
                })
            })
            .transpose()?;

        let mut sources = Vec::new();
        for file in self.configuration_files(context)? {
            let excluded = exclude
                .as_ref()
                .is_some_and(|re| re.is_match(&file.path().to_string_lossy()));
            if !excluded {
                self.add_source(file.path(), false, context, &mut sources)?;
            }
        }

        let defaults = [
            (self.info.default.as_deref(), true),
            (self.info.dev.as_deref(), context.is_development_context()),
            (self.info.test.as_deref(), context.is_test_context()),
        ];
        for (file_name, enabled) in defaults {
            let Some(file_name) = file_name.filter(|_| enabled) else {
                continue;
            };
            if let Some(path) = Self::user_config_file(context, file_name) {
                self.add_source(&path, true, context, &mut sources)?;
            }
        }

        let merged = sources.into_iter().fold(Value::Object(Default::default()), |mut acc, source| {
            merge_values(&mut acc, source);
            acc
        });

        let compiled = context.app_directory(AppDirectory::Compiled)?;
        fs::create_dir_all(&compiled).map_err(|e| CompilerError::io(&compiled, e))?;
        let target = compiled.join(&self.info.target);
        let content = serde_json::to_string_pretty(&merged)
            .map_err(|e| CompilerError::compilation(&self.id, e))?;
        fs::write(&target, content).map_err(|e| CompilerError::io(&target, e))?;

        context
            .value_cache_mut()
            .post_value(self.info.target.clone(), &self.id, "");
        Ok(())
    }
}

/// Read a JSON or TOML source into a JSON object
fn read_source(path: &Path) -> CompilerResult<Value> {
    let content = fs::read_to_string(path).map_err(|e| CompilerError::io(path, e))?;
    let value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| CompilerError::bad_source(path, e))?,
        Some("toml") => {
            let table: toml::Table =
                toml::from_str(&content).map_err(|e| CompilerError::bad_source(path, e))?;
            serde_json::to_value(table).map_err(|e| CompilerError::bad_source(path, e))?
        }
        _ => return Err(CompilerError::bad_source(path, "unsupported source format")),
    };

    if !value.is_object() {
        return Err(CompilerError::bad_source(path, "configuration root must be a table"));
    }
    Ok(value)
}

/// Deep merge: objects recursively, arrays appended, anything else replaced
pub fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => target.extend(source),
        (target, source) => *target = source,
    }
}
