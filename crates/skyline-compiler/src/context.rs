//! Compiler context and run orchestration
//!
//! The context owns everything a run shares: the project, the compiler
//! settings, the logger, both caches, the source code manager and the
//! registered compiler items. [`CompilerContext::compile`] resolves the items
//! into one dependency order and executes the units one after another.

use crate::bridge::{self, ActiveRunGuard, ErrorBridge, Severity};
use crate::cache::{FileCache, ValueCache};
use crate::compiler::{Compiler, CompilerItem};
use crate::dependency::DependencyCollection;
use crate::error::{CompilerError, CompilerResult};
use crate::factory::CompilerRegistry;
use crate::logger::{Logger, TracingLogger, Verbosity};
use crate::parameters::ContextParameters;
use crate::source::{PackageOrder, SearchBanks, SourceCodeManager, SourceFile, SourceQuery};
use regex::Regex;
use skyline_config::{AppDirectory, CompilerConfiguration, CompilerDescription, Config, Project};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Resolving,
    Running,
    Done,
    Aborted,
}

/// Result of a run that got past configuration checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// `Done` or `Aborted`
    pub state: RunState,
    /// Ids of units that completed, in execution order
    pub executed: Vec<String>,
    /// Ids rejected by the predicate
    pub skipped: Vec<String>,
    /// Id of the unit whose failure aborted the run
    pub failed: Option<String>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state == RunState::Done
    }

    fn new(state: RunState) -> Self {
        Self {
            state,
            executed: Vec::new(),
            skipped: Vec::new(),
            failed: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// Shared state of a compiler run
pub struct CompilerContext {
    project: Option<Project>,
    fallback_project: Option<Project>,
    configuration: CompilerConfiguration,
    logger: Rc<dyn Logger>,
    value_cache: ValueCache,
    file_cache: Option<FileCache>,
    source_code_manager: Option<SourceCodeManager>,
    parameters: ContextParameters,
    items: Vec<CompilerItem>,
    organized: Option<Vec<Rc<dyn Compiler>>>,
    state: RunState,
}

impl CompilerContext {
    /// Create a context for a project with default settings
    pub fn new(project: Project) -> Self {
        let parameters = ContextParameters::from_map(project.parameters().clone());
        let mut context = Self::without_project();
        context.project = Some(project);
        context.parameters = parameters;
        context
    }

    /// Create a context without project; one must be supplied before compiling
    pub fn without_project() -> Self {
        Self {
            project: None,
            fallback_project: None,
            configuration: CompilerConfiguration::default(),
            logger: Rc::new(TracingLogger),
            value_cache: ValueCache::new(),
            file_cache: None,
            source_code_manager: None,
            parameters: ContextParameters::new(),
            items: Vec::new(),
            organized: None,
            state: RunState::Idle,
        }
    }

    /// Create a context from loaded configuration
    ///
    /// The configured project is only used when no explicit project is set.
    pub fn from_config(config: &Config) -> Self {
        let mut context = Self::without_project();
        context.configuration = config.compiler.clone();
        context.fallback_project = config.project.clone();
        if let Some(project) = &config.project {
            context.parameters = ContextParameters::from_map(project.parameters().clone());
        }
        context
    }

    pub fn with_configuration(mut self, configuration: CompilerConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_logger(mut self, logger: Rc<dyn Logger>) -> Self {
        self.set_logger(logger);
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    /// Effective project: explicit one first, then the configured fallback
    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref().or(self.fallback_project.as_ref())
    }

    pub fn set_project(&mut self, project: Project) {
        self.project = Some(project);
        self.source_code_manager = None;
    }

    /// Project or `BadConfiguration`
    pub fn require_project(&self) -> CompilerResult<&Project> {
        self.project().ok_or_else(|| {
            CompilerError::BadConfiguration(
                "Compilation without project settings is not possible".to_string(),
            )
        })
    }

    pub fn configuration(&self) -> &CompilerConfiguration {
        &self.configuration
    }

    pub fn configuration_mut(&mut self) -> &mut CompilerConfiguration {
        &mut self.configuration
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn set_logger(&mut self, logger: Rc<dyn Logger>) {
        self.logger = logger;
        self.source_code_manager = None;
    }

    pub fn value_cache(&self) -> &ValueCache {
        &self.value_cache
    }

    pub fn value_cache_mut(&mut self) -> &mut ValueCache {
        &mut self.value_cache
    }

    /// File cache, opened from the configured cache file on first use
    pub fn file_cache(&mut self) -> CompilerResult<&mut FileCache> {
        if self.file_cache.is_none() {
            let root = self.require_project()?.root_directory().to_path_buf();
            let cache = FileCache::open(root.join(&self.configuration.cache_file))?;
            self.file_cache = Some(cache);
        }
        self.file_cache
            .as_mut()
            .ok_or_else(|| CompilerError::CacheError("file cache unavailable".to_string()))
    }

    pub fn set_file_cache(&mut self, cache: FileCache) {
        self.file_cache = Some(cache);
    }

    /// Source code manager, created for the project on first use
    pub fn source_code_manager(&mut self) -> CompilerResult<&mut SourceCodeManager> {
        if self.source_code_manager.is_none() {
            let project = self.require_project()?;
            let manager =
                SourceCodeManager::new(project, &self.configuration, Rc::clone(&self.logger));
            self.source_code_manager = Some(manager);
        }
        self.source_code_manager.as_mut().ok_or_else(|| {
            CompilerError::BadConfiguration("source code manager unavailable".to_string())
        })
    }

    pub fn set_source_code_manager(&mut self, manager: SourceCodeManager) {
        self.source_code_manager = Some(manager);
    }

    pub fn parameters(&self) -> &ContextParameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ContextParameters {
        &mut self.parameters
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Forward a runtime diagnostic to the logger, tagged with the active unit
    pub fn report(&self, severity: Severity, message: &str) {
        let origin = bridge::active_run().and_then(|run| run.compiler_id);
        severity.log(self.logger(), message, origin.as_deref());
    }

    // ========================================================================
    // Project paths and flags
    // ========================================================================

    /// `<root>/<app-data-dir>`
    pub fn app_data_directory(&self) -> CompilerResult<PathBuf> {
        let root = self.require_project()?.root_directory();
        Ok(root.join(&self.configuration.app_data_dir))
    }

    /// `<root>/<public-data-dir>`
    pub fn public_data_directory(&self) -> CompilerResult<PathBuf> {
        let root = self.require_project()?.root_directory();
        Ok(root.join(&self.configuration.public_data_dir))
    }

    /// A named sub-directory of the app-data directory
    pub fn app_directory(&self, dir: AppDirectory) -> CompilerResult<PathBuf> {
        Ok(self
            .app_data_directory()?
            .join(self.configuration.directory_name(dir)))
    }

    /// Directories of a project search path list (empty without project)
    pub fn project_search_paths(&self, name: &str) -> Vec<PathBuf> {
        self.project()
            .map(|p| p.search_paths().get(name).to_vec())
            .unwrap_or_default()
    }

    /// Path of `target` relative to the project root, or its real path with zero links
    pub fn relative_project_path(&self, target: &Path) -> CompilerResult<PathBuf> {
        if self.use_zero_links() {
            return target.canonicalize().map_err(|e| CompilerError::io(target, e));
        }
        let root = self.require_project()?.root_directory();
        Ok(pathdiff::diff_paths(target, root).unwrap_or_else(|| target.to_path_buf()))
    }

    pub fn is_development_context(&self) -> bool {
        self.configuration.debug
    }

    pub fn is_test_context(&self) -> bool {
        self.configuration.test
    }

    pub fn use_zero_links(&self) -> bool {
        self.configuration.zero_links
    }

    // ========================================================================
    // Source discovery
    // ========================================================================

    /// Query project sources by base-name regex and bank selection
    ///
    /// The composer package order published in the value cache is applied when
    /// the manager respects package order.
    pub fn yield_source_files(
        &mut self,
        pattern: Option<&str>,
        banks: &SearchBanks,
    ) -> CompilerResult<SourceQuery<'_>> {
        let regex = pattern
            .map(|p| {
                Regex::new(p).map_err(|e| CompilerError::InvalidPattern {
                    pattern: p.to_string(),
                    error: e.to_string(),
                })
            })
            .transpose()?;
        let packages = PackageOrder::from_cache(&self.value_cache);

        let manager = self.source_code_manager()?;
        manager.yield_source_files(regex.as_ref(), banks, packages.as_ref())
    }

    /// Owned copy of a source query
    pub fn source_files(
        &mut self,
        pattern: Option<&str>,
        banks: &SearchBanks,
    ) -> CompilerResult<Vec<SourceFile>> {
        Ok(self
            .yield_source_files(pattern, banks)?
            .map(|(_, file)| file.clone())
            .collect())
    }

    // ========================================================================
    // Compiler items
    // ========================================================================

    /// Register a unit or a factory
    pub fn add_compiler(&mut self, item: CompilerItem) {
        self.items.push(item);
        self.organized = None;
    }

    pub fn add_unit(&mut self, compiler: impl Compiler + 'static) {
        self.add_compiler(CompilerItem::unit(compiler));
    }

    pub fn add_factory(&mut self, factory: impl crate::compiler::CompilerFactory + 'static) {
        self.add_compiler(CompilerItem::factory(factory));
    }

    /// Register a unit described by configuration; an unknown kind fails right away
    pub fn add_described(
        &mut self,
        registry: &CompilerRegistry,
        description: &CompilerDescription,
    ) -> CompilerResult<()> {
        let compiler = registry.instantiate(description)?;
        self.add_compiler(CompilerItem::Unit(compiler));
        Ok(())
    }

    /// Drop every item registered under `id`; returns whether one was removed
    pub fn remove_compiler(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        let removed = self.items.len() != before;
        if removed {
            self.organized = None;
        }
        removed
    }

    pub fn items(&self) -> &[CompilerItem] {
        &self.items
    }

    /// Units in execution order, memoized until items change
    pub fn organized_compilers(&mut self) -> CompilerResult<Vec<Rc<dyn Compiler>>> {
        if let Some(organized) = &self.organized {
            return Ok(organized.clone());
        }
        let organized = self.resolve()?;
        self.organized = Some(organized.clone());
        Ok(organized)
    }

    fn resolve(&self) -> CompilerResult<Vec<Rc<dyn Compiler>>> {
        let mut collection: DependencyCollection<Rc<dyn Compiler>> = DependencyCollection::new();

        for item in &self.items {
            match item {
                CompilerItem::Unit(compiler) => {
                    crate::compiler::register_unit(&mut collection, Rc::clone(compiler))?;
                }
                CompilerItem::Factory(factory) => {
                    factory.register_compilers(&mut collection, self)?;
                }
            }
        }

        for (dependent, missing) in collection.missing_dependencies() {
            tracing::debug!(dependent, missing, "treating unregistered dependency as satisfied");
        }

        collection.into_ordered_elements()
    }

    // ========================================================================
    // Run
    // ========================================================================

    /// Run every registered unit in dependency order
    pub fn compile(&mut self) -> CompilerResult<RunOutcome> {
        self.compile_filtered(|_| true)
    }

    /// Run the units accepted by `predicate` in dependency order
    ///
    /// Only a missing project or a nested call from a running unit fails the
    /// call. Resolution errors, unit errors and panics are logged as exceptions
    /// and end the run as `Aborted`.
    pub fn compile_filtered<P>(&mut self, predicate: P) -> CompilerResult<RunOutcome>
    where
        P: Fn(&dyn Compiler) -> bool,
    {
        if matches!(self.state, RunState::Resolving | RunState::Running) {
            return Err(CompilerError::BadConfiguration(
                "A compile run is already in progress on this context".to_string(),
            ));
        }
        let root = self.require_project()?.root_directory().to_path_buf();
        if !root.is_dir() {
            return Err(CompilerError::BadConfiguration(format!(
                "Project root {} does not exist",
                root.display()
            )));
        }

        let start = Instant::now();
        let _bridge = ErrorBridge::install();

        self.state = RunState::Resolving;
        let compilers = match panic::catch_unwind(AssertUnwindSafe(|| self.organized_compilers())) {
            Ok(Ok(compilers)) => compilers,
            Ok(Err(error)) => return Ok(self.abort_before_run(error, start)),
            Err(payload) => {
                let error = CompilerError::Panic {
                    compiler: "<resolution>".to_string(),
                    message: bridge::panic_message(payload.as_ref()),
                };
                return Ok(self.abort_before_run(error, start));
            }
        };

        tracing::debug!(units = compilers.len(), "compiler order resolved");
        let mut outcome = RunOutcome::new(RunState::Running);
        let active = ActiveRunGuard::enter(&root);
        self.state = RunState::Running;

        for compiler in compilers {
            let id = compiler.id().to_string();
            if !predicate(compiler.as_ref()) {
                self.logger
                    .log_text(&format!("Skipping {}", id), Verbosity::Verbose);
                outcome.skipped.push(id);
                continue;
            }

            active.set_compiler(Some(&id));
            self.logger.log_text(&format!("Compiling {}", id), Verbosity::Verbose);

            let result = panic::catch_unwind(AssertUnwindSafe(|| compiler.compile(self)));
            let error = match result {
                Ok(Ok(())) => {
                    outcome.executed.push(id);
                    continue;
                }
                Ok(Err(error)) => error,
                Err(payload) => {
                    let mut message = bridge::panic_message(payload.as_ref());
                    if let Some(location) = ErrorBridge::take_panic_location() {
                        message = format!("{} at {}", message, location);
                    }
                    CompilerError::Panic {
                        compiler: id.clone(),
                        message,
                    }
                }
            };

            self.logger.log_exception(&error);
            outcome.failed = Some(id);
            outcome.state = RunState::Aborted;
            break;
        }
        drop(active);

        if outcome.state == RunState::Running {
            outcome.state = RunState::Done;
        }
        if let Some(cache) = self.file_cache.as_mut() {
            if let Err(e) = cache.save() {
                self.logger.log_warning(&e.to_string(), None);
            }
        }

        self.state = outcome.state;
        outcome.elapsed = start.elapsed();
        Ok(outcome)
    }

    fn abort_before_run(&mut self, error: CompilerError, start: Instant) -> RunOutcome {
        self.logger.log_exception(&error);
        self.state = RunState::Aborted;
        let mut outcome = RunOutcome::new(RunState::Aborted);
        outcome.elapsed = start.elapsed();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::active_run;
    use crate::compiler::CallbackCompiler;
    use crate::logger::SilentLogger;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> (CompilerContext, Rc<SilentLogger>) {
        let logger = Rc::new(SilentLogger::new());
        let context = CompilerContext::new(Project::new(dir.path())).with_logger(logger.clone());
        (context, logger)
    }

    #[test]
    fn test_compile_without_project() {
        let mut context = CompilerContext::without_project();
        assert!(matches!(
            context.compile(),
            Err(CompilerError::BadConfiguration(_))
        ));
        assert_eq!(context.state(), RunState::Idle);
    }

    #[test]
    fn test_compile_with_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let mut context = CompilerContext::new(Project::new(temp_dir.path().join("gone")));
        assert!(matches!(
            context.compile(),
            Err(CompilerError::BadConfiguration(_))
        ));
    }

    #[test]
    fn test_fallback_project_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            compiler: CompilerConfiguration::default(),
            project: Some(Project::new(temp_dir.path())),
            compilers: Vec::new(),
            manifest_dir: None,
        };
        let mut context = CompilerContext::from_config(&config);
        context.set_logger(Rc::new(SilentLogger::new()));

        assert!(context.compile().unwrap().is_success());
    }

    #[test]
    fn test_order_cache_invalidated_on_add_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, _) = context(&temp_dir);
        context.add_unit(CallbackCompiler::new("b", |_| Ok(())).with_dependencies(["a"]));

        let ids = |c: &mut CompilerContext| -> Vec<String> {
            c.organized_compilers()
                .unwrap()
                .iter()
                .map(|u| u.id().to_string())
                .collect()
        };
        assert_eq!(ids(&mut context), vec!["b"]);

        context.add_unit(CallbackCompiler::new("a", |_| Ok(())));
        assert_eq!(ids(&mut context), vec!["a", "b"]);

        assert!(context.remove_compiler("a"));
        assert!(!context.remove_compiler("a"));
        assert_eq!(ids(&mut context), vec!["b"]);
    }

    #[test]
    fn test_unit_error_aborts_and_is_logged() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, logger) = context(&temp_dir);
        let ran = Rc::new(RefCell::new(Vec::new()));

        for (id, fail) in [("a", false), ("b", true), ("c", false)] {
            let ran = Rc::clone(&ran);
            context.add_unit(CallbackCompiler::new(id, move |_| {
                ran.borrow_mut().push(id);
                if fail {
                    Err(CompilerError::compilation(id, "broken"))
                } else {
                    Ok(())
                }
            }));
        }

        let outcome = context.compile().unwrap();
        assert_eq!(outcome.state, RunState::Aborted);
        assert_eq!(outcome.failed.as_deref(), Some("b"));
        assert_eq!(*ran.borrow(), vec!["a", "b"]);
        assert_eq!(logger.exceptions().len(), 1);
        assert_eq!(context.state(), RunState::Aborted);
    }

    #[test]
    fn test_nested_compile_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, logger) = context(&temp_dir);
        let runs = Rc::new(RefCell::new(0));
        let nested = Rc::new(RefCell::new(None));

        let (r, n) = (runs.clone(), nested.clone());
        context.add_unit(CallbackCompiler::new("recursive", move |c| {
            *r.borrow_mut() += 1;
            let result = c.compile();
            *n.borrow_mut() = Some(matches!(result, Err(CompilerError::BadConfiguration(_))));
            result.map(|_| ())
        }));

        let outcome = context.compile().unwrap();
        assert_eq!(*runs.borrow(), 1);
        assert_eq!(*nested.borrow(), Some(true));
        assert_eq!(outcome.state, RunState::Aborted);
        assert_eq!(outcome.failed.as_deref(), Some("recursive"));
        assert_eq!(logger.exceptions().len(), 1);
        assert_eq!(context.state(), RunState::Aborted);
    }

    #[test]
    fn test_panic_is_intercepted() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, logger) = context(&temp_dir);
        context.add_unit(CallbackCompiler::new("explode", |_| panic!("kaboom")));

        let outcome = context.compile().unwrap();
        assert_eq!(outcome.state, RunState::Aborted);
        let exceptions = logger.exceptions();
        assert_eq!(exceptions.len(), 1);
        assert!(exceptions[0].contains("kaboom"));
        assert!(!ErrorBridge::is_installed());
    }

    #[test]
    fn test_cycle_is_logged_not_returned() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, logger) = context(&temp_dir);
        context.add_unit(CallbackCompiler::new("a", |_| Ok(())).with_dependencies(["b"]));
        context.add_unit(CallbackCompiler::new("b", |_| Ok(())).with_dependencies(["a"]));

        let outcome = context.compile().unwrap();
        assert_eq!(outcome.state, RunState::Aborted);
        assert!(outcome.executed.is_empty());
        assert!(logger.exceptions()[0].contains("a -> b -> a"));
    }

    #[test]
    fn test_active_run_visible_only_while_running() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, _) = context(&temp_dir);
        let seen = Rc::new(RefCell::new(None));
        let captured = Rc::clone(&seen);
        context.add_unit(CallbackCompiler::new("probe", move |ctx| {
            assert_eq!(ctx.state(), RunState::Running);
            *captured.borrow_mut() = active_run();
            Ok(())
        }));

        assert_eq!(active_run(), None);
        context.compile().unwrap();
        assert_eq!(active_run(), None);

        let run = seen.borrow().clone().unwrap();
        assert_eq!(run.compiler_id.as_deref(), Some("probe"));
        assert_eq!(run.project_root, temp_dir.path());
    }

    #[test]
    fn test_predicate_skips_units() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, _) = context(&temp_dir);
        context.add_unit(CallbackCompiler::new("keep", |_| Ok(())));
        context.add_unit(CallbackCompiler::new("skip", |_| Ok(())));

        let outcome = context.compile_filtered(|c| c.id() != "skip").unwrap();
        assert_eq!(outcome.executed, vec!["keep"]);
        assert_eq!(outcome.skipped, vec!["skip"]);
    }

    #[test]
    fn test_report_tags_active_unit() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, logger) = context(&temp_dir);
        context.add_unit(CallbackCompiler::new("noisy", |ctx| {
            ctx.report(Severity::Warning, "careful");
            Ok(())
        }));

        context.compile().unwrap();
        let records = logger.records();
        let warning = records.iter().find(|r| r.message == "careful").unwrap();
        assert_eq!(warning.origin.as_deref(), Some("noisy"));
    }

    #[test]
    fn test_path_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, _) = context(&temp_dir);
        let root = temp_dir.path();

        assert_eq!(context.app_data_directory().unwrap(), root.join("SkylineAppData"));
        assert_eq!(
            context.app_directory(AppDirectory::Compiled).unwrap(),
            root.join("SkylineAppData").join("Compiled")
        );
        assert_eq!(context.public_data_directory().unwrap(), root.join("public_html"));
        assert_eq!(
            context.relative_project_path(&root.join("src/App.php")).unwrap(),
            PathBuf::from("src/App.php")
        );

        std::fs::write(root.join("index.php"), "").unwrap();
        context.configuration_mut().zero_links = true;
        assert!(context
            .relative_project_path(&root.join("index.php"))
            .unwrap()
            .is_absolute());
    }

    #[test]
    fn test_frozen_parameters_reject_writes() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::new(temp_dir.path()).with_parameter("application-class", "App");
        let mut context = CompilerContext::new(project);

        assert_eq!(context.parameters().application_class(), Some("App"));
        context.parameters_mut().deny_modifications();
        assert!(context.parameters_mut().set("context-class", "Ctx").is_err());
    }

    #[test]
    fn test_add_described_checks_kind_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let (mut context, _) = context(&temp_dir);
        let registry = CompilerRegistry::with_predefined();

        let unknown = CompilerDescription::new("x", "bogus");
        assert!(matches!(
            context.add_described(&registry, &unknown),
            Err(CompilerError::InvalidCompilerType { .. })
        ));
        assert!(context.items().is_empty());

        let known = CompilerDescription::new("dirs", "create-directories");
        context.add_described(&registry, &known).unwrap();
        assert_eq!(context.items()[0].id(), "dirs");
    }
}
