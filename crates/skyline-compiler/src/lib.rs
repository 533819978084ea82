//! Skyline compiler pipeline
//!
//! Generates the runtime artifacts of a Skyline project:
//! - Dependency-ordered execution of compiler units and factories
//! - Lazy, memoized source discovery by search-path bank and pattern
//! - Composer package precedence applied to discovered sources
//! - Value and file caches shared between units
//! - Logger sink with panic interception during a run
//! - Predefined compilers for directories, protection, configuration and the entry point

pub mod bridge;
pub mod cache;
pub mod compiler;
pub mod context;
pub mod dependency;
pub mod error;
pub mod factory;
pub mod logger;
pub mod parameters;
pub mod predef;
pub mod source;

// Re-export main types
pub use bridge::{active_run, ActiveRun, ErrorBridge, Severity};
pub use cache::{FileCache, FileCacheEntry, ValueCache};
pub use compiler::{CallbackCompiler, Compiler, CompilerFactory, CompilerItem};
pub use context::{CompilerContext, RunOutcome, RunState};
pub use dependency::{DependencyCollection, DependencyNode};
pub use error::{CompilerError, CompilerResult};
pub use factory::{
    basic_compilers_factory, config_plugins_factory, CompilerRegistry, DescribedCompilerFactory,
};
pub use logger::{LogLevel, LogRecord, Logger, SilentLogger, TracingLogger, Verbosity};
pub use parameters::ContextParameters;
pub use source::{
    PackageOrder, PathComparison, Pattern, PatternMode, SearchBanks, SourceCodeManager,
    SourceFile, SourceQuery,
};

// Re-export configuration types for convenience
pub use skyline_config::{CompilerConfiguration, CompilerDescription, Config, Project};
