/// Compiler pipeline error types
use std::path::PathBuf;
use thiserror::Error;

pub type CompilerResult<T> = Result<T, CompilerError>;

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Bad configuration: {0}")]
    BadConfiguration(String),

    #[error("Circular dependency detected at '{id}': {cycle}")]
    CircularDependency { id: String, cycle: String },

    #[error("Duplicate id '{0}' in dependency collection")]
    DuplicateId(String),

    #[error("File or directory {name} not found")]
    FileOrDirectoryNotFound { name: String, path: PathBuf },

    #[error("Invalid compiler type '{kind}' for compiler '{id}'")]
    InvalidCompilerType { id: String, kind: String },

    #[error("Invalid arguments for compiler '{id}': {reason}")]
    InvalidArguments { id: String, reason: String },

    #[error("Compilation failed in '{compiler}': {error}")]
    CompilationError { compiler: String, error: String },

    #[error("Compiler '{compiler}' panicked: {message}")]
    Panic { compiler: String, message: String },

    #[error("Invalid file name pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Bad configuration source {path}: {error}")]
    BadSource { path: PathBuf, error: String },

    #[error("File cache error: {0}")]
    CacheError(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] skyline_config::ConfigError),
}

impl CompilerError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a compilation error for a compiler id
    pub fn compilation(compiler: impl Into<String>, error: impl ToString) -> Self {
        Self::CompilationError {
            compiler: compiler.into(),
            error: error.to_string(),
        }
    }

    /// Create a missing file error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::FileOrDirectoryNotFound { name, path }
    }

    /// Create a bad configuration source error
    pub fn bad_source(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::BadSource {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an invalid arguments error
    pub fn invalid_arguments(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidArguments {
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}
