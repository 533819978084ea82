//! Logger sink used by compiler units
//!
//! Units never print directly; they report through the context's [`Logger`].
//! [`TracingLogger`] forwards to `tracing`, [`SilentLogger`] keeps records in
//! memory.

use crate::error::CompilerError;
use std::cell::RefCell;
use std::fmt;

/// Verbosity of a plain text message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    VeryVerbose,
    Debug,
}

/// Level of a logged record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Text(Verbosity),
    Notice,
    Warning,
    Error,
    Exception,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(_) => write!(f, "text"),
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Exception => write!(f, "exception"),
        }
    }
}

/// Sink for diagnostics produced during a run
///
/// `origin` is an optional location (file and line, or a compiler id) the
/// message relates to.
pub trait Logger {
    fn log_text(&self, text: &str, verbosity: Verbosity);

    fn log_notice(&self, message: &str, origin: Option<&str>);

    fn log_warning(&self, message: &str, origin: Option<&str>);

    fn log_error(&self, message: &str, origin: Option<&str>);

    /// Report a failure that aborted the run
    fn log_exception(&self, error: &CompilerError);
}

/// Logger forwarding every record to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_text(&self, text: &str, verbosity: Verbosity) {
        match verbosity {
            Verbosity::Normal => tracing::info!("{}", text),
            Verbosity::Verbose | Verbosity::VeryVerbose => tracing::debug!("{}", text),
            Verbosity::Debug => tracing::trace!("{}", text),
        }
    }

    fn log_notice(&self, message: &str, origin: Option<&str>) {
        tracing::info!(origin = origin.unwrap_or(""), "{}", message);
    }

    fn log_warning(&self, message: &str, origin: Option<&str>) {
        tracing::warn!(origin = origin.unwrap_or(""), "{}", message);
    }

    fn log_error(&self, message: &str, origin: Option<&str>) {
        tracing::error!(origin = origin.unwrap_or(""), "{}", message);
    }

    fn log_exception(&self, error: &CompilerError) {
        tracing::error!(error = %error, "compilation aborted");
    }
}

/// One record kept by [`SilentLogger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub origin: Option<String>,
}

/// Logger that stores records instead of emitting them
#[derive(Debug, Default)]
pub struct SilentLogger {
    records: RefCell<Vec<LogRecord>>,
}

impl SilentLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Messages logged at the given level
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(LogLevel::Warning)
    }

    pub fn exceptions(&self) -> Vec<String> {
        self.messages(LogLevel::Exception)
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    fn push(&self, level: LogLevel, message: &str, origin: Option<&str>) {
        self.records.borrow_mut().push(LogRecord {
            level,
            message: message.to_string(),
            origin: origin.map(str::to_string),
        });
    }
}

impl Logger for SilentLogger {
    fn log_text(&self, text: &str, verbosity: Verbosity) {
        self.push(LogLevel::Text(verbosity), text, None);
    }

    fn log_notice(&self, message: &str, origin: Option<&str>) {
        self.push(LogLevel::Notice, message, origin);
    }

    fn log_warning(&self, message: &str, origin: Option<&str>) {
        self.push(LogLevel::Warning, message, origin);
    }

    fn log_error(&self, message: &str, origin: Option<&str>) {
        self.push(LogLevel::Error, message, origin);
    }

    fn log_exception(&self, error: &CompilerError) {
        self.push(LogLevel::Exception, &error.to_string(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_logger_records_levels() {
        let logger = SilentLogger::new();
        logger.log_text("hello", Verbosity::Verbose);
        logger.log_warning("careful", Some("config.json"));
        logger.log_exception(&CompilerError::BadConfiguration("no project".into()));

        let records = logger.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].level, LogLevel::Text(Verbosity::Verbose));
        assert_eq!(records[1].origin.as_deref(), Some("config.json"));
        assert_eq!(logger.warnings(), vec!["careful".to_string()]);
        assert_eq!(
            logger.exceptions(),
            vec!["Bad configuration: no project".to_string()]
        );
    }

    #[test]
    fn test_clear() {
        let logger = SilentLogger::new();
        logger.log_notice("n", None);
        logger.clear();
        assert!(logger.records().is_empty());
    }
}
