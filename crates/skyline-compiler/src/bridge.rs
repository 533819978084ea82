//! Error-to-logger bridge and the active-run handle
//!
//! While a run is in progress the thread carries two scoped pieces of state:
//! the panic capture slot used to report panics raised inside compiler units,
//! and the [`ActiveRun`] handle describing the unit being executed. Both are
//! cleared by their guards when the run ends, whatever way it ends.

use crate::logger::Logger;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, PanicHookInfo};
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Severity of a runtime diagnostic raised by a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Notice,
    Deprecated,
    Warning,
    Error,
}

impl Severity {
    /// Forward a diagnostic to the matching logger channel
    pub fn log(self, logger: &dyn Logger, message: &str, origin: Option<&str>) {
        match self {
            Self::Notice => logger.log_notice(message, origin),
            Self::Deprecated | Self::Warning => logger.log_warning(message, origin),
            Self::Error => logger.log_error(message, origin),
        }
    }
}

/// Snapshot of the run in progress on this thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    pub project_root: PathBuf,
    pub compiler_id: Option<String>,
}

thread_local! {
    static BRIDGED: Cell<bool> = const { Cell::new(false) };
    static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
    static ACTIVE_RUN: RefCell<Option<ActiveRun>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// Install the process-wide hook once; it only acts on bridged threads
fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if BRIDGED.with(Cell::get) {
                let location = info
                    .location()
                    .map(|l| format!("{}:{}", l.file(), l.line()));
                PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

/// Scoped error bridge; panics on this thread are captured until dropped
#[derive(Debug)]
pub struct ErrorBridge {
    was_bridged: bool,
}

impl ErrorBridge {
    pub fn install() -> Self {
        install_hook();
        let was_bridged = BRIDGED.with(|b| b.replace(true));
        Self { was_bridged }
    }

    /// Take the location captured for the last intercepted panic
    pub fn take_panic_location() -> Option<String> {
        PANIC_LOCATION.with(|slot| slot.borrow_mut().take())
    }

    /// Check whether the current thread is bridged
    pub fn is_installed() -> bool {
        BRIDGED.with(Cell::get)
    }
}

impl Drop for ErrorBridge {
    fn drop(&mut self) {
        BRIDGED.with(|b| b.set(self.was_bridged));
        PANIC_LOCATION.with(|slot| slot.borrow_mut().take());
    }
}

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Guard publishing the active-run handle for the current thread
#[derive(Debug)]
pub struct ActiveRunGuard {
    previous: Option<ActiveRun>,
}

impl ActiveRunGuard {
    pub fn enter(project_root: &Path) -> Self {
        let previous = ACTIVE_RUN.with(|slot| {
            slot.borrow_mut().replace(ActiveRun {
                project_root: project_root.to_path_buf(),
                compiler_id: None,
            })
        });
        Self { previous }
    }

    /// Record the unit currently being executed
    pub fn set_compiler(&self, id: Option<&str>) {
        ACTIVE_RUN.with(|slot| {
            if let Some(run) = slot.borrow_mut().as_mut() {
                run.compiler_id = id.map(str::to_string);
            }
        });
    }
}

impl Drop for ActiveRunGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_RUN.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// The run in progress on this thread, if any
pub fn active_run() -> Option<ActiveRun> {
    ACTIVE_RUN.with(|slot| slot.borrow().clone())
}
