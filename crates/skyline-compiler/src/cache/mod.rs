//! Caches shared between compiler units
//!
//! - [`ValueCache`]: in-memory results published by one unit for later units
//! - [`FileCache`]: modification-time cache persisted next to the project

pub mod file;
pub mod value;

pub use file::{FileCache, FileCacheEntry};
pub use value::ValueCache;
