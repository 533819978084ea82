//! Source file discovery

pub mod file;
pub mod manager;
pub mod packages;
pub mod pattern;

pub use file::SourceFile;
pub use manager::{
    AcceptAll, PathComparison, SearchBanks, SourceCodeManager, SourceFilter, SourceQuery,
    DEFAULT_BANKS, SEARCH_PATH_SOURCES,
};
pub use packages::{ComposerPackage, PackageOrder, CACHE_PACKAGES_NAME};
pub use pattern::{Pattern, PatternMode};
