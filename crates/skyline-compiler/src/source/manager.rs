//! Source code manager
//!
//! Source directories are grouped into named banks. The first query touching a
//! bank walks its roots once and memoizes the discovered files; every later
//! query only re-filters that index. Roots added to a bank after it was indexed
//! are not picked up by the index.

use crate::error::{CompilerError, CompilerResult};
use crate::logger::{Logger, Verbosity};
use crate::source::file::SourceFile;
use crate::source::packages::PackageOrder;
use regex::Regex;
use skyline_config::project::{SEARCH_PATH_CLASSES, SEARCH_PATH_MODULES, SEARCH_PATH_VENDOR};
use skyline_config::{CompilerConfiguration, Project};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

/// Bank holding the configured compiler source directories
pub const SEARCH_PATH_SOURCES: &str = "sources";

/// Banks queried when no selection is given
pub const DEFAULT_BANKS: [&str; 4] = [
    SEARCH_PATH_SOURCES,
    SEARCH_PATH_VENDOR,
    SEARCH_PATH_CLASSES,
    SEARCH_PATH_MODULES,
];

/// Bank selection of a query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchBanks {
    /// All default banks
    #[default]
    Default,
    /// Named banks; a name that is not a bank is used as a directory
    Only(Vec<String>),
    /// Alias names mapped to existing banks; an alias reuses their indices
    Mapped(Vec<(String, Vec<String>)>),
}

impl SearchBanks {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }
}

/// How "restrict to project" compares a file against the project root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathComparison {
    /// Canonical paths with symlinks resolved
    #[default]
    Real,
    /// Paths exactly as discovered
    Raw,
}

/// Inclusion predicate applied to every entry during a walk
///
/// Rejecting a directory prunes its whole subtree.
pub trait SourceFilter {
    fn should_include(&self, path: &Path, is_dir: bool) -> bool;
}

/// Default filter accepting everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl SourceFilter for AcceptAll {
    fn should_include(&self, _path: &Path, _is_dir: bool) -> bool {
        true
    }
}

impl<F> SourceFilter for F
where
    F: Fn(&Path, bool) -> bool,
{
    fn should_include(&self, path: &Path, is_dir: bool) -> bool {
        self(path, is_dir)
    }
}

#[derive(Debug, Default)]
struct Bank {
    roots: Vec<PathBuf>,
    files: Option<Vec<SourceFile>>,
}

/// Lazily indexed view over the project's source directories
pub struct SourceCodeManager {
    project_root: PathBuf,
    banks: HashMap<String, Bank>,
    filter: Box<dyn SourceFilter>,
    logger: Rc<dyn Logger>,
    excluded: Vec<PathBuf>,
    walks: usize,
    use_real_paths: bool,
    restrict_to_project: bool,
    comparison: PathComparison,
    respect_package_order: bool,
}

impl SourceCodeManager {
    /// Create a manager with the default banks of a project
    ///
    /// The `sources` bank holds the configured source directories, every search
    /// path list declared by the project becomes a bank of the same name.
    pub fn new(project: &Project, config: &CompilerConfiguration, logger: Rc<dyn Logger>) -> Self {
        let root = project.root_directory();
        let mut manager = Self {
            project_root: root.to_path_buf(),
            banks: HashMap::new(),
            filter: Box::new(AcceptAll),
            logger,
            excluded: Vec::new(),
            walks: 0,
            use_real_paths: false,
            restrict_to_project: false,
            comparison: PathComparison::default(),
            respect_package_order: false,
        };

        for name in DEFAULT_BANKS {
            manager.banks.entry(name.to_string()).or_default();
        }
        for dir in &config.source_dirs {
            manager.add_search_path(SEARCH_PATH_SOURCES, root.join(dir));
        }
        for name in project.search_paths().names() {
            for dir in project.search_paths().get(name) {
                manager.add_search_path(name, dir.clone());
            }
        }
        manager
    }

    /// Replace the inclusion predicate (affects banks indexed afterwards)
    pub fn set_filter(&mut self, filter: impl SourceFilter + 'static) {
        self.filter = Box::new(filter);
    }

    /// Key files by their real paths; drops the memoized index
    pub fn set_use_real_paths(&mut self, use_real_paths: bool) {
        if self.use_real_paths != use_real_paths {
            self.use_real_paths = use_real_paths;
            for bank in self.banks.values_mut() {
                bank.files = None;
            }
        }
    }

    pub fn uses_real_paths(&self) -> bool {
        self.use_real_paths
    }

    /// Only yield files inside the project root; returns the previous setting
    pub fn set_restrict_to_project(&mut self, restrict: bool) -> bool {
        std::mem::replace(&mut self.restrict_to_project, restrict)
    }

    pub fn restricts_to_project(&self) -> bool {
        self.restrict_to_project
    }

    pub fn set_path_comparison(&mut self, comparison: PathComparison) {
        self.comparison = comparison;
    }

    pub fn path_comparison(&self) -> PathComparison {
        self.comparison
    }

    /// Sort files of each bank by composer package precedence; returns the previous setting
    pub fn set_respect_package_order(&mut self, respect: bool) -> bool {
        std::mem::replace(&mut self.respect_package_order, respect)
    }

    pub fn respects_package_order(&self) -> bool {
        self.respect_package_order
    }

    /// Add a root directory to a bank, creating the bank if needed
    pub fn add_search_path(&mut self, bank: &str, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let entry = self.banks.entry(bank.to_string()).or_default();
        if entry.files.is_some() {
            tracing::debug!(bank, dir = %dir.display(), "bank already indexed, new root not walked");
        }
        if !entry.roots.contains(&dir) {
            entry.roots.push(dir);
        }
    }

    pub fn bank_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.banks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn bank_roots(&self, bank: &str) -> &[PathBuf] {
        self.banks
            .get(bank)
            .map(|b| b.roots.as_slice())
            .unwrap_or(&[])
    }

    /// Entries rejected by the inclusion predicate
    pub fn excluded_files(&self) -> &[PathBuf] {
        &self.excluded
    }

    /// Number of bank walks performed so far
    pub fn walk_count(&self) -> usize {
        self.walks
    }

    /// Query source files by base-name regex and bank selection
    ///
    /// Banks touched for the first time are walked before the query is returned;
    /// matching against `pattern` happens while iterating. A discovered entry
    /// that vanished or dangles fails the query with `FileOrDirectoryNotFound`.
    pub fn yield_source_files(
        &mut self,
        pattern: Option<&Regex>,
        banks: &SearchBanks,
        packages: Option<&PackageOrder>,
    ) -> CompilerResult<SourceQuery<'_>> {
        let names = self.resolve_banks(banks);
        for name in &names {
            self.index_bank(name)?;
        }

        let restriction = self.restrict_to_project.then(|| Restriction::new(&self.project_root, self.comparison));
        let order = if self.respect_package_order { packages } else { None };

        let lists: Vec<Vec<&SourceFile>> = names
            .iter()
            .filter_map(|name| self.banks.get(name))
            .map(|bank| {
                let mut files: Vec<&SourceFile> = bank.files.iter().flatten().collect();
                if let Some(order) = order {
                    files.sort_by_key(|file| order.rank(file.path()));
                }
                files
            })
            .collect();

        Ok(SourceQuery {
            files: lists.into_iter().flatten(),
            pattern: pattern.cloned(),
            restriction,
            seen: HashSet::new(),
        })
    }

    /// Whether a path lies inside one of the `modules` bank roots
    pub fn is_file_part_of_module(&self, path: &Path) -> bool {
        let real = path.canonicalize().ok();
        self.bank_roots(SEARCH_PATH_MODULES).iter().any(|root| {
            path.starts_with(root)
                || match (&real, root.canonicalize()) {
                    (Some(real), Ok(root)) => real.starts_with(root),
                    _ => false,
                }
        })
    }

    fn resolve_banks(&mut self, banks: &SearchBanks) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        match banks {
            SearchBanks::Default => {
                names.extend(DEFAULT_BANKS.iter().map(|n| n.to_string()));
            }
            SearchBanks::Only(list) => {
                for entry in list {
                    if !self.banks.contains_key(entry) {
                        let dir = self.project_root.join(entry);
                        self.add_search_path(entry, dir);
                    }
                    names.push(entry.clone());
                }
            }
            SearchBanks::Mapped(aliases) => {
                // An alias reads the memoized indices of its source banks
                for (alias, sources) in aliases {
                    tracing::trace!(alias = alias.as_str(), ?sources, "resolving bank alias");
                    for source in sources {
                        if !self.banks.contains_key(source) {
                            let dir = self.project_root.join(source);
                            self.add_search_path(source, dir);
                        }
                        names.push(source.clone());
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        names
    }

    fn index_bank(&mut self, name: &str) -> CompilerResult<()> {
        let roots = match self.banks.get(name) {
            Some(bank) if bank.files.is_none() => bank.roots.clone(),
            _ => return Ok(()),
        };

        self.walks += 1;
        tracing::debug!(bank = name, roots = roots.len(), "indexing source bank");

        let mut files = Vec::new();
        let mut keys = HashSet::new();
        for root in &roots {
            if !root.is_dir() {
                self.logger.log_warning(
                    &format!("Search path {} does not exist", root.display()),
                    Some(name),
                );
                continue;
            }
            for file in self.walk_root(root)? {
                if keys.insert(file.key().to_string()) {
                    files.push(file);
                }
            }
        }

        self.logger.log_text(
            &format!("Indexed {} source files in bank {}", files.len(), name),
            Verbosity::VeryVerbose,
        );
        if let Some(bank) = self.banks.get_mut(name) {
            bank.files = Some(files);
        }
        Ok(())
    }

    fn walk_root(&mut self, root: &Path) -> CompilerResult<Vec<SourceFile>> {
        let filter = &self.filter;
        let excluded = &mut self.excluded;
        let logger = &self.logger;
        let use_real_paths = self.use_real_paths;

        let walker = WalkDir::new(root)
            .follow_links(true)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let include = filter.should_include(entry.path(), entry.file_type().is_dir());
                if !include {
                    excluded.push(entry.path().to_path_buf());
                }
                include
            });

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push(SourceFile::with_real_paths(entry.path(), use_real_paths)?);
                }
                Ok(_) => {}
                Err(e) => match (e.path(), e.io_error().map(io::Error::kind)) {
                    (Some(path), Some(io::ErrorKind::NotFound)) => {
                        return Err(CompilerError::not_found(path));
                    }
                    _ => logger.log_warning(&format!("Walk error: {}", e), None),
                },
            }
        }
        Ok(files)
    }
}

#[derive(Debug, Clone)]
struct Restriction {
    root: PathBuf,
    comparison: PathComparison,
}

impl Restriction {
    fn new(root: &Path, comparison: PathComparison) -> Self {
        let root = match comparison {
            PathComparison::Real => root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            PathComparison::Raw => root.to_path_buf(),
        };
        Self { root, comparison }
    }

    fn allows(&self, file: &SourceFile) -> bool {
        match self.comparison {
            PathComparison::Raw => file.path().starts_with(&self.root),
            PathComparison::Real => file
                .path()
                .canonicalize()
                .map(|real| real.starts_with(&self.root))
                .unwrap_or(false),
        }
    }
}

/// Restartable view over a query result; re-run the query to iterate again
pub struct SourceQuery<'a> {
    files: std::iter::Flatten<std::vec::IntoIter<Vec<&'a SourceFile>>>,
    pattern: Option<Regex>,
    restriction: Option<Restriction>,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for SourceQuery<'a> {
    type Item = (&'a str, &'a SourceFile);

    fn next(&mut self) -> Option<Self::Item> {
        for file in self.files.by_ref() {
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(file.file_name()) {
                    continue;
                }
            }
            if let Some(restriction) = &self.restriction {
                if !restriction.allows(file) {
                    continue;
                }
            }
            if !self.seen.insert(file.key()) {
                continue;
            }
            return Some((file.key(), file));
        }
        None
    }
}
