//! Shell-style file name patterns

use crate::error::{CompilerError, CompilerResult};
use regex::{Regex, RegexBuilder};
use std::ops::BitOr;
use std::path::Path;

/// Kinds of filesystem entries a [`Pattern`] accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMode(u8);

impl PatternMode {
    pub const FILES: Self = Self(1 << 0);
    pub const DIRECTORIES: Self = Self(1 << 1);
    pub const SYMLINKS: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PatternMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Default for PatternMode {
    fn default() -> Self {
        Self::FILES | Self::DIRECTORIES
    }
}

/// Wildcard pattern (`*`, `?`, `[...]`) matched against base names
#[derive(Debug, Clone)]
pub struct Pattern {
    format: String,
    mode: PatternMode,
    case_sensitive: bool,
    regex: Regex,
}

impl Pattern {
    /// Case-insensitive pattern accepting files and directories
    pub fn new(format: &str) -> CompilerResult<Self> {
        Self::with_options(format, PatternMode::default(), false)
    }

    pub fn with_options(format: &str, mode: PatternMode, case_sensitive: bool) -> CompilerResult<Self> {
        let regex = RegexBuilder::new(&wildcard_to_regex(format))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| CompilerError::InvalidPattern {
                pattern: format.to_string(),
                error: e.to_string(),
            })?;

        Ok(Self {
            format: format.to_string(),
            mode,
            case_sensitive,
            regex,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Match a base name without touching the filesystem
    pub fn matches_name(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Match an existing path whose kind is accepted by the mode
    pub fn matches(&self, path: &Path) -> bool {
        let is_link = path
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        let accepted = (path.is_file() && self.mode.contains(PatternMode::FILES))
            || (is_link && self.mode.contains(PatternMode::SYMLINKS))
            || (path.is_dir() && self.mode.contains(PatternMode::DIRECTORIES));

        accepted
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| self.matches_name(name))
    }
}

/// Translate a wildcard expression into an anchored regex
fn wildcard_to_regex(format: &str) -> String {
    let mut regex = String::with_capacity(format.len() * 2 + 2);
    regex.push('^');

    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    class.push('^');
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' || inner == '[' {
                        class.push('\\');
                    }
                    class.push(inner);
                }
                if closed && !class.is_empty() && class != "^" {
                    regex.push('[');
                    regex.push_str(&class);
                    regex.push(']');
                } else {
                    // unterminated class matches literally
                    regex.push_str(&regex::escape("["));
                    regex.push_str(&regex::escape(class.trim_start_matches('^')));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }

    regex.push('$');
    regex
}
