/// File selection for a directory scan.
///
/// Two independent rules decide whether a walked entry becomes a task:
///
/// 1. **Directory blocklist**: build output, VCS metadata and documentation
///    trees are pruned by exact directory name unless the user opts out.
/// 2. **File filters**: with the default filter list (`*.*` alone) only files
///    carrying a C, C++ or CUDA suffix are selected. Any other filter list is
///    matched as globs against the whole path (`*` may cross `/`), minus any
///    path matching an exclude glob.
use glob::Pattern;
use std::path::Path;

use crate::errors::{SearchError, SearchResult};

/// Directory names skipped during a walk
pub const IGNORED_DIRS: [&str; 34] = [
    ".git",
    ".github",
    "build",
    "node_modules",
    ".vscode",
    ".DS_Store",
    "debugPublic",
    "DebugPublic",
    "debug",
    "Debug",
    "Release",
    "release",
    "Releases",
    "releases",
    "cmake-build-debug",
    "__pycache__",
    "Binaries",
    "Doc",
    "doc",
    "Documentation",
    "docs",
    "Docs",
    "bin",
    "Bin",
    "patches",
    "tar-install",
    "CMakeFiles",
    "install",
    "snap",
    "LICENSES",
    "img",
    "images",
    "imgs",
    ".cache",
];

/// Suffixes selected by the default filter
pub const SOURCE_SUFFIXES: [&str; 10] = [
    ".c", ".h", ".cpp", ".cc", ".cxx", ".hh", ".hxx", ".hpp", ".cu", ".cuh",
];

/// The filter list that selects by [`SOURCE_SUFFIXES`]
pub const DEFAULT_FILTER: &str = "*.*";

/// Checks if a directory entry name is on the blocklist
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Checks if a path ends with one of the C/C++/CUDA suffixes
pub fn is_whitelisted(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    SOURCE_SUFFIXES.iter().any(|suffix| path_str.ends_with(suffix))
}

/// Compiled include/exclude rules
#[derive(Debug, Clone)]
pub struct FileSelector {
    filters: Vec<Pattern>,
    excludes: Vec<Pattern>,
    whitelist_only: bool,
}

impl FileSelector {
    /// Compiles the glob lists; a malformed glob is an argument error
    pub fn new(filters: &[String], excludes: &[String]) -> SearchResult<Self> {
        let whitelist_only =
            filters.is_empty() || (filters.len() == 1 && filters[0] == DEFAULT_FILTER);

        Ok(Self {
            filters: if whitelist_only { Vec::new() } else { compile(filters)? },
            excludes: compile(excludes)?,
            whitelist_only,
        })
    }

    /// Decides whether a regular file becomes a scan task.
    ///
    /// Excludes apply in both modes.
    pub fn selects(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        let included = if self.whitelist_only {
            is_whitelisted(path)
        } else {
            self.filters.iter().any(|p| p.matches(&path_str))
        };
        included && !self.excludes.iter().any(|p| p.matches(&path_str))
    }
}

fn compile(globs: &[String]) -> SearchResult<Vec<Pattern>> {
    globs
        .iter()
        .map(|glob| {
            Pattern::new(glob)
                .map_err(|e| SearchError::invalid_pattern(format!("{}: {}", glob, e)))
        })
        .collect()
}
