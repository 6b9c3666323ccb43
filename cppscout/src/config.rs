use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};
use crate::filters::DEFAULT_FILTER;
use crate::query::{Category, CategorySet, Query};

/// Default number of scan workers
pub const DEFAULT_THREAD_COUNT: usize = 5;

/// Settings for one scan, merged from configuration files and the command line.
///
/// # Configuration Locations
///
/// Files are layered in increasing order of precedence:
/// 1. Global `$XDG_CONFIG_HOME/cppscout/config.yaml`
/// 2. Local `.cppscout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line flags are applied on top by [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Literal to look for in declaration names
/// query: "Widget"
///
/// paths: ["src", "include"]
///
/// # Glob filters; "*.*" alone selects C/C++/CUDA sources by suffix
/// filters: ["*.*"]
/// excludes: ["*third_party*"]
///
/// # Categories to report; empty means every declaration and statement kind
/// categories: [class, struct, member-function]
/// include_expressions: false
///
/// exact_match: false
/// ignore_single_line: true
///
/// # Check the literal against the whole snippet, not just the name
/// match_snippet_text: false
///
/// thread_count: 8
/// include_dirs: ["/opt/boost/include"]
/// language: "c++"
/// std: "c++20"
///
/// color: true
/// json: false
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Literal matched against node names; empty matches everything
    pub query: String,

    /// Files or directories to scan
    pub paths: Vec<PathBuf>,

    /// Glob patterns a file path must match
    pub filters: Vec<String>,

    /// Glob patterns that remove a file from the scan
    pub excludes: Vec<String>,

    /// Walk into blocklisted directories such as `build` and `.git`
    pub no_ignore_dirs: bool,

    /// Number of scan workers
    pub thread_count: NonZeroUsize,

    /// Extra `-I` directories forwarded to the parser
    pub include_dirs: Vec<PathBuf>,

    /// Value of the `-x` parser flag
    pub language: String,

    /// Value of the `-std=` parser flag
    pub std: String,

    pub exact_match: bool,

    pub ignore_single_line: bool,

    /// Also report references to values, members and fields
    pub include_expressions: bool,

    /// Match the literal against the snippet text for every category
    pub match_snippet_text: bool,

    /// Enabled categories; empty selects [`CategorySet::default_declarations`]
    pub categories: Vec<Category>,

    pub color: bool,

    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: String::new(),
            paths: vec![PathBuf::from(".")],
            filters: vec![DEFAULT_FILTER.to_string()],
            excludes: Vec::new(),
            no_ignore_dirs: false,
            thread_count: default_thread_count(),
            include_dirs: Vec::new(),
            language: default_language(),
            std: default_std(),
            exact_match: false,
            ignore_single_line: false,
            include_expressions: false,
            match_snippet_text: false,
            categories: Vec::new(),
            color: true,
            json: false,
            log_level: default_log_level(),
        }
    }
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_THREAD_COUNT).unwrap_or(NonZeroUsize::MIN)
}

fn default_language() -> String {
    "c++".to_string()
}

fn default_std() -> String {
    "c++17".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus an explicit file
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        if let Some(path) = config_path {
            if !path.is_file() {
                return Err(SearchError::config_error(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
        }

        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("cppscout/config.yaml")),
            // Local config
            Some(PathBuf::from(".cppscout.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.is_file() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI arguments with configuration file values.
    ///
    /// A CLI value wins whenever it differs from the built-in default; boolean
    /// switches can only be turned on from the command line (or, for `color`,
    /// off).
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        let defaults = SearchConfig::default();

        if !cli_config.query.is_empty() {
            self.query = cli_config.query;
        }
        if cli_config.paths != defaults.paths {
            self.paths = cli_config.paths;
        }
        if cli_config.filters != defaults.filters {
            self.filters = cli_config.filters;
        }
        if !cli_config.excludes.is_empty() {
            self.excludes = cli_config.excludes;
        }
        if cli_config.thread_count != defaults.thread_count {
            self.thread_count = cli_config.thread_count;
        }
        if !cli_config.include_dirs.is_empty() {
            self.include_dirs = cli_config.include_dirs;
        }
        if cli_config.language != defaults.language {
            self.language = cli_config.language;
        }
        if cli_config.std != defaults.std {
            self.std = cli_config.std;
        }
        if !cli_config.categories.is_empty() {
            self.categories = cli_config.categories;
        }
        if cli_config.log_level != defaults.log_level {
            self.log_level = cli_config.log_level;
        }

        self.no_ignore_dirs |= cli_config.no_ignore_dirs;
        self.exact_match |= cli_config.exact_match;
        self.ignore_single_line |= cli_config.ignore_single_line;
        self.include_expressions |= cli_config.include_expressions;
        self.match_snippet_text |= cli_config.match_snippet_text;
        self.json |= cli_config.json;
        self.color &= cli_config.color;
        self
    }

    /// Resolves the enabled categories
    pub fn category_set(&self) -> CategorySet {
        let mut set = if self.categories.is_empty() {
            CategorySet::default_declarations()
        } else {
            self.categories.iter().copied().collect()
        };
        if self.include_expressions {
            set |= CategorySet::REFERENCE_EXPRESSION;
        }
        set
    }

    /// Builds the immutable query shared by every worker
    pub fn build_query(&self) -> Query {
        Query::new(self.query.clone(), self.category_set())
            .exact_match(self.exact_match)
            .ignore_single_line(self.ignore_single_line)
            .match_snippet_text(self.match_snippet_text)
    }
}
