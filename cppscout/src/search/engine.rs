use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::pool::TaskPool;
use super::processor::FileProcessor;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters::{is_ignored_dir, FileSelector};
use crate::metrics::ScanMetrics;
use crate::output::ResultSink;
use crate::results::SearchResult as SearchOutput;
use crate::syntax::{CppParser, SourceParser};

/// Include paths appended to every file's flags
const SYSTEM_INCLUDE_DIRS: [&str; 2] = ["/usr/include", "/usr/local/include"];

/// One file to search with the compiler flags resolved for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    pub flags: Vec<String>,
}

impl FileTask {
    pub fn new(path: PathBuf, base_flags: &[String]) -> Self {
        let flags = file_flags(base_flags, &path);
        Self { path, flags }
    }
}

/// Flags shared by every file under `root`: language, standard and include dirs
pub fn resolve_base_flags(config: &SearchConfig, root: &Path) -> Vec<String> {
    let mut flags = vec!["-x".to_string(), config.language.clone()];
    if config.language == "c++" {
        flags.push(format!("-std={}", config.std));
    }
    flags.extend(
        config
            .include_dirs
            .iter()
            .map(|dir| format!("-I{}", dir.display())),
    );

    let discovered = discover_include_dirs(&include_search_root(root), config.no_ignore_dirs);
    debug!("Discovered {} include directories near {}", discovered.len(), root.display());
    flags.extend(discovered.iter().map(|dir| format!("-I{}", dir.display())));
    flags
}

/// Appends the file's parent, grandparent and the system include paths
pub fn file_flags(base_flags: &[String], path: &Path) -> Vec<String> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let grandparent = parent.parent().unwrap_or_else(|| Path::new(""));

    let mut flags = base_flags.to_vec();
    flags.push(format!("-I{}", parent.display()));
    flags.push(format!("-I{}", grandparent.display()));
    flags.extend(SYSTEM_INCLUDE_DIRS.iter().map(|dir| format!("-I{}", dir)));
    flags
}

/// Directory whose subtree is searched for `*include` directories
fn include_search_root(root: &Path) -> PathBuf {
    if root == Path::new(".") {
        return PathBuf::from(".");
    }
    match root.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Every directory under `base` whose name ends with `include`, sorted
pub fn discover_include_dirs(base: &Path, no_ignore_dirs: bool) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = walker(base, no_ignore_dirs)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.depth() > 0 && entry.file_type().is_some_and(|ft| ft.is_dir()))
        .filter(|entry| entry.file_name().to_string_lossy().ends_with("include"))
        .map(|entry| entry.into_path())
        .collect();
    dirs.sort();
    dirs
}

/// A plain recursive walk: no ignore files, hidden entries included, symlinks
/// not followed, blocklisted directories pruned unless disabled
fn walker(root: &Path, no_ignore_dirs: bool) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(false);
    if !no_ignore_dirs {
        builder.filter_entry(|entry| {
            !(entry.depth() > 0
                && entry.file_type().is_some_and(|ft| ft.is_dir())
                && entry.file_name().to_str().is_some_and(is_ignored_dir))
        });
    }
    builder
}

/// Performs a concurrent search with the tree-sitter backend, collecting results
/// without printing them
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutput> {
    search_with(config, Arc::new(CppParser::new()), None)
}

/// Performs a concurrent search across every configured path.
///
/// Each selected file becomes one task on a pool of `thread_count` workers.
/// A task that finds matches hands them to `sink` as one block. The call
/// returns once every task has finished.
pub fn search_with(
    config: &SearchConfig,
    parser: Arc<dyn SourceParser>,
    sink: Option<Arc<dyn ResultSink>>,
) -> SearchResult<SearchOutput> {
    let start = Instant::now();
    let query = Arc::new(config.build_query());
    info!(
        "Starting search for {:?} in {:?} (categories: {:?})",
        query.literal,
        config.paths,
        query.categories.categories().map(|c| c.name()).collect::<Vec<_>>()
    );

    for path in &config.paths {
        if !path.is_file() && !path.is_dir() {
            return Err(SearchError::invalid_path(path));
        }
    }
    let selector = FileSelector::new(&config.filters, &config.excludes)?;

    let metrics = ScanMetrics::new();
    let processor = Arc::new(FileProcessor::new(query, parser, metrics.clone()));
    let output = Arc::new(Mutex::new(SearchOutput::new()));
    let pool = TaskPool::new(config.thread_count);

    let submit = |task: FileTask| {
        metrics.record_queued();
        let processor = Arc::clone(&processor);
        let output = Arc::clone(&output);
        let sink = sink.clone();
        pool.push(move || run_task(&processor, &task, sink.as_deref(), &output));
    };

    for root in &config.paths {
        let base_flags = resolve_base_flags(config, root);
        debug!("Compiler flags for {}: {}", root.display(), base_flags.join(" "));

        if root.is_file() {
            submit(FileTask::new(root.clone(), &base_flags));
            continue;
        }

        for entry in walker(root, config.no_ignore_dirs).build() {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_some_and(|ft| ft.is_file())
                        && selector.selects(entry.path())
                    {
                        submit(FileTask::new(entry.into_path(), &base_flags));
                    }
                }
                Err(e) => debug!("Skipping unreadable entry: {}", e),
            }
        }
    }

    pool.wait();

    if let Some(sink) = &sink {
        if let Err(e) = sink.finish() {
            warn!("Failed to finish output: {}", e);
        }
    }
    metrics.log_stats();

    let result = std::mem::take(&mut *output.lock().unwrap_or_else(PoisonError::into_inner));
    info!(
        "Search complete. Found {} matches in {} of {} files ({} skipped) in {}",
        result.total_matches,
        result.files_with_matches,
        result.files_searched,
        result.files_failed,
        humantime::format_duration(start.elapsed())
    );

    Ok(result)
}

fn run_task(
    processor: &FileProcessor,
    task: &FileTask,
    sink: Option<&dyn ResultSink>,
    output: &Mutex<SearchOutput>,
) {
    match processor.process_file(task) {
        Ok(result) => {
            if let Some(sink) = sink.filter(|_| !result.matches.is_empty()) {
                if let Err(e) = sink.write_file(&result) {
                    warn!("Failed to write results for {}: {}", task.path.display(), e);
                }
            }
            output
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .add_file_result(result);
        }
        Err(e) => {
            warn!("Skipping {}: {}", task.path.display(), e);
            output
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record_failure();
        }
    }
}
