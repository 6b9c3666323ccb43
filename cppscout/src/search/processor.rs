use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::engine::FileTask;
use super::policy::{evaluate, Decision};
use super::prefilter::Prefilter;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::ScanMetrics;
use crate::query::Query;
use crate::results::{FileResult, SnippetMatch};
use crate::syntax::{SourceParser, VisitAction};

// Constants for file loading
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Bytes of one source file, either owned or memory mapped
pub enum FileContent {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for FileContent {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileContent::Owned(bytes) => bytes,
            FileContent::Mapped(mmap) => mmap,
        }
    }
}

impl FileContent {
    pub fn empty() -> Self {
        FileContent::Owned(Vec::new())
    }
}

/// Loads a file, choosing the strategy from its size
pub fn load_file(path: &Path, metrics: &ScanMetrics) -> SearchResult<FileContent> {
    let size = path
        .metadata()
        .map_err(|e| SearchError::from_io(path, e))?
        .len();
    metrics.record_load(size);

    if size < SMALL_FILE_THRESHOLD {
        trace!("Reading small file: {}", path.display());
        return std::fs::read(path)
            .map(FileContent::Owned)
            .map_err(|e| SearchError::from_io(path, e));
    }

    let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

    if size >= LARGE_FILE_THRESHOLD {
        // SAFETY: the map is read-only and dropped before the task ends; a
        // concurrent truncation by another process is outside our control, as
        // with any mmap-based reader.
        let mmap = unsafe { Mmap::map(&file) }.map_err(SearchError::IoError)?;
        return Ok(FileContent::Mapped(mmap));
    }

    let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
    let mut bytes = Vec::with_capacity(size as usize);
    reader
        .read_to_end(&mut bytes)
        .map_err(SearchError::IoError)?;
    Ok(FileContent::Owned(bytes))
}

/// Runs the per-file pipeline: load, prefilter, parse, visit
pub struct FileProcessor {
    query: Arc<Query>,
    prefilter: Prefilter,
    parser: Arc<dyn SourceParser>,
    metrics: ScanMetrics,
}

impl FileProcessor {
    pub fn new(query: Arc<Query>, parser: Arc<dyn SourceParser>, metrics: ScanMetrics) -> Self {
        let prefilter = Prefilter::new(query.literal_bytes());
        Self {
            query,
            prefilter,
            parser,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Searches one file.
    ///
    /// Unreadable files are searched as empty. A parser failure is returned as
    /// an error for the caller to log; a failed traversal keeps the matches
    /// collected before it stopped.
    pub fn process_file(&self, task: &FileTask) -> SearchResult<FileResult> {
        let path = task.path.as_path();
        let mut result = FileResult::new(task.path.clone());

        let content = load_file(path, &self.metrics).unwrap_or_else(|e| {
            debug!("Searching {} as empty: {}", path.display(), e);
            FileContent::empty()
        });

        if !self.prefilter.matches(&content) {
            return Ok(result);
        }
        self.metrics.record_prefilter_hit();
        debug!("Checking {}", path.display());

        let tree = match self.parser.parse(path, &content, &task.flags) {
            Ok(tree) => {
                self.metrics.record_parse(true);
                tree
            }
            Err(e) => {
                self.metrics.record_parse(false);
                return Err(e);
            }
        };

        let filename = path.display().to_string();
        let visited = tree.visit(&mut |node| {
            if let Decision::Accept(window) = evaluate(node, &self.query, &content) {
                if let Some(category) = node.category {
                    result.matches.push(SnippetMatch {
                        filename: filename.clone(),
                        snippet: String::from_utf8_lossy(window.text(&content)).into_owned(),
                        start_line: window.start_line,
                        end_line: window.end_line,
                        category,
                    });
                }
            }
            VisitAction::Recurse
        });

        if let Err(e) = visited {
            warn!("{}; keeping {} matches found so far", e, result.matches.len());
        }

        self.metrics.record_matches(result.matches.len() as u64);
        Ok(result)
    }
}
