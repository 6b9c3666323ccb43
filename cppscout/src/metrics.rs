use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::search::processor::{LARGE_FILE_THRESHOLD, SMALL_FILE_THRESHOLD};

/// Counters shared by every worker of one scan
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    files_queued: Arc<AtomicU64>,
    bytes_loaded: Arc<AtomicU64>,
    prefilter_hits: Arc<AtomicU64>,
    files_parsed: Arc<AtomicU64>,
    parse_failures: Arc<AtomicU64>,
    matches: Arc<AtomicU64>,

    // Loading strategy
    small_files: Arc<AtomicU64>,
    buffered_files: Arc<AtomicU64>,
    mmap_files: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            files_queued: Arc::new(AtomicU64::new(0)),
            bytes_loaded: Arc::new(AtomicU64::new(0)),
            prefilter_hits: Arc::new(AtomicU64::new(0)),
            files_parsed: Arc::new(AtomicU64::new(0)),
            parse_failures: Arc::new(AtomicU64::new(0)),
            matches: Arc::new(AtomicU64::new(0)),
            small_files: Arc::new(AtomicU64::new(0)),
            buffered_files: Arc::new(AtomicU64::new(0)),
            mmap_files: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_queued(&self) {
        self.files_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a loaded file and which loading strategy its size selects
    pub fn record_load(&self, size: u64) {
        self.bytes_loaded.fetch_add(size, Ordering::Relaxed);
        if size < SMALL_FILE_THRESHOLD {
            self.small_files.fetch_add(1, Ordering::Relaxed);
        } else if size >= LARGE_FILE_THRESHOLD {
            self.mmap_files.fetch_add(1, Ordering::Relaxed);
            debug!("Memory mapped {} bytes", size);
        } else {
            self.buffered_files.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_prefilter_hit(&self) {
        self.prefilter_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse(&self, ok: bool) {
        if ok {
            self.files_parsed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.parse_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_matches(&self, count: u64) {
        self.matches.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            files_queued: self.files_queued.load(Ordering::Relaxed),
            bytes_loaded: self.bytes_loaded.load(Ordering::Relaxed),
            prefilter_hits: self.prefilter_hits.load(Ordering::Relaxed),
            files_parsed: self.files_parsed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            small_files: self.small_files.load(Ordering::Relaxed),
            buffered_files: self.buffered_files.load(Ordering::Relaxed),
            mmap_files: self.mmap_files.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Files queued: {}\n\
             Bytes loaded: {}\n\
             Prefilter hits: {}\n\
             Files parsed/failed: {}/{}\n\
             Matches: {}\n\
             Files loaded (small/buffered/mmap): {}/{}/{}",
            stats.files_queued,
            stats.bytes_loaded,
            stats.prefilter_hits,
            stats.files_parsed,
            stats.parse_failures,
            stats.matches,
            stats.small_files,
            stats.buffered_files,
            stats.mmap_files
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_queued: u64,
    pub bytes_loaded: u64,
    pub prefilter_hits: u64,
    pub files_parsed: u64,
    pub parse_failures: u64,
    pub matches: u64,
    pub small_files: u64,
    pub buffered_files: u64,
    pub mmap_files: u64,
}
