//! Result sinks: the terminal printer and the JSON collector.
//!
//! Sinks are shared by every scan worker. Each call to
//! [`ResultSink::write_file`] hands over all matches of one file, and a sink
//! writes them as one block so output from different files never interleaves.

use colored::Colorize;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::highlight::Highlighter;
use crate::results::{FileResult, SnippetMatch};

pub trait ResultSink: Send + Sync {
    /// Emits every match of one file
    fn write_file(&self, result: &FileResult) -> io::Result<()>;

    /// Called once after the scan barrier
    fn finish(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Human-readable output: a header per match followed by the coloured snippet
pub struct TerminalSink<W: Write + Send> {
    out: Mutex<W>,
    highlighter: Highlighter,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            highlighter: Highlighter::new(color),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Formats one file's block
    pub fn render(&self, result: &FileResult) -> String {
        let mut block = String::new();
        for m in &result.matches {
            let header = format!(
                "// {} (Line: {} to {})",
                m.filename, m.start_line, m.end_line
            );
            if self.highlighter.is_enabled() {
                block.push_str(&header.bright_black().bold().to_string());
            } else {
                block.push_str(&header);
            }
            block.push('\n');
            block.push_str(&self.highlighter.colorize(&m.snippet));
            block.push_str("\n\n");
        }
        block
    }
}

impl<W: Write + Send> ResultSink for TerminalSink<W> {
    fn write_file(&self, result: &FileResult) -> io::Result<()> {
        if result.matches.is_empty() {
            return Ok(());
        }
        let block = self.render(result);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(block.as_bytes())?;
        out.flush()
    }
}

/// Collects matches for a single JSON array printed after the scan
#[derive(Default)]
pub struct JsonSink {
    matches: Mutex<Vec<SnippetMatch>>,
}

impl JsonSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `[{filename, snippet, start_line, end_line}, ...]`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&*self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SnippetMatch>> {
        self.matches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultSink for JsonSink {
    fn write_file(&self, result: &FileResult) -> io::Result<()> {
        self.lock().extend(result.matches.iter().cloned());
        Ok(())
    }
}
