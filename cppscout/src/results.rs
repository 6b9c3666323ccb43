/// Search result types.
///
/// A [`SnippetMatch`] is one accepted node rendered to text; a [`FileResult`]
/// holds every match from one file in visitation order; [`SearchResult`]
/// aggregates the files of a whole scan. Snippets are stored as plain text and
/// only coloured at output time, so the same values serve both the terminal
/// and the JSON sinks.
use serde::Serialize;
use std::path::PathBuf;

use crate::query::Category;

/// One accepted node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetMatch {
    /// Path of the file as it was walked
    pub filename: String,
    /// Raw snippet text (lossily decoded when the file is not UTF-8)
    pub snippet: String,
    /// 1-based first line of the snippet
    pub start_line: u32,
    /// 1-based last line of the snippet
    pub end_line: u32,
    #[serde(skip)]
    pub category: Category,
}

/// All matches found in a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    pub path: PathBuf,
    pub matches: Vec<SnippetMatch>,
}

impl FileResult {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            matches: Vec::new(),
        }
    }
}

/// The complete results of a scan
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Per-file results; order across files is the order workers finished
    pub file_results: Vec<FileResult>,
    pub total_matches: usize,
    pub files_searched: usize,
    pub files_with_matches: usize,
    /// Files skipped because the parser could not produce a tree
    pub files_failed: usize,
}

impl SearchResult {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a file result to the search results
    pub fn add_file_result(&mut self, file_result: FileResult) {
        self.files_searched += 1;
        if !file_result.matches.is_empty() {
            self.total_matches += file_result.matches.len();
            self.files_with_matches += 1;
            self.file_results.push(file_result);
        }
    }

    pub fn record_failure(&mut self) {
        self.files_searched += 1;
        self.files_failed += 1;
    }

    /// Every match of the scan, file by file
    pub fn matches(&self) -> impl Iterator<Item = &SnippetMatch> {
        self.file_results.iter().flat_map(|fr| fr.matches.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(file: &str, line: u32) -> SnippetMatch {
        SnippetMatch {
            filename: file.to_string(),
            snippet: "struct Foo {}".to_string(),
            start_line: line,
            end_line: line,
            category: Category::Struct,
        }
    }

    #[test]
    fn test_search_result_add_file_result() {
        let mut result = SearchResult::new();

        let mut with_matches = FileResult::new(PathBuf::from("a.cpp"));
        with_matches.matches.push(snippet("a.cpp", 1));
        with_matches.matches.push(snippet("a.cpp", 4));
        result.add_file_result(with_matches);

        assert_eq!(result.total_matches, 2);
        assert_eq!(result.files_searched, 1);
        assert_eq!(result.files_with_matches, 1);

        result.add_file_result(FileResult::new(PathBuf::from("b.cpp")));
        assert_eq!(result.total_matches, 2);
        assert_eq!(result.files_searched, 2);
        assert_eq!(result.files_with_matches, 1);
        assert_eq!(result.file_results.len(), 1);
    }

    #[test]
    fn test_snippet_serializes_without_category() {
        let json = serde_json::to_value(snippet("a.cpp", 7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filename": "a.cpp",
                "snippet": "struct Foo {}",
                "start_line": 7,
                "end_line": 7
            })
        );
    }
}
