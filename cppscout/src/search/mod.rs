/// Directory scanning.
///
/// A scan walks every configured path, turns each selected file into a
/// [`FileTask`] and pushes it onto a fixed-size [`pool::TaskPool`]. A worker
/// loads the file, runs the literal [`prefilter`] over the raw bytes and only
/// on a hit asks the parser backend for a tree. The tree is visited pre-order
/// and every node goes through [`policy::evaluate`]; accepted nodes become
/// snippets in visitation order and the file's matches are handed to the
/// result sink as one block.
///
/// ```rust,ignore
/// let config = SearchConfig { query: "Widget".into(), ..SearchConfig::default() };
/// let sink: Arc<dyn ResultSink> = Arc::new(TerminalSink::stdout(true));
/// let summary = search_with(&config, Arc::new(CppParser::new()), Some(sink))?;
/// println!("{} matches", summary.total_matches);
/// ```
pub mod engine;
pub mod policy;
pub mod pool;
pub mod prefilter;
pub mod processor;

pub use engine::{search, search_with, FileTask};
pub use policy::{evaluate, Decision, SnippetWindow};
pub use pool::TaskPool;
pub use prefilter::Prefilter;
pub use processor::FileProcessor;
