pub mod config;
pub mod errors;
pub mod filters;
pub mod highlight;
pub mod metrics;
pub mod output;
pub mod query;
pub mod results;
pub mod search;
pub mod syntax;

pub use config::SearchConfig;
pub use errors::{SearchError, SearchResult};
pub use highlight::Highlighter;
pub use output::{JsonSink, ResultSink, TerminalSink};
pub use query::{Category, CategorySet, Query};
pub use results::{FileResult, SearchResult as SearchOutput, SnippetMatch};
pub use search::{search, search_with};
pub use syntax::CppParser;
