//! Interface to the source-analysis backend.
//!
//! A backend turns source bytes into a tree and walks it pre-order, handing
//! each node to a typed visitor that decides whether to descend, skip the
//! node's children, or stop.

pub mod cpp;

use std::path::Path;

use crate::errors::SearchResult;
use crate::query::Category;

pub use cpp::CppParser;

/// Bias applied to the byte offsets a backend reports.
///
/// Ranges are reported with both ends shifted up by this amount and the match
/// policy subtracts it again before slicing the file buffer.
pub const REPORTED_OFFSET_BIAS: usize = 2;

/// Decision returned from a visitor for the node it was just given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitAction {
    /// Skip this node's children and move on to its next sibling
    Continue,
    /// Descend into this node's children
    Recurse,
    /// End the traversal
    Stop,
}

/// One node as seen by a visitor; borrowed from the tree and source buffer and
/// only valid for the duration of a single callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitedNode<'a> {
    /// `None` for nodes outside every searchable category
    pub category: Option<Category>,
    /// Spelling of the declared or referenced entity
    pub name: &'a [u8],
    /// Reported begin offset, biased by [`REPORTED_OFFSET_BIAS`]
    pub begin_offset: usize,
    /// Reported end offset, biased by [`REPORTED_OFFSET_BIAS`]
    pub end_offset: usize,
    /// 1-based
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl<'a> VisitedNode<'a> {
    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }
}

/// Visitor callback handed to [`SyntaxTree::visit`]
pub type Visitor<'v> = dyn FnMut(&VisitedNode<'_>) -> VisitAction + 'v;

/// A parsed file. Dropping it releases every backend resource.
pub trait SyntaxTree {
    /// Walks the tree pre-order (parent before children, depth first)
    fn visit(&self, visitor: &mut Visitor<'_>) -> SearchResult<()>;
}

/// Produces syntax trees from source text plus compiler-style flags
pub trait SourceParser: Send + Sync {
    fn parse<'s>(
        &self,
        path: &Path,
        source: &'s [u8],
        flags: &[String],
    ) -> SearchResult<Box<dyn SyntaxTree + 's>>;
}
