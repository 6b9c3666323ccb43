//! Accept/reject decisions for visited nodes and snippet window resolution.
//!
//! Everything here is a pure function of the node, the query and the file
//! buffer, so the whole decision table is testable without a parser.

use tracing::trace;

use super::prefilter;
use crate::query::Query;
use crate::syntax::{VisitedNode, REPORTED_OFFSET_BIAS};

/// Resolved slice of the file buffer to display for one match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetWindow {
    pub offset: usize,
    pub len: usize,
    pub start_line: u32,
    pub end_line: u32,
}

impl SnippetWindow {
    pub fn text<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        &buffer[self.offset..self.offset + self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept(SnippetWindow),
    Reject,
}

impl Decision {
    pub fn window(self) -> Option<SnippetWindow> {
        match self {
            Decision::Accept(window) => Some(window),
            Decision::Reject => None,
        }
    }
}

/// Runs one node through the category, name, line and window checks.
///
/// `buffer` is the full contents of the file the node came from.
pub fn evaluate(node: &VisitedNode<'_>, query: &Query, buffer: &[u8]) -> Decision {
    let Some(category) = node.category else {
        return Decision::Reject;
    };
    if !query.categories.contains_category(category) {
        return Decision::Reject;
    }

    let literal = query.literal_bytes();
    let deferred = !literal.is_empty() && query.defers_to_snippet(category);
    if !literal.is_empty()
        && !deferred
        && !name_matches(node.name, literal, query, category.is_reference())
    {
        return Decision::Reject;
    }

    if node.end_line < node.start_line {
        return Decision::Reject;
    }
    if query.ignore_single_line && node.is_single_line() && !category.is_reference() {
        return Decision::Reject;
    }

    let window = if category.is_reference() {
        line_window(node, buffer)
    } else {
        extent_window(node, buffer)
    };
    let Some(window) = window else {
        return Decision::Reject;
    };

    if deferred && !prefilter::contains(window.text(buffer), literal) {
        return Decision::Reject;
    }

    trace!(
        "Accepted {} '{}' at lines {}-{}",
        category,
        String::from_utf8_lossy(node.name),
        window.start_line,
        window.end_line
    );
    Decision::Accept(window)
}

fn name_matches(name: &[u8], literal: &[u8], query: &Query, is_reference: bool) -> bool {
    if query.exact_match && !is_reference {
        name == literal
    } else {
        prefilter::contains(name, literal)
    }
}

/// Start of the window after removing the reported offset bias
fn corrected_begin(node: &VisitedNode<'_>, buffer: &[u8]) -> Option<usize> {
    let pos = node.begin_offset.checked_sub(REPORTED_OFFSET_BIAS)?;
    (pos < buffer.len()).then_some(pos)
}

/// The node's own extent
fn extent_window(node: &VisitedNode<'_>, buffer: &[u8]) -> Option<SnippetWindow> {
    let offset = corrected_begin(node, buffer)?;
    let count = node.end_offset.saturating_sub(node.begin_offset);

    Some(SnippetWindow {
        offset,
        len: count.min(buffer.len() - offset),
        start_line: node.start_line,
        end_line: node.end_line,
    })
}

/// The whole source line holding the node, without its indentation
fn line_window(node: &VisitedNode<'_>, buffer: &[u8]) -> Option<SnippetWindow> {
    let pos = corrected_begin(node, buffer)?;

    let mut start = buffer[..=pos]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |newline| newline + 1);
    while start < buffer.len() && matches!(buffer[start], b' ' | b'\t') {
        start += 1;
    }

    let end = buffer[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(buffer.len(), |newline| pos + newline);

    // An offset on a line break or a blank line leaves nothing to show
    if start >= end {
        return None;
    }

    Some(SnippetWindow {
        offset: start,
        len: end - start,
        start_line: node.start_line,
        end_line: node.end_line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Category, CategorySet};

    const BIAS: usize = REPORTED_OFFSET_BIAS;

    fn node<'a>(
        category: Category,
        name: &'a str,
        range: (usize, usize),
        lines: (u32, u32),
    ) -> VisitedNode<'a> {
        VisitedNode {
            category: Some(category),
            name: name.as_bytes(),
            begin_offset: range.0 + BIAS,
            end_offset: range.1 + BIAS,
            start_line: lines.0,
            start_column: 1,
            end_line: lines.1,
            end_column: 1,
        }
    }

    fn accepted(decision: Decision, buffer: &[u8]) -> Option<String> {
        decision
            .window()
            .map(|w| String::from_utf8_lossy(w.text(buffer)).into_owned())
    }

    const SOURCE: &str = "struct Foo { int x; };\nvoid bar() { Foo f; }\n";

    #[test]
    fn test_empty_query_accepts_every_node_of_enabled_category() {
        let buffer = SOURCE.as_bytes();
        let nodes = [
            node(Category::Struct, "Foo", (0, 21), (1, 1)),
            node(Category::Function, "bar", (23, 44), (2, 2)),
            node(Category::VariableDeclaration, "f", (36, 41), (2, 2)),
        ];
        let query = Query::new("", CategorySet::FUNCTION);

        let decisions: Vec<_> = nodes
            .iter()
            .map(|n| accepted(evaluate(n, &query, buffer), buffer))
            .collect();
        assert_eq!(
            decisions,
            vec![None, Some("void bar() { Foo f; }".to_string()), None]
        );
    }

    #[test]
    fn test_exact_match_requires_equal_name() {
        let buffer = b"class FooBar {};\nclass Foo {};\n";
        let nodes = [
            node(Category::Class, "FooBar", (0, 15), (1, 1)),
            node(Category::Class, "Foo", (17, 29), (2, 2)),
        ];

        let exact = Query::new("Foo", CategorySet::CLASS).exact_match(true);
        let results: Vec<bool> = nodes
            .iter()
            .map(|n| evaluate(n, &exact, buffer) != Decision::Reject)
            .collect();
        assert_eq!(results, vec![false, true]);

        let substring = Query::new("Foo", CategorySet::CLASS);
        assert!(nodes
            .iter()
            .all(|n| evaluate(n, &substring, buffer) != Decision::Reject));
    }

    #[test]
    fn test_exact_match_does_not_apply_to_references() {
        let buffer = b"int main() {\n    return obj.value;\n}\n";
        let reference = node(Category::ReferenceExpression, "value", (24, 33), (2, 2));
        let query = Query::new("val", CategorySet::REFERENCE_EXPRESSION).exact_match(true);

        assert_eq!(
            accepted(evaluate(&reference, &query, buffer), buffer).as_deref(),
            Some("return obj.value;")
        );
    }

    #[test]
    fn test_category_gate() {
        let buffer = SOURCE.as_bytes();
        let foo = node(Category::Struct, "Foo", (0, 21), (1, 1));
        assert_eq!(evaluate(&foo, &Query::new("Foo", CategorySet::CLASS), buffer), Decision::Reject);

        let uncategorized = VisitedNode {
            category: None,
            ..foo
        };
        assert_eq!(
            evaluate(&uncategorized, &Query::new("", CategorySet::all()), buffer),
            Decision::Reject
        );
    }

    #[test]
    fn test_window_correction() {
        let buffer = SOURCE.as_bytes();
        let foo = node(Category::Struct, "Foo", (0, 21), (1, 1));

        let window = evaluate(&foo, &Query::new("Foo", CategorySet::STRUCT), buffer)
            .window()
            .unwrap();
        assert_eq!(window.offset, foo.begin_offset - 2);
        assert_eq!(window.len, foo.end_offset - foo.begin_offset);
        assert_eq!(window.text(buffer), b"struct Foo { int x; }");
        assert_eq!((window.start_line, window.end_line), (1, 1));
    }

    #[test]
    fn test_ignore_single_line() {
        let buffer = b"struct Foo { int x; };\nstruct Big {\n  int y;\n};\n";
        let small = node(Category::Struct, "Foo", (0, 21), (1, 1));
        let big = node(Category::Struct, "Big", (23, 46), (2, 4));
        let query = Query::new("", CategorySet::STRUCT).ignore_single_line(true);

        assert_eq!(evaluate(&small, &query, buffer), Decision::Reject);
        assert_eq!(
            accepted(evaluate(&big, &query, buffer), buffer).as_deref(),
            Some("struct Big {\n  int y;\n}")
        );
    }

    #[test]
    fn test_single_line_reference_is_exempt() {
        let buffer = b"void f() {\n\tcount = 1;\n}\n";
        let reference = node(Category::ReferenceExpression, "count", (12, 17), (2, 2));
        let query = Query::new("count", CategorySet::REFERENCE_EXPRESSION).ignore_single_line(true);

        assert_eq!(
            accepted(evaluate(&reference, &query, buffer), buffer).as_deref(),
            Some("count = 1;")
        );
    }

    #[test]
    fn test_reference_window_is_trimmed_line() {
        let buffer = b"int g() {\n  \t total += step;\n  return total;\n}\n";
        let total = node(Category::ReferenceExpression, "step", (23, 27), (2, 2));
        let window = evaluate(&total, &Query::new("", CategorySet::REFERENCE_EXPRESSION), buffer)
            .window()
            .unwrap();

        let text = window.text(buffer);
        assert_eq!(text, b"total += step;");
        assert!(!text.starts_with(b" ") && !text.starts_with(b"\t"));
        assert!(!text.contains(&b'\n'));
    }

    #[test]
    fn test_reference_on_first_and_last_line() {
        let buffer = b"x = y";
        let first = node(Category::ReferenceExpression, "y", (4, 5), (1, 1));
        assert_eq!(
            accepted(evaluate(&first, &Query::new("y", CategorySet::REFERENCE_EXPRESSION), buffer), buffer)
                .as_deref(),
            Some("x = y")
        );
    }

    #[test]
    fn test_reference_on_line_break_is_rejected() {
        let buffer = b"ab\ncd";
        let query = Query::new("", CategorySet::REFERENCE_EXPRESSION);

        let on_newline = node(Category::ReferenceExpression, "b", (2, 3), (1, 1));
        assert_eq!(evaluate(&on_newline, &query, buffer), Decision::Reject);

        let blank = b"a\n   \nb";
        let on_blank = node(Category::ReferenceExpression, "x", (4, 5), (2, 2));
        assert_eq!(evaluate(&on_blank, &query, blank), Decision::Reject);

        let next_line = node(Category::ReferenceExpression, "c", (3, 4), (2, 2));
        assert_eq!(accepted(evaluate(&next_line, &query, buffer), buffer).as_deref(), Some("cd"));
    }

    #[test]
    fn test_deferred_categories_match_snippet_text() {
        let buffer = b"void f(int i) {\n  long v = static_cast<long>(i);\n}\n";
        let cast = node(Category::StaticCast, "static_cast", (27, 47), (2, 2));

        let hit = Query::new("<long>", CategorySet::STATIC_CAST);
        assert_eq!(
            accepted(evaluate(&cast, &hit, buffer), buffer).as_deref(),
            Some("static_cast<long>(i)")
        );

        let miss = Query::new("<int>", CategorySet::STATIC_CAST);
        assert_eq!(evaluate(&cast, &miss, buffer), Decision::Reject);

        // Exact match is irrelevant once the check moves to the snippet
        let exact = Query::new("long", CategorySet::STATIC_CAST).exact_match(true);
        assert!(evaluate(&cast, &exact, buffer).window().is_some());
    }

    #[test]
    fn test_match_snippet_text_for_named_categories() {
        let buffer = b"int add(int a, int b) { return a + b; }\n";
        let add = node(Category::Function, "add", (0, 39), (1, 1));

        let by_name = Query::new("return", CategorySet::FUNCTION);
        assert_eq!(evaluate(&add, &by_name, buffer), Decision::Reject);

        let by_text = by_name.clone().match_snippet_text(true);
        assert!(evaluate(&add, &by_text, buffer).window().is_some());
    }

    #[test]
    fn test_out_of_range_offsets_are_rejected() {
        let buffer = b"short";
        let beyond = node(Category::Function, "f", (5, 9), (1, 1));
        let query = Query::new("", CategorySet::FUNCTION);
        assert_eq!(evaluate(&beyond, &query, buffer), Decision::Reject);

        let unbiased = VisitedNode {
            begin_offset: 1,
            ..node(Category::Function, "f", (0, 3), (1, 1))
        };
        assert_eq!(evaluate(&unbiased, &query, buffer), Decision::Reject);

        let overlong = node(Category::Function, "f", (2, 50), (1, 1));
        assert_eq!(accepted(evaluate(&overlong, &query, buffer), buffer).as_deref(), Some("ort"));
    }

    #[test]
    fn test_nested_matches_are_independent() {
        let buffer = b"void run(int i) {\n  long v = static_cast<long>(i);\n}\n";
        let outer = node(Category::Function, "run", (0, 52), (1, 3));
        let inner = node(Category::StaticCast, "static_cast", (29, 49), (2, 2));
        let query = Query::new("", CategorySet::FUNCTION | CategorySet::STATIC_CAST);

        let outer_window = evaluate(&outer, &query, buffer).window().unwrap();
        let inner_window = evaluate(&inner, &query, buffer).window().unwrap();
        assert!(outer_window.offset <= inner_window.offset);
        assert!(inner_window.offset + inner_window.len <= outer_window.offset + outer_window.len);
    }
}
