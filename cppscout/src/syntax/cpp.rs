//! C and C++ backend built on tree-sitter.
//!
//! Grammar nodes are mapped onto [`Category`] purely syntactically: a function
//! declarator inside a class body is a member function, one whose name equals
//! the enclosing class (or its `Class::Class` qualifier) is a constructor, and
//! so on. Casts are recognised as calls to `static_cast<..>` and friends.

use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use tree_sitter::{Node, Parser, Tree};

use super::{SourceParser, SyntaxTree, VisitAction, VisitedNode, Visitor, REPORTED_OFFSET_BIAS};
use crate::errors::{SearchError, SearchResult};
use crate::query::Category;

/// Field names under which an identifier declares or names something rather
/// than referring to an existing entity
const NON_REFERENCE_FIELDS: &[&str] = &["declarator", "name", "label", "type", "scope", "parameters"];

/// Parents whose identifier children are never references
const NON_REFERENCE_PARENTS: &[&str] = &[
    "reference_declarator",
    "parenthesized_declarator",
    "variadic_declarator",
    "structured_binding_declarator",
    "preproc_params",
    "preproc_defined",
    "attribute",
    "goto_statement",
    "using_declaration",
    "namespace_alias_definition",
];

/// Stateless tree-sitter backend. A grammar parser is created per call so the
/// backend can be shared by every worker. C and C++ sources both go through
/// the C++ grammar; compiler flags are accepted for interface parity only.
#[derive(Debug, Default, Clone, Copy)]
pub struct CppParser;

impl CppParser {
    pub fn new() -> Self {
        Self
    }
}

impl SourceParser for CppParser {
    fn parse<'s>(
        &self,
        path: &Path,
        source: &'s [u8],
        _flags: &[String],
    ) -> SearchResult<Box<dyn SyntaxTree + 's>> {
        // The C++ grammar accepts C as well, so `-x` and include paths are not consulted
        trace!("Parsing {}", path.display());

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| SearchError::parse_failure(path, e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| SearchError::parse_failure(path, "parser returned no tree"))?;

        if tree.root_node().has_error() {
            debug!("{} contains syntax errors; continuing with a partial tree", path.display());
        }

        Ok(Box::new(CppTree {
            tree,
            source,
            path: path.to_path_buf(),
        }))
    }
}

struct CppTree<'s> {
    tree: Tree,
    source: &'s [u8],
    path: PathBuf,
}

impl CppTree<'_> {
    fn describe<'t>(&self, node: Node<'t>, field: Option<&str>) -> VisitedNode<'_> {
        let (category, name) = match classify(node, field, self.source) {
            Some((category, name)) => (Some(category), name),
            None => (None, None),
        };
        let name = name.map_or(&[][..], |n| &self.source[n.byte_range()]);
        let start = node.start_position();
        let end = node.end_position();

        VisitedNode {
            category,
            name,
            begin_offset: node.start_byte() + REPORTED_OFFSET_BIAS,
            end_offset: node.end_byte() + REPORTED_OFFSET_BIAS,
            start_line: start.row as u32 + 1,
            start_column: start.column as u32 + 1,
            end_line: end.row as u32 + 1,
            end_column: end.column as u32 + 1,
        }
    }
}

impl SyntaxTree for CppTree<'_> {
    fn visit(&self, visitor: &mut Visitor<'_>) -> SearchResult<()> {
        let mut cursor = self.tree.walk();
        let mut depth = 0usize;

        loop {
            let node = cursor.node();
            let action = if node.is_named() {
                visitor(&self.describe(node, cursor.field_name()))
            } else {
                VisitAction::Recurse
            };

            match action {
                VisitAction::Stop => return Ok(()),
                VisitAction::Recurse if cursor.goto_first_child() => {
                    depth += 1;
                    continue;
                }
                _ => {}
            }

            loop {
                if depth == 0 {
                    return Ok(());
                }
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Err(SearchError::visitation_failure(
                        &self.path,
                        format!("cursor lost its parent at depth {}", depth),
                    ));
                }
                depth -= 1;
            }
        }
    }
}

type Classified<'t> = (Category, Option<Node<'t>>);

fn classify<'t>(node: Node<'t>, field: Option<&str>, source: &[u8]) -> Option<Classified<'t>> {
    match node.kind() {
        "enum_specifier" if is_definition(node) => {
            Some((Category::Enum, node.child_by_field_name("name")))
        }
        kind @ ("struct_specifier" | "class_specifier" | "union_specifier")
            if is_definition(node) && !is_templated(node) =>
        {
            let category = match kind {
                "struct_specifier" => Category::Struct,
                "class_specifier" => Category::Class,
                _ => Category::Union,
            };
            Some((category, node.child_by_field_name("name")))
        }
        "template_declaration" => classify_template(node, source),
        "function_definition" if !is_templated(node) => classify_function(node, source),
        "declaration" | "field_declaration" => classify_declaration(node, source),
        "type_definition" => Some((
            Category::Typedef,
            node.child_by_field_name("declarator").and_then(declarator_name),
        )),
        "alias_declaration" => Some((Category::UsingDeclaration, node.child_by_field_name("name"))),
        "using_declaration" => Some((Category::UsingDeclaration, last_named_child(node))),
        "namespace_alias_definition" => {
            Some((Category::NamespaceAlias, node.child_by_field_name("name")))
        }
        "parameter_declaration" | "optional_parameter_declaration" | "variadic_parameter_declaration" => {
            Some((
                Category::ParameterDeclaration,
                node.child_by_field_name("declarator").and_then(declarator_name),
            ))
        }
        "call_expression" => classify_cast(node, source),
        "throw_statement" | "throw_expression" => Some((Category::ThrowExpression, None)),
        "for_statement" | "for_range_loop" => Some((Category::ForStatement, None)),
        "field_expression" => Some((
            Category::ReferenceExpression,
            node.child_by_field_name("field"),
        )),
        "identifier" if is_reference_site(node, field) => {
            Some((Category::ReferenceExpression, Some(node)))
        }
        "qualified_identifier" if is_reference_site(node, field) => {
            Some((Category::ReferenceExpression, split_qualified(node).map(|(_, name)| name)))
        }
        "field_identifier" if parent_kind(node) == Some("field_initializer") => {
            Some((Category::ReferenceExpression, Some(node)))
        }
        _ => None,
    }
}

fn classify_template<'t>(node: Node<'t>, source: &[u8]) -> Option<Classified<'t>> {
    let inner = last_named_child(node)?;
    match inner.kind() {
        "class_specifier" | "struct_specifier" | "union_specifier" => {
            Some((Category::ClassTemplate, inner.child_by_field_name("name")))
        }
        "function_definition" | "declaration" | "field_declaration" => {
            let (_, name) = classify_function(inner, source)?;
            Some((Category::FunctionTemplate, name))
        }
        _ => None,
    }
}

fn classify_declaration<'t>(node: Node<'t>, source: &[u8]) -> Option<Classified<'t>> {
    if function_declarator(node).is_some() {
        if is_templated(node) {
            return None;
        }
        if let Some(found) = classify_function(node, source) {
            return Some(found);
        }
    }

    let declarator = node.child_by_field_name("declarator")?;
    let category = if node.kind() == "field_declaration" {
        Category::ReferenceExpression
    } else {
        Category::VariableDeclaration
    };
    Some((category, declarator_name(declarator)))
}

fn classify_function<'t>(node: Node<'t>, source: &[u8]) -> Option<Classified<'t>> {
    let declarator = function_declarator(node)?;
    let callee = declarator.child_by_field_name("declarator")?;

    let (category, name) = match callee.kind() {
        "destructor_name" => (Category::Destructor, callee),
        "qualified_identifier" => {
            let (scope, name) = split_qualified(callee)?;
            let category = if name.kind() == "destructor_name" {
                Category::Destructor
            } else if scope.is_some_and(|s| text(scope_name(s), source) == text(name, source)) {
                Category::Constructor
            } else {
                Category::MemberFunction
            };
            (category, name)
        }
        "identifier" | "field_identifier" | "operator_name" | "template_function" => {
            match enclosing_class_name(node, source) {
                Some(class) if class == text(callee, source) => (Category::Constructor, callee),
                Some(_) => (Category::MemberFunction, callee),
                None => (Category::Function, callee),
            }
        }
        _ => return None,
    };

    Some((category, Some(name)))
}

fn classify_cast<'t>(node: Node<'t>, source: &[u8]) -> Option<Classified<'t>> {
    let function = node.child_by_field_name("function")?;
    if function.kind() != "template_function" {
        return None;
    }
    let name = function.child_by_field_name("name")?;
    let category = match text(name, source) {
        b"static_cast" => Category::StaticCast,
        b"dynamic_cast" => Category::DynamicCast,
        b"reinterpret_cast" => Category::ReinterpretCast,
        b"const_cast" => Category::ConstCast,
        _ => return None,
    };
    Some((category, Some(name)))
}

/// A struct/class/union/enum specifier that declares the type itself rather
/// than naming it inside another declaration
fn is_definition(node: Node<'_>) -> bool {
    if node.child_by_field_name("body").is_some() {
        return true;
    }
    match node.parent() {
        Some(parent) => match parent.kind() {
            "translation_unit" | "declaration_list" | "field_declaration_list"
            | "template_declaration" => true,
            "declaration" | "field_declaration" => parent.child_by_field_name("declarator").is_none(),
            _ => false,
        },
        None => false,
    }
}

fn is_templated(node: Node<'_>) -> bool {
    parent_kind(node) == Some("template_declaration")
}

fn is_reference_site(node: Node<'_>, field: Option<&str>) -> bool {
    if field.is_some_and(|f| NON_REFERENCE_FIELDS.contains(&f)) {
        return false;
    }
    match parent_kind(node) {
        Some(parent) => !NON_REFERENCE_PARENTS.contains(&parent),
        None => false,
    }
}

/// Finds the function declarator of a declaration, looking through pointer
/// and reference declarators for functions returning `T*` or `T&`
fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator"
            | "reference_declarator"
            | "parenthesized_declarator"
            | "attributed_declarator" => current = inner_declarator(current)?,
            _ => return None,
        }
    }
}

/// Innermost naming node of a declarator chain
fn declarator_name(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "primitive_type"
            | "destructor_name" | "operator_name" | "template_function" => return Some(current),
            "qualified_identifier" => return split_qualified(current).map(|(_, name)| name),
            _ => current = inner_declarator(current)?,
        }
    }
}

fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("declarator")
        .or_else(|| last_named_child(node))
}

/// Splits `a::b::c` into the scope of the last component (`b`) and the name (`c`)
fn split_qualified(node: Node<'_>) -> Option<(Option<Node<'_>>, Node<'_>)> {
    let mut current = node;
    loop {
        let name = current.child_by_field_name("name")?;
        if name.kind() == "qualified_identifier" {
            current = name;
            continue;
        }
        return Some((current.child_by_field_name("scope"), name));
    }
}

/// `Foo<T>` scopes compare by their template name
fn scope_name(scope: Node<'_>) -> Node<'_> {
    if scope.kind() == "template_type" {
        scope.child_by_field_name("name").unwrap_or(scope)
    } else {
        scope
    }
}

/// Name of the class whose body directly contains `node`; empty for anonymous classes
fn enclosing_class_name<'s>(node: Node<'_>, source: &'s [u8]) -> Option<&'s [u8]> {
    let mut parent = node.parent()?;
    if parent.kind() == "template_declaration" {
        parent = parent.parent()?;
    }
    if parent.kind() != "field_declaration_list" {
        return None;
    }
    let class = parent.parent()?;
    match class.kind() {
        "class_specifier" | "struct_specifier" | "union_specifier" => Some(
            class
                .child_by_field_name("name")
                .map_or(&[][..], |name| text(scope_name(name), source)),
        ),
        _ => None,
    }
}

fn last_named_child(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let last = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .last();
    last
}

fn parent_kind(node: Node<'_>) -> Option<&'static str> {
    node.parent().map(|p| p.kind())
}

fn text<'s>(node: Node<'_>, source: &'s [u8]) -> &'s [u8] {
    &source[node.byte_range()]
}
