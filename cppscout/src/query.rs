//! Search query model: the syntactic categories a node can belong to and the
//! immutable query every worker reads while a scan runs.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Syntactic kind of a source construct eligible for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Enum,
    Struct,
    Union,
    MemberFunction,
    Function,
    FunctionTemplate,
    Class,
    ClassTemplate,
    Constructor,
    Destructor,
    Typedef,
    UsingDeclaration,
    NamespaceAlias,
    VariableDeclaration,
    ParameterDeclaration,
    StaticCast,
    DynamicCast,
    ReinterpretCast,
    ConstCast,
    ThrowExpression,
    ForStatement,
    /// References to values or members, member references and field declarations
    ReferenceExpression,
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::Enum,
        Category::Struct,
        Category::Union,
        Category::MemberFunction,
        Category::Function,
        Category::FunctionTemplate,
        Category::Class,
        Category::ClassTemplate,
        Category::Constructor,
        Category::Destructor,
        Category::Typedef,
        Category::UsingDeclaration,
        Category::NamespaceAlias,
        Category::VariableDeclaration,
        Category::ParameterDeclaration,
        Category::StaticCast,
        Category::DynamicCast,
        Category::ReinterpretCast,
        Category::ConstCast,
        Category::ThrowExpression,
        Category::ForStatement,
        Category::ReferenceExpression,
    ];

    pub fn flag(self) -> CategorySet {
        match self {
            Category::Enum => CategorySet::ENUM,
            Category::Struct => CategorySet::STRUCT,
            Category::Union => CategorySet::UNION,
            Category::MemberFunction => CategorySet::MEMBER_FUNCTION,
            Category::Function => CategorySet::FUNCTION,
            Category::FunctionTemplate => CategorySet::FUNCTION_TEMPLATE,
            Category::Class => CategorySet::CLASS,
            Category::ClassTemplate => CategorySet::CLASS_TEMPLATE,
            Category::Constructor => CategorySet::CONSTRUCTOR,
            Category::Destructor => CategorySet::DESTRUCTOR,
            Category::Typedef => CategorySet::TYPEDEF,
            Category::UsingDeclaration => CategorySet::USING_DECLARATION,
            Category::NamespaceAlias => CategorySet::NAMESPACE_ALIAS,
            Category::VariableDeclaration => CategorySet::VARIABLE_DECLARATION,
            Category::ParameterDeclaration => CategorySet::PARAMETER_DECLARATION,
            Category::StaticCast => CategorySet::STATIC_CAST,
            Category::DynamicCast => CategorySet::DYNAMIC_CAST,
            Category::ReinterpretCast => CategorySet::REINTERPRET_CAST,
            Category::ConstCast => CategorySet::CONST_CAST,
            Category::ThrowExpression => CategorySet::THROW_EXPRESSION,
            Category::ForStatement => CategorySet::FOR_STATEMENT,
            Category::ReferenceExpression => CategorySet::REFERENCE_EXPRESSION,
        }
    }

    /// Categories whose display name carries no useful text; the literal is
    /// checked against the realized snippet instead.
    pub fn matches_on_snippet(self) -> bool {
        matches!(
            self,
            Category::StaticCast
                | Category::DynamicCast
                | Category::ReinterpretCast
                | Category::ConstCast
                | Category::ThrowExpression
                | Category::Typedef
                | Category::ForStatement
        )
    }

    /// Reference/member/field categories: always substring matched and
    /// displayed as their whole enclosing line.
    pub fn is_reference(self) -> bool {
        matches!(self, Category::ReferenceExpression)
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Enum => "enum",
            Category::Struct => "struct",
            Category::Union => "union",
            Category::MemberFunction => "member-function",
            Category::Function => "function",
            Category::FunctionTemplate => "function-template",
            Category::Class => "class",
            Category::ClassTemplate => "class-template",
            Category::Constructor => "constructor",
            Category::Destructor => "destructor",
            Category::Typedef => "typedef",
            Category::UsingDeclaration => "using-declaration",
            Category::NamespaceAlias => "namespace-alias",
            Category::VariableDeclaration => "variable-declaration",
            Category::ParameterDeclaration => "parameter-declaration",
            Category::StaticCast => "static-cast",
            Category::DynamicCast => "dynamic-cast",
            Category::ReinterpretCast => "reinterpret-cast",
            Category::ConstCast => "const-cast",
            Category::ThrowExpression => "throw-expression",
            Category::ForStatement => "for-statement",
            Category::ReferenceExpression => "reference-expression",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of enabled categories
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CategorySet: u32 {
        const ENUM                  = 1 << 0;
        const STRUCT                = 1 << 1;
        const UNION                 = 1 << 2;
        const MEMBER_FUNCTION       = 1 << 3;
        const FUNCTION              = 1 << 4;
        const FUNCTION_TEMPLATE     = 1 << 5;
        const CLASS                 = 1 << 6;
        const CLASS_TEMPLATE        = 1 << 7;
        const CONSTRUCTOR           = 1 << 8;
        const DESTRUCTOR            = 1 << 9;
        const TYPEDEF               = 1 << 10;
        const USING_DECLARATION     = 1 << 11;
        const NAMESPACE_ALIAS       = 1 << 12;
        const VARIABLE_DECLARATION  = 1 << 13;
        const PARAMETER_DECLARATION = 1 << 14;
        const STATIC_CAST           = 1 << 15;
        const DYNAMIC_CAST          = 1 << 16;
        const REINTERPRET_CAST      = 1 << 17;
        const CONST_CAST            = 1 << 18;
        const THROW_EXPRESSION      = 1 << 19;
        const FOR_STATEMENT         = 1 << 20;
        const REFERENCE_EXPRESSION  = 1 << 21;

        /// `-F`: any function-like declaration
        const ANY_FUNCTION = Self::FUNCTION.bits()
            | Self::MEMBER_FUNCTION.bits()
            | Self::FUNCTION_TEMPLATE.bits();
        /// `-C`: any class-like declaration
        const ANY_CLASS = Self::CLASS.bits()
            | Self::CLASS_TEMPLATE.bits()
            | Self::STRUCT.bits();
        /// `-c`: any named cast
        const ANY_CAST = Self::STATIC_CAST.bits()
            | Self::DYNAMIC_CAST.bits()
            | Self::REINTERPRET_CAST.bits()
            | Self::CONST_CAST.bits();
    }
}

impl CategorySet {
    /// Enabled when the user names no category: everything but reference expressions
    pub fn default_declarations() -> Self {
        Self::all().difference(Self::REFERENCE_EXPRESSION)
    }

    pub fn contains_category(&self, category: Category) -> bool {
        self.contains(category.flag())
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(move |c| self.contains_category(*c))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CategorySet::empty(), |set, c| set | c.flag())
    }
}

/// The immutable query shared by every worker of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Literal to look for; empty matches everything
    pub literal: String,
    pub exact_match: bool,
    pub categories: CategorySet,
    /// Check the literal against the snippet text for every category, not
    /// only for the categories without a meaningful name
    pub match_snippet_text: bool,
    pub ignore_single_line: bool,
}

impl Query {
    pub fn new(literal: impl Into<String>, categories: CategorySet) -> Self {
        Self {
            literal: literal.into(),
            exact_match: false,
            categories,
            match_snippet_text: false,
            ignore_single_line: false,
        }
    }

    pub fn exact_match(mut self, yes: bool) -> Self {
        self.exact_match = yes;
        self
    }

    pub fn ignore_single_line(mut self, yes: bool) -> Self {
        self.ignore_single_line = yes;
        self
    }

    pub fn match_snippet_text(mut self, yes: bool) -> Self {
        self.match_snippet_text = yes;
        self
    }

    pub fn literal_bytes(&self) -> &[u8] {
        self.literal.as_bytes()
    }

    /// Whether the literal for `category` is checked after the window is known
    pub fn defers_to_snippet(&self, category: Category) -> bool {
        self.match_snippet_text || category.matches_on_snippet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_distinct_flag() {
        let mut seen = CategorySet::empty();
        for c in Category::ALL {
            assert!(!seen.contains(c.flag()), "{} reuses a flag", c);
            seen |= c.flag();
        }
        assert_eq!(seen, CategorySet::all());
    }

    #[test]
    fn test_aggregate_groups() {
        assert!(CategorySet::ANY_FUNCTION.contains_category(Category::MemberFunction));
        assert!(CategorySet::ANY_FUNCTION.contains_category(Category::FunctionTemplate));
        assert!(!CategorySet::ANY_FUNCTION.contains_category(Category::Constructor));
        assert!(CategorySet::ANY_CLASS.contains_category(Category::Struct));
        assert!(!CategorySet::ANY_CLASS.contains_category(Category::Union));
        assert_eq!(CategorySet::ANY_CAST.categories().count(), 4);
    }

    #[test]
    fn test_default_excludes_references() {
        let set = CategorySet::default_declarations();
        assert!(!set.contains_category(Category::ReferenceExpression));
        assert_eq!(set.categories().count(), Category::ALL.len() - 1);
    }

    #[test]
    fn test_collect_categories() {
        let set: CategorySet = [Category::Enum, Category::Typedef].into_iter().collect();
        assert_eq!(set, CategorySet::ENUM | CategorySet::TYPEDEF);
    }

    #[test]
    fn test_snippet_deferral() {
        let query = Query::new("x", CategorySet::all());
        assert!(query.defers_to_snippet(Category::StaticCast));
        assert!(query.defers_to_snippet(Category::ForStatement));
        assert!(!query.defers_to_snippet(Category::Function));
        assert!(query.match_snippet_text(true).defers_to_snippet(Category::Function));
    }

    #[test]
    fn test_category_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Category::MemberFunction).unwrap();
        assert_eq!(json, "\"member-function\"");
        let back: Category = serde_json::from_str("\"for-statement\"").unwrap();
        assert_eq!(back, Category::ForStatement);
    }
}
