//! Read-only facade over a parsed C translation unit.
//!
//! The checker does not parse C itself. A front end (libclang-based or
//! otherwise) lowers its syntax tree into these owned types; the engine only
//! ever reads them. The surface is deliberately small: declaration nodes with
//! the handful of attributes classification needs, plus the flat token stream
//! used by the suppression-comment pre-pass.
//!
//! All types carry builder-style `with_*` methods so front ends and tests can
//! assemble trees without growing constructor argument lists.

use std::fmt;
use std::path::PathBuf;

/// A position in a source file (1-indexed line and column).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct SourceLocation {
    /// Path of the file containing the entity.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
}

impl SourceLocation {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Syntactic category of a declaration node, as reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// A function or method parameter.
    Parameter,
    /// A variable declaration (global, file-static, or local).
    Variable,
    /// A function declaration or definition.
    Function,
    /// A `struct` declaration.
    Struct,
    /// A `union` declaration.
    Union,
    /// An `enum` declaration.
    Enum,
    /// A `typedef` declaration.
    Typedef,
    /// A struct or union field.
    Field,
    /// An enumerator inside an `enum`.
    EnumConstant,
    /// Any other node the front end chose to include (recursed into, never
    /// checked itself).
    Other,
}

/// Linkage of a declaration, mirroring the parser's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// Visible across translation units.
    External,
    /// Visible within one translation unit (`static` at file scope).
    Internal,
    /// No linkage (locals, parameters).
    None,
}

/// Shape of a canonical type, after the parser has resolved aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A struct or union. Which of the two is decided from the spelling.
    Record,
    /// An enumeration.
    Enum,
    /// A function prototype.
    FunctionProto,
    /// A pointer; `pointee` holds the pointed-to type.
    Pointer,
    /// Anything else (scalars, arrays, ...).
    Other,
}

/// A (possibly canonical) type with enough structure to unwrap pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    /// Shape of this type.
    pub kind: TypeKind,
    /// The type as spelled, e.g. `uint8_t *` or `union Flags_u`.
    pub spelling: String,
    /// Pointed-to type when `kind` is [`TypeKind::Pointer`].
    pub pointee: Option<Box<Type>>,
}

impl Type {
    /// Creates a non-pointer type.
    #[must_use]
    pub fn new(kind: TypeKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            pointee: None,
        }
    }

    /// Creates a pointer to `pointee`, spelled `<pointee> *`.
    #[must_use]
    pub fn pointer_to(pointee: Type) -> Self {
        let spelling = format!("{} *", pointee.spelling);
        Self {
            kind: TypeKind::Pointer,
            spelling,
            pointee: Some(Box::new(pointee)),
        }
    }

    /// Unwraps pointer layers, returning the innermost type and the number of
    /// layers removed.
    #[must_use]
    pub fn strip_pointers(&self) -> (&Type, usize) {
        let mut current = self;
        let mut depth = 0;
        while let (TypeKind::Pointer, Some(pointee)) = (current.kind, current.pointee.as_deref()) {
            current = pointee;
            depth += 1;
        }
        (current, depth)
    }
}

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A line or block comment, spelling included delimiters.
    Comment,
    /// A language keyword (`struct`, `enum`, ...).
    Keyword,
    /// An identifier.
    Identifier,
    /// Punctuation (`{`, `;`, ...).
    Punctuation,
    /// A literal of any kind.
    Literal,
}

/// A single token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical category.
    pub kind: TokenKind,
    /// Exact source text, including comment delimiters.
    pub spelling: String,
    /// Where the token starts.
    pub location: SourceLocation,
}

impl Token {
    /// Creates a token with a default location.
    #[must_use]
    pub fn new(kind: TokenKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            location: SourceLocation::default(),
        }
    }

    /// Places the token at the given position.
    #[must_use]
    pub fn at(mut self, file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        self.location = SourceLocation::new(file, line, column);
        self
    }
}

/// The semantic parent of a field or enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentInfo {
    /// The parent's own spelled name (for an anonymous tag this is whatever
    /// the parser inherited, typically the typedef name).
    pub name: String,
    /// Spelling of the parent's type, e.g. `union Flags_u`.
    pub type_spelling: String,
    /// Whether the parent tag is anonymous.
    pub is_anonymous: bool,
}

impl ParentInfo {
    /// Creates a named parent.
    #[must_use]
    pub fn new(name: impl Into<String>, type_spelling: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_spelling: type_spelling.into(),
            is_anonymous: false,
        }
    }

    /// Marks the parent as anonymous.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.is_anonymous = true;
        self
    }
}

/// One declaration node in the tree.
///
/// Only the attributes the checker consumes are modeled; a front end fills in
/// what applies to the node's kind and leaves the rest at their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    /// Syntactic category.
    pub kind: DeclKind,
    /// The declared identifier.
    pub name: String,
    /// The declaration's spelled type, when it has one.
    pub ty: Option<Type>,
    /// Canonical type a typedef resolves to (set for [`DeclKind::Typedef`]).
    pub underlying: Option<Type>,
    /// Linkage classification.
    pub linkage: Linkage,
    /// Whether this is an `inline` function.
    pub is_inline: bool,
    /// Whether this is an `extern` reference to storage defined elsewhere.
    pub has_extern_storage: bool,
    /// Whether the node comes from the main file (as opposed to an include).
    pub in_main_file: bool,
    /// Where the declared name appears.
    pub location: SourceLocation,
    /// Semantic parent, set for fields and enumerators.
    pub parent: Option<ParentInfo>,
    /// Tokens within this declaration's extent.
    pub tokens: Vec<Token>,
    /// Child declarations, in document order.
    pub children: Vec<Decl>,
}

impl Decl {
    /// Creates a declaration with defaults (no linkage, in the main file).
    #[must_use]
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ty: None,
            underlying: None,
            linkage: Linkage::None,
            is_inline: false,
            has_extern_storage: false,
            in_main_file: true,
            location: SourceLocation::default(),
            parent: None,
            tokens: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Places the declared name at the given position.
    #[must_use]
    pub fn at(mut self, file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        self.location = SourceLocation::new(file, line, column);
        self
    }

    /// Sets the spelled type.
    #[must_use]
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Sets the canonical underlying type (typedefs).
    #[must_use]
    pub fn with_underlying(mut self, ty: Type) -> Self {
        self.underlying = Some(ty);
        self
    }

    /// Sets the linkage.
    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Marks the declaration as an inline function.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    /// Marks the declaration as an `extern` storage reference.
    #[must_use]
    pub fn extern_storage(mut self) -> Self {
        self.has_extern_storage = true;
        self
    }

    /// Marks the declaration as coming from an included file.
    #[must_use]
    pub fn outside_main_file(mut self) -> Self {
        self.in_main_file = false;
        self
    }

    /// Sets the semantic parent.
    #[must_use]
    pub fn with_parent(mut self, parent: ParentInfo) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the tokens within this declaration's extent.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Appends a child declaration.
    #[must_use]
    pub fn with_child(mut self, child: Decl) -> Self {
        self.children.push(child);
        self
    }

    /// The spelled type as a string, or `""` when the node has no type.
    #[must_use]
    pub fn type_spelling(&self) -> &str {
        self.ty.as_ref().map_or("", |t| t.spelling.as_str())
    }
}

/// A fully parsed translation unit: top-level declarations plus the flat,
/// ordered token stream used by the comment pre-pass.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    /// Top-level declarations in document order.
    pub decls: Vec<Decl>,
    /// Every token in the unit, in document order.
    pub tokens: Vec<Token>,
}

impl TranslationUnit {
    /// Creates an empty translation unit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a top-level declaration.
    #[must_use]
    pub fn with_decl(mut self, decl: Decl) -> Self {
        self.decls.push(decl);
        self
    }

    /// Sets the flat token stream.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_pointers_counts_layers() {
        let ty = Type::pointer_to(Type::pointer_to(Type::new(TypeKind::Other, "int")));
        let (base, depth) = ty.strip_pointers();
        assert_eq!(depth, 2);
        assert_eq!(base.spelling, "int");
        assert_eq!(ty.spelling, "int * *");
    }

    #[test]
    fn strip_pointers_on_non_pointer_is_identity() {
        let ty = Type::new(TypeKind::Record, "struct Foo");
        let (base, depth) = ty.strip_pointers();
        assert_eq!(depth, 0);
        assert_eq!(base.spelling, "struct Foo");
    }

    #[test]
    fn decl_builder_defaults() {
        let decl = Decl::new(DeclKind::Variable, "count");
        assert_eq!(decl.linkage, Linkage::None);
        assert!(decl.in_main_file);
        assert_eq!(decl.type_spelling(), "");
    }

    #[test]
    fn location_display() {
        let loc = SourceLocation::new("src/main.c", 12, 5);
        assert_eq!(loc.to_string(), "src/main.c:12:5");
    }
}
