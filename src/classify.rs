//! Classification of declarations into the naming taxonomy.
//!
//! Every named declaration maps to a `(kind, visibility, pointer depth)`
//! triple that rule selectors match against. Declarations whose names the
//! programmer does not control (extern references, anonymous tags) are
//! excluded here rather than matched against rules.

use std::path::Path;

use crate::ast::{Decl, DeclKind, Linkage, SourceLocation, TypeKind};

/// Semantic kind of a checkable name, the `kind` vocabulary of rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// Function or method parameter.
    Parameter,
    /// Variable (any scope).
    Variable,
    /// Function.
    Function,
    /// A `struct`'s own tag name.
    StructTag,
    /// A `union`'s own tag name.
    UnionTag,
    /// An `enum`'s own tag name.
    EnumTag,
    /// Typedef whose canonical type is a struct.
    StructTypedef,
    /// Typedef whose canonical type is a union.
    UnionTypedef,
    /// Typedef whose canonical type is an enum.
    EnumTypedef,
    /// Typedef whose canonical type is a function prototype.
    FunctionTypedef,
    /// Typedef of anything else.
    ScalarTypedef,
    /// Field of a struct.
    StructMember,
    /// Field of a union.
    UnionMember,
    /// Enumerator.
    EnumConstant,
}

impl NameKind {
    /// The token used for this kind in rule files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::StructTag => "struct_tag",
            Self::UnionTag => "union_tag",
            Self::EnumTag => "enum_tag",
            Self::StructTypedef => "struct_typedef",
            Self::UnionTypedef => "union_typedef",
            Self::EnumTypedef => "enum_typedef",
            Self::FunctionTypedef => "function_typedef",
            Self::ScalarTypedef => "scalar_typedef",
            Self::StructMember => "struct_member",
            Self::UnionMember => "union_member",
            Self::EnumConstant => "enum_constant",
        }
    }

    /// Parses a concrete kind token (group aliases are handled by the rule
    /// loader, not here).
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "parameter" => Self::Parameter,
            "variable" => Self::Variable,
            "function" => Self::Function,
            "struct_tag" => Self::StructTag,
            "union_tag" => Self::UnionTag,
            "enum_tag" => Self::EnumTag,
            "struct_typedef" => Self::StructTypedef,
            "union_typedef" => Self::UnionTypedef,
            "enum_typedef" => Self::EnumTypedef,
            "function_typedef" => Self::FunctionTypedef,
            "scalar_typedef" => Self::ScalarTypedef,
            "struct_member" => Self::StructMember,
            "union_member" => Self::UnionMember,
            "enum_constant" => Self::EnumConstant,
            _ => return None,
        })
    }
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility taxonomy derived from linkage and file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Visible across files (or declared in a header).
    Global,
    /// Visible within one file.
    File,
    /// Local to a function.
    Local,
}

impl Visibility {
    /// The token used for this visibility in rule files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::File => "file",
            Self::Local => "local",
        }
    }

    /// Parses a visibility token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "global" => Self::Global,
            "file" => Self::File,
            "local" => Self::Local,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declaration successfully classified for rule evaluation.
#[derive(Debug, Clone)]
pub struct ClassifiedDecl<'a> {
    /// Semantic kind of the name.
    pub kind: NameKind,
    /// Visibility, absent for kinds that carry none (parameters, struct
    /// members).
    pub visibility: Option<Visibility>,
    /// Levels of pointer indirection, computed only for variables,
    /// parameters, typedefs and fields.
    pub pointer_depth: Option<usize>,
    /// The underlying declaration node.
    pub decl: &'a Decl,
}

impl<'a> ClassifiedDecl<'a> {
    /// The declared identifier.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.decl.name
    }

    /// The declaration's spelled type.
    #[must_use]
    pub fn type_spelling(&self) -> &'a str {
        self.decl.type_spelling()
    }

    /// Where the name appears.
    #[must_use]
    pub fn location(&self) -> &'a SourceLocation {
        &self.decl.location
    }
}

/// Outcome of classifying one node.
#[derive(Debug)]
pub enum Classified<'a> {
    /// The node carries a checkable name.
    Named(ClassifiedDecl<'a>),
    /// The node is not subject to naming rules (no name of its own, or the
    /// name is owned elsewhere).
    Skip,
    /// The node had an unexpected shape; excluded, with a warning.
    Unexpected(String),
}

/// Classifies a declaration node into `(kind, visibility, pointer depth)`.
///
/// Returns [`Classified::Skip`] for nodes that must not be checked: extern
/// storage references, anonymous tags (reached through their typedef
/// instead), and node kinds outside the taxonomy.
#[must_use]
pub fn classify(decl: &Decl) -> Classified<'_> {
    let is_header = is_header_file(&decl.location.file);
    let global_or_file = if is_header {
        Visibility::Global
    } else {
        Visibility::File
    };

    let (kind, visibility) = match decl.kind {
        DeclKind::Parameter => (NameKind::Parameter, None),
        DeclKind::Variable => {
            // In header files, all variables are global.
            if is_header {
                (NameKind::Variable, Some(Visibility::Global))
            } else {
                match decl.linkage {
                    Linkage::Internal => (NameKind::Variable, Some(Visibility::File)),
                    Linkage::None => (NameKind::Variable, Some(Visibility::Local)),
                    Linkage::External => {
                        // `extern int foo;` refers to a name defined elsewhere,
                        // which the author of this file does not control.
                        if decl.has_extern_storage {
                            return Classified::Skip;
                        }
                        (NameKind::Variable, Some(Visibility::Global))
                    }
                }
            }
        }
        DeclKind::Function => {
            // Inline functions in headers count as globals.
            if decl.linkage == Linkage::External || (decl.is_inline && is_header) {
                (NameKind::Function, Some(Visibility::Global))
            } else if decl.linkage == Linkage::Internal {
                (NameKind::Function, Some(Visibility::File))
            } else {
                return Classified::Unexpected(format!(
                    "unexpected linkage for function '{}'",
                    decl.name
                ));
            }
        }
        DeclKind::Struct => {
            if tag_is_unnamed(decl, "struct") {
                return Classified::Skip;
            }
            (NameKind::StructTag, Some(global_or_file))
        }
        DeclKind::Union => {
            if tag_is_unnamed(decl, "union") {
                return Classified::Skip;
            }
            (NameKind::UnionTag, Some(global_or_file))
        }
        DeclKind::Enum => {
            if tag_is_unnamed(decl, "enum") {
                return Classified::Skip;
            }
            (NameKind::EnumTag, Some(global_or_file))
        }
        DeclKind::Typedef => {
            let Some(underlying) = decl.underlying.as_ref() else {
                return Classified::Unexpected(format!(
                    "typedef '{}' has no underlying type",
                    decl.name
                ));
            };
            let (base, _) = underlying.strip_pointers();
            let kind = match base.kind {
                TypeKind::Record => {
                    if base.spelling.starts_with("union ") {
                        NameKind::UnionTypedef
                    } else {
                        NameKind::StructTypedef
                    }
                }
                TypeKind::Enum => NameKind::EnumTypedef,
                TypeKind::FunctionProto => NameKind::FunctionTypedef,
                TypeKind::Pointer | TypeKind::Other => NameKind::ScalarTypedef,
            };
            (kind, Some(global_or_file))
        }
        DeclKind::Field => {
            let in_union = decl
                .parent
                .as_ref()
                .is_some_and(|p| p.type_spelling.starts_with("union "));
            if in_union {
                (NameKind::UnionMember, Some(global_or_file))
            } else {
                (NameKind::StructMember, None)
            }
        }
        DeclKind::EnumConstant => (NameKind::EnumConstant, Some(global_or_file)),
        DeclKind::Other => return Classified::Skip,
    };

    Classified::Named(ClassifiedDecl {
        kind,
        visibility,
        pointer_depth: pointer_depth(decl),
        decl,
    })
}

/// Levels of indirection for kinds that carry them.
///
/// A typedef is qualified as a pointer when it aliases a pointer, so its
/// depth is measured on the canonical underlying type.
fn pointer_depth(decl: &Decl) -> Option<usize> {
    let ty = match decl.kind {
        DeclKind::Typedef => decl.underlying.as_ref(),
        DeclKind::Variable | DeclKind::Parameter | DeclKind::Field => decl.ty.as_ref(),
        _ => return None,
    };
    Some(ty.map_or(0, |t| t.strip_pointers().1))
}

/// Token-level test for an anonymous struct/union/enum tag.
///
/// When a tag is unnamed, the parser reports the enclosing typedef's name as
/// the tag's spelling. Scan this declaration's own tokens for the keyword and
/// the following `{`; if the spelled name does not appear between the two,
/// the tag is anonymous. (People can write `typedef struct /* foo */ {`, and
/// `typedef struct T_tag T_t` has no `{` at all.)
fn tag_is_unnamed(decl: &Decl, keyword: &str) -> bool {
    let spellings: Vec<&str> = decl.tokens.iter().map(|t| t.spelling.as_str()).collect();
    let Some(kw_pos) = spellings.iter().position(|s| *s == keyword) else {
        return false;
    };
    let Some(brace_pos) = spellings[kw_pos..]
        .iter()
        .position(|s| *s == "{")
        .map(|p| p + kw_pos)
    else {
        return false;
    };
    !spellings[kw_pos..brace_pos].contains(&decl.name.as_str())
}

fn is_header_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("h" | "hpp")
    )
}
