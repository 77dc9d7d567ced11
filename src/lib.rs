//! # c-name-style
//!
//! Checks identifier naming conventions over a parsed C translation unit.
//! Every named declaration (variables, functions, parameters, tags,
//! typedefs, fields, enumerators) is classified into a semantic kind and
//! visibility, then evaluated against an ordered, declarative rule file.
//!
//! Rules select declarations by kind, visibility, type and pointer depth,
//! contribute prefix/suffix fragments that compose across rules, and assert
//! a body pattern built from placeholders such as `${case:camel}` or the
//! enclosing enum's name. Inline `// c-name-style ignore` comments suppress
//! individual findings and are audited after the walk.
//!
//! Parsing C is someone else's job: a front end lowers its syntax tree into
//! the [`ast`] facade types and hands the checker a [`TranslationUnit`].
//!
//! ## Example
//!
//! ```ignore
//! use c_name_style::{Checker, RuleSet};
//!
//! let rules = RuleSet::from_file(Path::new("naming.toml"))?;
//! let report = Checker::new(rules).check(&translation_unit);
//! print!("{}", report.format_report(Severity::Warning));
//! std::process::exit(i32::from(!report.passed()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod affix;
pub mod ast;
mod classify;
mod engine;
mod matcher;
mod placeholder;
mod report;
mod rules;

pub use ast::TranslationUnit;
pub use classify::{classify, Classified, ClassifiedDecl, NameKind, Visibility};
pub use engine::Checker;
pub use placeholder::PlaceholderTable;
pub use report::{CheckReport, Diagnostic, Severity};
pub use rules::{
    ConfigError, FullMatch, NamingConfigDto, Pointer, Rule, RulePattern, RuleSectionDto, RuleSet,
};
