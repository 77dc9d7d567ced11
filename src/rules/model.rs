//! Domain model for naming rules.
//!
//! A [`RuleSet`] is the validated form of a rule file: rules in declaration
//! order (order drives both evaluation and affix composition) plus the global
//! placeholder table. Group aliases in `kind` selectors are expanded to
//! concrete kinds at load time, so matching never rewrites a rule.

use std::collections::HashSet;

use regex::Regex;
use tracing::trace;

use crate::classify::{ClassifiedDecl, NameKind, Visibility};
use crate::placeholder::PlaceholderTable;

/// Compiles a pattern with full-match semantics (the whole input must match).
pub(crate) fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// A full-match pattern that remembers its source text.
///
/// Compiled once at rule load and reused for every match; the raw text is
/// kept for diagnostics.
#[derive(Debug, Clone)]
pub struct FullMatch {
    raw: String,
    compiled: Regex,
}

impl FullMatch {
    /// Compiles a full-match pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            raw: pattern.to_string(),
            compiled: compile_full_match(pattern)?,
        })
    }

    /// The pattern as written in the rule file.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests whether the whole of `text` matches.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }

    /// Captures against the whole of `text`.
    #[must_use]
    pub fn captures<'t>(&self, text: &'t str) -> Option<regex::Captures<'t>> {
        self.compiled.captures(text)
    }
}

/// The `pointer` selector of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    /// `true` selects any indirection depth ≥ 1, `false` selects depth 0.
    Is(bool),
    /// Selects exactly this indirection depth.
    Depth(usize),
}

impl Pointer {
    /// Tests a declaration's indirection depth against this selector.
    #[must_use]
    pub fn matches(self, depth: usize) -> bool {
        match self {
            Self::Is(wants_pointer) => wants_pointer == (depth > 0),
            Self::Depth(exact) => exact == depth,
        }
    }
}

/// What a rule asserts about the (affix-stripped) identifier body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePattern {
    /// A required pattern; a miss fails the declaration.
    Body(String),
    /// An advisory pattern; a miss logs and defers to later rules.
    Allow(String),
    /// No body assertion, the rule only contributes affix fragments.
    AffixOnly,
}

/// One rule section from the configuration.
///
/// All selectors are optional; an absent selector matches everything.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    kinds: Option<HashSet<NameKind>>,
    visibility: Option<Vec<Visibility>>,
    types: Option<Vec<FullMatch>>,
    pointer: Option<Pointer>,
    parent_match: Option<FullMatch>,
    prefix: Option<String>,
    suffix: Option<String>,
    pattern: RulePattern,
}

impl Rule {
    /// Creates a rule with no selectors or affixes.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: RulePattern) -> Self {
        Self {
            name: name.into(),
            kinds: None,
            visibility: None,
            types: None,
            pointer: None,
            parent_match: None,
            prefix: None,
            suffix: None,
            pattern,
        }
    }

    /// Restricts the rule to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = NameKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Restricts the rule to the given visibilities.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Vec<Visibility>) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Restricts the rule to declarations whose spelled type matches one of
    /// the given patterns.
    #[must_use]
    pub fn with_types(mut self, types: Vec<FullMatch>) -> Self {
        self.types = Some(types);
        self
    }

    /// Restricts the rule by pointer indirection depth.
    #[must_use]
    pub fn with_pointer(mut self, pointer: Pointer) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Sets the parent-name capture pattern (enum constants only).
    #[must_use]
    pub fn with_parent_match(mut self, parent_match: FullMatch) -> Self {
        self.parent_match = Some(parent_match);
        self
    }

    /// Sets the prefix fragment. An explicitly empty string opts this rule
    /// out of the accumulated prefix chain.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the suffix fragment. An explicitly empty string opts this rule
    /// out of the accumulated suffix chain.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// The section name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The body/allow assertion.
    #[must_use]
    pub fn pattern(&self) -> &RulePattern {
        &self.pattern
    }

    /// The prefix fragment, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The suffix fragment, if any.
    #[must_use]
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// The parent-name capture pattern, if any.
    #[must_use]
    pub fn parent_match(&self) -> Option<&FullMatch> {
        self.parent_match.as_ref()
    }

    /// Tests whether all of this rule's selectors apply to a declaration.
    #[must_use]
    pub fn applies_to(&self, decl: &ClassifiedDecl<'_>) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&decl.kind) {
                trace!(
                    "skip rule '{}': kind '{}' not selected",
                    self.name,
                    decl.kind
                );
                return false;
            }
        }

        if let (Some(pointer), Some(depth)) = (self.pointer, decl.pointer_depth) {
            if !pointer.matches(depth) {
                trace!(
                    "skip rule '{}': pointer level {} does not match",
                    self.name,
                    depth
                );
                return false;
            }
        }

        if let Some(types) = &self.types {
            if !types.iter().any(|t| t.is_match(decl.type_spelling())) {
                trace!(
                    "skip rule '{}': type '{}' not selected",
                    self.name,
                    decl.type_spelling()
                );
                return false;
            }
        }

        if let (Some(visibility), Some(wanted)) = (decl.visibility, &self.visibility) {
            if !wanted.contains(&visibility) {
                trace!(
                    "skip rule '{}': visibility '{}' not selected",
                    self.name,
                    visibility
                );
                return false;
            }
        }

        // A parent_match cannot apply to an enumerator of an anonymous enum.
        if self.parent_match.is_some()
            && decl.kind == NameKind::EnumConstant
            && decl.decl.parent.as_ref().map_or(true, |p| p.is_anonymous)
        {
            trace!(
                "skip rule '{}': parent_match specified but enum is anonymous",
                self.name
            );
            return false;
        }

        true
    }
}

/// The validated rule file: ordered rules plus the placeholder table.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) rules: Vec<Rule>,
    pub(crate) placeholders: PlaceholderTable,
}

impl RuleSet {
    /// The rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The global placeholder table.
    #[must_use]
    pub fn placeholders(&self) -> &PlaceholderTable {
        &self.placeholders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, DeclKind, Type, TypeKind};
    use crate::classify::{classify, Classified};

    fn classified(decl: &Decl) -> ClassifiedDecl<'_> {
        match classify(decl) {
            Classified::Named(c) => c,
            other => panic!("expected Named, got {other:?}"),
        }
    }

    // -- pointer selector --

    #[test]
    fn pointer_bool_matches_any_depth() {
        assert!(Pointer::Is(true).matches(1));
        assert!(Pointer::Is(true).matches(3));
        assert!(!Pointer::Is(true).matches(0));
        assert!(Pointer::Is(false).matches(0));
        assert!(!Pointer::Is(false).matches(2));
    }

    #[test]
    fn pointer_depth_is_exact() {
        assert!(Pointer::Depth(2).matches(2));
        assert!(!Pointer::Depth(2).matches(1));
        assert!(!Pointer::Depth(2).matches(3));
    }

    // -- selectors --

    #[test]
    fn kind_selector_filters() {
        let rule = Rule::new("vars", RulePattern::Body("x".into()))
            .with_kinds([NameKind::Variable]);
        let var = Decl::new(DeclKind::Variable, "x").at("f.c", 1, 1);
        let param = Decl::new(DeclKind::Parameter, "x").at("f.c", 1, 1);
        assert!(rule.applies_to(&classified(&var)));
        assert!(!rule.applies_to(&classified(&param)));
    }

    #[test]
    fn pointer_selector_ignored_for_kinds_without_depth() {
        let rule = Rule::new("anything", RulePattern::Body("x".into()))
            .with_pointer(Pointer::Is(true));
        let decl = Decl::new(DeclKind::EnumConstant, "X").at("f.c", 1, 1);
        assert!(rule.applies_to(&classified(&decl)));
    }

    #[test]
    fn type_selector_is_full_match() {
        let rule = Rule::new("u8-only", RulePattern::Body("x".into()))
            .with_types(vec![FullMatch::new("uint8_t").unwrap()]);
        let yes = Decl::new(DeclKind::Variable, "x")
            .with_type(Type::new(TypeKind::Other, "uint8_t"))
            .at("f.c", 1, 1);
        let no = Decl::new(DeclKind::Variable, "x")
            .with_type(Type::new(TypeKind::Other, "uint8_t *"))
            .at("f.c", 1, 1);
        assert!(rule.applies_to(&classified(&yes)));
        assert!(!rule.applies_to(&classified(&no)));
    }

    #[test]
    fn visibility_selector_needs_intersection() {
        let rule = Rule::new("locals", RulePattern::Body("x".into()))
            .with_visibility(vec![Visibility::Local]);
        let local = Decl::new(DeclKind::Variable, "x").at("f.c", 1, 1);
        let global = Decl::new(DeclKind::Variable, "x")
            .with_linkage(crate::ast::Linkage::External)
            .at("f.c", 1, 1);
        assert!(rule.applies_to(&classified(&local)));
        assert!(!rule.applies_to(&classified(&global)));
    }

    #[test]
    fn visibility_selector_skipped_when_decl_has_none() {
        let rule = Rule::new("globals", RulePattern::Body("x".into()))
            .with_visibility(vec![Visibility::Global]);
        let param = Decl::new(DeclKind::Parameter, "x").at("f.c", 1, 1);
        assert!(rule.applies_to(&classified(&param)));
    }

    #[test]
    fn parent_match_skips_anonymous_enum_constants() {
        let rule = Rule::new("enum-members", RulePattern::Body("x".into()))
            .with_parent_match(FullMatch::new(r"(?P<name>\w+)_e").unwrap());
        let anon = Decl::new(DeclKind::EnumConstant, "RED")
            .with_parent(crate::ast::ParentInfo::new("Color_t", "enum Color_t").anonymous())
            .at("f.c", 1, 1);
        assert!(!rule.applies_to(&classified(&anon)));
    }
}
