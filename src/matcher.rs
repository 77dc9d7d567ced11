//! Per-declaration rule evaluation.
//!
//! Rules are evaluated in declaration order against each classified
//! declaration. Evaluation is two-phase: the selector-matching rules are
//! collected first, then walked once, accumulating affix chains as they pass
//! and stopping at the first conclusive verdict. An unsuppressed affix
//! mismatch fails the declaration even when a later rule accepts the body.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::affix::{check_affix, AffixCheck, AffixEnd};
use crate::classify::{ClassifiedDecl, NameKind};
use crate::engine::IgnoreLedger;
use crate::placeholder::{
    expand, upper_snake, PlaceholderTable, CASE_CAMEL, CASE_PASCAL, CASE_SNAKE, CASE_UPPER_SNAKE,
};
use crate::report::{CheckReport, Diagnostic};
use crate::rules::{compile_full_match, Rule, RulePattern, RuleSet};

/// Outcome of testing one rule against one declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// The declaration is accepted; stop evaluating rules for it.
    Pass,
    /// The declaration violates a required rule; stop evaluating.
    Fail,
    /// An advisory rule did not match; keep evaluating.
    Continue,
}

/// Evaluates every applicable rule against `decl`, recording diagnostics.
///
/// Returns whether the declaration passed.
pub(crate) fn evaluate(
    decl: &ClassifiedDecl<'_>,
    rules: &RuleSet,
    ignores: &mut IgnoreLedger,
    report: &mut CheckReport,
) -> bool {
    debug!(
        "{} - name '{}'; kind {}; visibility {:?}; pointer {:?}; type '{}'",
        decl.location(),
        decl.name(),
        decl.kind,
        decl.visibility,
        decl.pointer_depth,
        decl.type_spelling()
    );

    let matching: Vec<&Rule> = rules
        .rules()
        .iter()
        .filter(|rule| rule.applies_to(decl))
        .collect();

    let mut evaluation = Evaluation {
        decl,
        placeholders: rules.placeholders(),
        vars: base_vars(decl),
        ignores,
        report,
        affix_failed: false,
    };
    evaluation.run(&matching)
}

/// State for one declaration's pass over its matching rules.
struct Evaluation<'a, 'tu> {
    decl: &'a ClassifiedDecl<'tu>,
    placeholders: &'a PlaceholderTable,
    vars: HashMap<String, String>,
    ignores: &'a mut IgnoreLedger,
    report: &'a mut CheckReport,
    affix_failed: bool,
}

impl Evaluation<'_, '_> {
    fn run(&mut self, matching: &[&Rule]) -> bool {
        let mut prefix_chain: Vec<&Rule> = Vec::new();
        let mut suffix_chain: Vec<&Rule> = Vec::new();

        for &rule in matching {
            if rule.prefix().is_some_and(|p| !p.is_empty()) {
                trace!("prefix rule '{}': '{}'", rule.name(), rule.prefix().unwrap_or(""));
                prefix_chain.push(rule);
            }
            if rule.suffix().is_some_and(|s| !s.is_empty()) {
                trace!("suffix rule '{}': '{}'", rule.name(), rule.suffix().unwrap_or(""));
                suffix_chain.push(rule);
            }

            if matches!(rule.pattern(), RulePattern::AffixOnly) {
                continue;
            }

            match self.test_rule(rule, &prefix_chain, &suffix_chain) {
                Verdict::Pass => return !self.affix_failed,
                Verdict::Fail => return false,
                Verdict::Continue => {}
            }
        }

        // No applicable required rule: the declaration implicitly passes.
        !self.affix_failed
    }

    fn test_rule(&mut self, rule: &Rule, prefix_chain: &[&Rule], suffix_chain: &[&Rule]) -> Verdict {
        let name = self.decl.name().to_string();
        let location = self.decl.location().clone();
        let mut remaining = name.clone();

        // An explicitly empty affix opts this rule out of the accumulated
        // chain, even though the rule itself matched.
        let expanded_prefix = if rule.prefix() == Some("") {
            None
        } else {
            self.test_affix(AffixEnd::Prefix, prefix_chain, &mut remaining)
        };
        let expanded_suffix = if rule.suffix() == Some("") {
            None
        } else {
            self.test_affix(AffixEnd::Suffix, suffix_chain, &mut remaining)
        };

        if self.decl.kind == NameKind::EnumConstant {
            self.apply_parent_vars(rule);
        }

        let (pattern_source, required) = match rule.pattern() {
            RulePattern::Body(p) => (p.as_str(), true),
            RulePattern::Allow(p) => (p.as_str(), false),
            RulePattern::AffixOnly => return Verdict::Continue,
        };

        let expanded = expand(pattern_source, self.placeholders, &self.vars);
        let description = describe_rule(
            rule.name(),
            &expanded,
            expanded_prefix.as_deref(),
            expanded_suffix.as_deref(),
        );

        let regex = match compile_full_match(&expanded) {
            Ok(regex) => regex,
            Err(e) => {
                self.report.push(
                    Diagnostic::warning(
                        location,
                        format!("rule {description} is not a valid pattern: {e}"),
                    )
                    .with_rule(rule.name()),
                );
                return Verdict::Continue;
            }
        };

        trace!(
            "testing rule {} against '{}'",
            description,
            remaining
        );

        if regex.is_match(&remaining) {
            trace!("name '{}' allowed by rule '{}'", name, rule.name());
            return Verdict::Pass;
        }

        if let Some(comment) = self.ignores.lookup(&location.file, location.line) {
            comment.mark_used();
            self.report.push(
                Diagnostic::info(
                    location,
                    format!("Name '{name}' fails rule {description} but was ignored by a comment"),
                )
                .with_rule(rule.name()),
            );
            return Verdict::Pass;
        }

        if required {
            self.report.push(
                Diagnostic::error(location, format!("Name '{name}' fails rule {description}"))
                    .with_rule(rule.name()),
            );
            Verdict::Fail
        } else {
            debug!(
                "name '{}' fails allow-rule {}; continuing",
                name, description
            );
            Verdict::Continue
        }
    }

    /// Tests one accumulated affix chain, stripping the match from
    /// `remaining` on success. Returns the expanded compound pattern when a
    /// chain was in force.
    fn test_affix(
        &mut self,
        end: AffixEnd,
        chain: &[&Rule],
        remaining: &mut String,
    ) -> Option<String> {
        let decl = self.decl;
        let location = decl.location();
        match check_affix(end, chain, remaining, self.placeholders, &self.vars) {
            AffixCheck::NotApplicable => None,
            AffixCheck::Matched {
                expanded,
                remainder,
            } => {
                *remaining = remainder;
                Some(expanded)
            }
            AffixCheck::Missing { expanded } => {
                let sources = chain
                    .iter()
                    .map(|r| r.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Some(comment) = self.ignores.lookup(&location.file, location.line) {
                    comment.mark_used();
                    self.report.push(Diagnostic::info(
                        location.clone(),
                        format!(
                            "Name '{}' is missing {} '{}' from [{}] but was ignored by a comment",
                            decl.name(),
                            end.term(),
                            expanded,
                            sources
                        ),
                    ));
                } else {
                    self.report.push(Diagnostic::error(
                        location.clone(),
                        format!(
                            "Name '{}' is missing {} '{}' from [{}]",
                            decl.name(),
                            end.term(),
                            expanded,
                            sources
                        ),
                    ));
                    self.affix_failed = true;
                }
                Some(expanded)
            }
            AffixCheck::Invalid { expanded, source } => {
                self.report.push(Diagnostic::warning(
                    location.clone(),
                    format!(
                        "compound {} '{}' is not a valid pattern: {}",
                        end.term(),
                        expanded,
                        source
                    ),
                ));
                None
            }
        }
    }

    /// Derives `${parent}` / `${parent:upper-snake}` from the enclosing
    /// enum, rewritten through the rule's `parent_match` capture when set.
    fn apply_parent_vars(&mut self, rule: &Rule) {
        let decl = self.decl;
        let Some(parent) = decl.decl.parent.as_ref() else {
            return;
        };
        let mut parent_name = parent.name.clone();

        if let Some(pattern) = rule.parent_match() {
            match pattern.captures(&parent_name) {
                None => {
                    self.report.push(
                        Diagnostic::warning(
                            decl.location().clone(),
                            format!(
                                "Rule '{}' parent_match '{}' does not match parent '{}'",
                                rule.name(),
                                pattern.as_str(),
                                parent_name
                            ),
                        )
                        .with_rule(rule.name()),
                    );
                }
                Some(captures) => match captures.name("name") {
                    Some(found) => parent_name = found.as_str().to_string(),
                    None => {
                        self.report.push(
                            Diagnostic::warning(
                                decl.location().clone(),
                                format!(
                                    "Rule '{}' parent_match '{}' does not have a capture group called 'name'",
                                    rule.name(),
                                    pattern.as_str()
                                ),
                            )
                            .with_rule(rule.name()),
                        );
                    }
                },
            }
        }

        self.vars
            .insert("parent".to_string(), regex::escape(&parent_name));
        self.vars.insert(
            "parent:upper-snake".to_string(),
            regex::escape(&upper_snake(&parent_name)),
        );
    }
}

/// The per-declaration substitution variables that do not depend on a rule.
fn base_vars(decl: &ClassifiedDecl<'_>) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("case:camel".to_string(), CASE_CAMEL.to_string());
    vars.insert("case:pascal".to_string(), CASE_PASCAL.to_string());
    vars.insert("case:snake".to_string(), CASE_SNAKE.to_string());
    vars.insert(
        "case:upper-snake".to_string(),
        CASE_UPPER_SNAKE.to_string(),
    );
    if let Some(stem) = decl.location().file.file_stem().and_then(|s| s.to_str()) {
        vars.insert("filename".to_string(), regex::escape(stem));
    }
    if let Some(depth) = decl.pointer_depth {
        vars.insert("pointer-level".to_string(), depth.to_string());
    }
    vars
}

/// Formats a rule for diagnostics: name, expanded pattern, and whichever
/// affix chains were in force.
fn describe_rule(
    name: &str,
    expanded: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if let Some(p) = prefix {
        parts.push(format!("prefix '{p}'"));
    }
    if let Some(s) = suffix {
        parts.push(format!("suffix '{s}'"));
    }
    if parts.is_empty() {
        format!("'{name}' ('{expanded}')")
    } else {
        format!("'{name}' ('{expanded}' with {})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, DeclKind, ParentInfo, Token, TokenKind, Type, TypeKind};
    use crate::classify::{classify, Classified};
    use crate::report::Severity;

    fn check_one(config: &str, decl: &Decl) -> (bool, CheckReport) {
        let rules = RuleSet::parse(config).expect("config should parse");
        let classified = match classify(decl) {
            Classified::Named(c) => c,
            other => panic!("expected Named, got {other:?}"),
        };
        let mut report = CheckReport::new();
        let mut ignores = IgnoreLedger::default();
        let passed = evaluate(&classified, &rules, &mut ignores, &mut report);
        (passed, report)
    }

    fn local_var(name: &str) -> Decl {
        Decl::new(DeclKind::Variable, name)
            .with_type(Type::new(TypeKind::Other, "int"))
            .at("main.c", 4, 9)
    }

    const CAMEL_VAR: &str = r#"
[[rule]]
name = "camel-var"
kind = ["variable"]
visibility = ["local"]
rule = "${case:camel}"
"#;

    // -- body rules --

    #[test]
    fn camel_local_variable_passes() {
        let (passed, report) = check_one(CAMEL_VAR, &local_var("localCount"));
        assert!(passed);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn non_camel_local_variable_fails_with_rule_name() {
        let (passed, report) = check_one(CAMEL_VAR, &local_var("Local_Count"));
        assert!(!passed);
        assert_eq!(report.diagnostics.len(), 1);
        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(
            diagnostic.to_string(),
            "main.c:4:9 - Name 'Local_Count' fails rule 'camel-var' ('[a-z][a-zA-Z0-9]*')"
        );
    }

    #[test]
    fn declaration_with_no_applicable_rule_passes() {
        let decl = Decl::new(DeclKind::Parameter, "whatever").at("main.c", 1, 1);
        let (passed, report) = check_one(CAMEL_VAR, &decl);
        assert!(passed);
        assert!(report.diagnostics.is_empty());
    }

    // -- allow rules --

    #[test]
    fn allow_rule_match_is_conclusive() {
        let config = r#"
[[rule]]
name = "legacy-names"
kind = ["variable"]
allow-rule = "legacy_.*"

[[rule]]
name = "camel-var"
kind = ["variable"]
rule = "${case:camel}"
"#;
        let (passed, report) = check_one(config, &local_var("legacy_thing"));
        assert!(passed);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn allow_rule_miss_defers_to_later_body_rule() {
        let config = r#"
[[rule]]
name = "legacy-names"
kind = ["variable"]
allow-rule = "legacy_.*"

[[rule]]
name = "camel-var"
kind = ["variable"]
rule = "${case:camel}"
"#;
        let (passed, report) = check_one(config, &local_var("Nope"));
        assert!(!passed);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].rule.as_deref(), Some("camel-var"));
    }

    #[test]
    fn allow_rule_miss_alone_passes_implicitly() {
        let config = r#"
[[rule]]
name = "legacy-names"
kind = ["variable"]
allow-rule = "legacy_.*"
"#;
        let (passed, report) = check_one(config, &local_var("Nope"));
        assert!(passed);
        assert!(report.diagnostics.is_empty());
    }

    // -- affixes --

    const STRUCT_PREFIX: &str = r#"
[[rule]]
name = "struct-prefix"
kind = ["struct_tag"]
prefix = "T_"

[[rule]]
name = "struct-body"
kind = ["struct_tag"]
rule = "${case:pascal}"
"#;

    fn struct_tag(name: &str) -> Decl {
        Decl::new(DeclKind::Struct, name)
            .with_tokens(vec![
                Token::new(TokenKind::Keyword, "struct"),
                Token::new(TokenKind::Identifier, name),
                Token::new(TokenKind::Punctuation, "{"),
            ])
            .at("shapes.c", 2, 8)
    }

    #[test]
    fn prefixed_struct_tag_passes_after_strip() {
        let (passed, report) = check_one(STRUCT_PREFIX, &struct_tag("T_Widget"));
        assert!(passed, "{:?}", report.diagnostics);
    }

    #[test]
    fn missing_prefix_fails_even_when_body_matches() {
        let (passed, report) = check_one(STRUCT_PREFIX, &struct_tag("Widget"));
        assert!(!passed);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].to_string(),
            "shapes.c:2:8 - Name 'Widget' is missing prefix 'T_' from [struct-prefix]"
        );
    }

    #[test]
    fn empty_prefix_opts_one_rule_out_of_the_chain() {
        let config = r#"
[[rule]]
name = "struct-prefix"
kind = ["struct_tag"]
prefix = "T_"

[[rule]]
name = "no-prefix-needed"
kind = ["struct_tag"]
prefix = ""
rule = "${case:pascal}"
"#;
        let (passed, report) = check_one(config, &struct_tag("Widget"));
        assert!(passed, "{:?}", report.diagnostics);
    }

    #[test]
    fn suffix_stripped_before_body_match() {
        let config = r#"
[[rule]]
name = "typedef-suffix"
kind = ["typedef"]
suffix = "_t"

[[rule]]
name = "typedef-body"
kind = ["typedef"]
rule = "${case:snake}"
"#;
        let decl = Decl::new(DeclKind::Typedef, "byte_count_t")
            .with_underlying(Type::new(TypeKind::Other, "unsigned long"))
            .at("sizes.c", 3, 1);
        let (passed, report) = check_one(config, &decl);
        assert!(passed, "{:?}", report.diagnostics);
    }

    #[test]
    fn affix_failure_sticks_across_later_allow_rule() {
        // The allow rule's own test reports the missing prefix; a later
        // body match must not wash the failure away.
        let config = r#"
[[rule]]
name = "struct-prefix"
kind = ["struct_tag"]
prefix = "T_"

[[rule]]
name = "grandfathered"
kind = ["struct_tag"]
allow-rule = "Old.*"

[[rule]]
name = "struct-body"
kind = ["struct_tag"]
rule = "${case:pascal}"
"#;
        let (passed, report) = check_one(config, &struct_tag("Widget"));
        assert!(!passed);
        let errors = report.by_severity(Severity::Error);
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("missing prefix 'T_'"));
    }

    // -- pointer placeholders --

    #[test]
    fn pointer_level_placeholder_expands() {
        let config = r#"
[[rule]]
name = "pointer-vars"
kind = ["variable"]
pointer = true
rule = "p${pointer-level}_${case:camel}"
"#;
        let decl = Decl::new(DeclKind::Variable, "p2_data")
            .with_type(Type::pointer_to(Type::pointer_to(Type::new(
                TypeKind::Other,
                "char",
            ))))
            .at("buf.c", 5, 3);
        let (passed, report) = check_one(config, &decl);
        assert!(passed, "{:?}", report.diagnostics);
    }

    // -- enum parents --

    fn enum_constant(name: &str, parent: &str) -> Decl {
        Decl::new(DeclKind::EnumConstant, name)
            .with_parent(ParentInfo::new(parent, format!("enum {parent}")))
            .at("color.c", 7, 5)
    }

    const PARENT_RULE: &str = r#"
[[rule]]
name = "enum-members"
kind = ["enum_constant"]
parent_match = '(?P<name>\w+)_e'
rule = "${parent:upper-snake}_.*"
"#;

    #[test]
    fn parent_capture_rewrites_expected_prefix() {
        let (passed, report) = check_one(PARENT_RULE, &enum_constant("COLOR_RED", "Color_e"));
        assert!(passed, "{:?}", report.diagnostics);
    }

    #[test]
    fn constant_without_parent_derived_prefix_fails() {
        let (passed, report) = check_one(PARENT_RULE, &enum_constant("RED", "Color_e"));
        assert!(!passed);
        assert!(report.diagnostics[0].message.contains("COLOR_"));
    }

    #[test]
    fn parent_match_miss_warns_and_falls_back() {
        let (passed, report) =
            check_one(PARENT_RULE, &enum_constant("PALETTE_MODE_DARK", "PaletteMode"));
        // Fallback parent is the unmodified 'PaletteMode', upper-snaked.
        assert!(passed, "{:?}", report.diagnostics);
        let warnings = report.by_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message
            .contains("does not match parent 'PaletteMode'"));
    }

    #[test]
    fn parent_match_without_name_group_warns_and_falls_back() {
        let config = r#"
[[rule]]
name = "enum-members"
kind = ["enum_constant"]
parent_match = '(\w+)_e'
rule = "${parent}_.*"
"#;
        let (passed, report) = check_one(config, &enum_constant("Color_e_RED", "Color_e"));
        assert!(passed, "{:?}", report.diagnostics);
        let warnings = report.by_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message
            .contains("capture group called 'name'"));
    }

    // -- invalid expanded patterns --

    #[test]
    fn invalid_expanded_body_pattern_warns_and_continues() {
        let config = r#"
[placeholders]
broken = "("

[[rule]]
name = "broken-rule"
kind = ["variable"]
rule = "${p:broken}"

[[rule]]
name = "camel-var"
kind = ["variable"]
rule = "${case:camel}"
"#;
        let (passed, report) = check_one(config, &local_var("fine"));
        assert!(passed);
        let warnings = report.by_severity(Severity::Warning);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("not a valid pattern"));
    }

    // -- filename placeholder --

    #[test]
    fn filename_placeholder_uses_escaped_stem() {
        let config = r#"
[[rule]]
name = "file-scoped"
kind = ["function"]
rule = "${filename}_${case:camel}"
"#;
        let decl = Decl::new(DeclKind::Function, "motor_start")
            .with_linkage(crate::ast::Linkage::Internal)
            .at("motor.c", 10, 13);
        let (passed, report) = check_one(config, &decl);
        assert!(passed, "{:?}", report.diagnostics);
    }
}
