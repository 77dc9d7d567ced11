//! Translation-unit traversal and suppression tracking.
//!
//! Two passes: a token pre-pass collects `c-name-style ignore` comments into
//! a line-keyed ledger, then a depth-first pre-order walk classifies and
//! evaluates every declaration in the main file. Afterwards every suppression
//! that never fired is reported.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{Decl, DeclKind, SourceLocation, Token, TokenKind, TranslationUnit, TypeKind};
use crate::classify::{classify, Classified};
use crate::matcher::evaluate;
use crate::report::{CheckReport, Diagnostic};
use crate::rules::RuleSet;

/// One registered suppression comment.
///
/// Keyed by the line it suppresses: its own line for a trailing comment, the
/// following line for a comment alone on its line. `used` flips the first
/// time the comment silences a failure.
#[derive(Debug, Clone)]
pub(crate) struct IgnoreComment {
    file: PathBuf,
    line: usize,
    /// Where the comment token itself sits (for the unused-suppression
    /// warning).
    location: SourceLocation,
    used: bool,
}

impl IgnoreComment {
    pub(crate) fn mark_used(&mut self) {
        self.used = true;
    }
}

/// The per-check table of suppression comments.
///
/// Owned by the traversal and passed by reference into evaluation; entries
/// keep registration order so the post-pass audit reports them in document
/// order.
#[derive(Debug, Default)]
pub(crate) struct IgnoreLedger {
    entries: Vec<IgnoreComment>,
}

impl IgnoreLedger {
    /// Scans the flat token stream for suppression comments.
    fn scan(tokens: &[Token], report: &mut CheckReport) -> Self {
        let mut ledger = Self::default();

        for token in tokens {
            if token.kind != TokenKind::Comment {
                continue;
            }
            let Some(directive) = comment_directive(&token.spelling) else {
                continue;
            };
            if directive == "ignore" {
                let mut line = token.location.line;
                if first_on_line(tokens, token) {
                    // Nothing precedes the comment: it suppresses the line
                    // below it.
                    line += 1;
                }
                ledger.register(token.location.clone(), line);
            } else {
                report.push(Diagnostic::warning(
                    token.location.clone(),
                    format!("Unrecognised comment '{}'", token.spelling),
                ));
            }
        }

        ledger
    }

    /// Registers a suppression for `file:line`; a later comment keyed to the
    /// same line replaces an earlier one.
    fn register(&mut self, location: SourceLocation, line: usize) {
        let file = location.file.clone();
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.file == file && e.line == line)
        {
            existing.location = location;
            existing.used = false;
        } else {
            self.entries.push(IgnoreComment {
                file,
                line,
                location,
                used: false,
            });
        }
    }

    /// The suppression applicable to a source line, if any.
    pub(crate) fn lookup(&mut self, file: &Path, line: usize) -> Option<&mut IgnoreComment> {
        self.entries
            .iter_mut()
            .find(|e| e.line == line && e.file == file)
    }

    /// Reports every suppression that never fired.
    fn report_unused(&self, report: &mut CheckReport) {
        for entry in &self.entries {
            if !entry.used {
                report.push(Diagnostic::warning(
                    entry.location.clone(),
                    "ignore comment not used",
                ));
            }
        }
    }
}

/// Extracts the directive payload of a `c-name-style` comment.
///
/// Recognizes `// c-name-style <directive>` and
/// `/* c-name-style <directive> */`; at least one whitespace character must
/// separate the marker from the payload. Other comments yield `None`.
fn comment_directive(spelling: &str) -> Option<&str> {
    let body = if let Some(rest) = spelling.strip_prefix("//") {
        rest
    } else if let Some(rest) = spelling
        .strip_prefix("/*")
        .and_then(|r| r.strip_suffix("*/"))
    {
        rest
    } else {
        return None;
    };
    let rest = body.trim_start().strip_prefix("c-name-style")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Whether no other token starts before `token` on its own line.
fn first_on_line(tokens: &[Token], token: &Token) -> bool {
    !tokens.iter().any(|t| {
        t.location.file == token.location.file
            && t.location.line == token.location.line
            && t.location.column < token.location.column
    })
}

/// Checks translation units against a rule set.
pub struct Checker {
    rules: RuleSet,
}

impl Checker {
    /// Creates a checker for the given rules.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The rule set this checker evaluates.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Checks one translation unit, returning every diagnostic found.
    ///
    /// The walk never stops early: a failing declaration is recorded and the
    /// traversal continues, so one run surfaces every violation in the file.
    #[must_use]
    pub fn check(&self, unit: &TranslationUnit) -> CheckReport {
        let mut report = CheckReport::new();
        let mut ignores = IgnoreLedger::scan(&unit.tokens, &mut report);

        for decl in &unit.decls {
            self.visit(decl, &mut ignores, &mut report);
        }

        ignores.report_unused(&mut report);
        report
    }

    fn visit(&self, decl: &Decl, ignores: &mut IgnoreLedger, report: &mut CheckReport) {
        if !decl.in_main_file {
            return;
        }

        match classify(decl) {
            Classified::Named(classified) => {
                report.declarations_checked += 1;
                let passed = evaluate(&classified, &self.rules, ignores, report);
                if !passed {
                    debug!("declaration '{}' failed", decl.name);
                }
            }
            Classified::Skip => {}
            Classified::Unexpected(message) => {
                report.push(Diagnostic::warning(decl.location.clone(), message));
            }
        }

        // A typedef of a record or enum aliases a tag whose members are
        // visited through the tag declaration itself; recursing here would
        // visit every member twice.
        let aliases_record = decl.kind == DeclKind::Typedef
            && decl
                .underlying
                .as_ref()
                .is_some_and(|u| matches!(u.kind, TypeKind::Record | TypeKind::Enum));
        if !aliases_record {
            for child in &decl.children {
                self.visit(child, ignores, report);
            }
        }
    }
}
