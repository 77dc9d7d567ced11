//! Diagnostics and the accumulated check result.
//!
//! A check never aborts on a failing declaration; everything it finds is
//! collected here so one run surfaces every violation in the file. The
//! overall verdict is derived from the diagnostics rather than tracked in
//! separate mutable state.

use std::fmt;

use serde::Serialize;

use crate::ast::SourceLocation;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational (e.g. a violation silenced by an ignore comment);
    /// typically only shown in verbose output.
    Info,
    /// Something suspicious that does not fail the check.
    Warning,
    /// A naming violation; fails the check.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One finding against a source location.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity of this finding.
    pub severity: Severity,
    /// Where it was found.
    pub location: SourceLocation,
    /// The rule that produced it, when one did.
    pub rule: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(severity: Severity, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity,
            location,
            rule: None,
            message: message.into(),
        }
    }

    /// Creates an error-severity diagnostic.
    #[must_use]
    pub fn error(location: SourceLocation, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, location, message)
    }

    /// Creates a warning-severity diagnostic.
    #[must_use]
    pub fn warning(location: SourceLocation, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, location, message)
    }

    /// Creates an info-severity diagnostic.
    #[must_use]
    pub fn info(location: SourceLocation, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, location, message)
    }

    /// Attaches the originating rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.location, self.message)
    }
}

/// Result of checking one translation unit.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    /// Everything found, in document order of discovery.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of declarations classified and evaluated.
    pub declarations_checked: usize,
}

impl CheckReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// True when no error-severity diagnostic was recorded.
    #[must_use]
    pub fn passed(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .collect()
    }

    /// Counts diagnostics as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for d in &self.diagnostics {
            match d.severity {
                Severity::Error => counts.0 += 1,
                Severity::Warning => counts.1 += 1,
                Severity::Info => counts.2 += 1,
            }
        }
        counts
    }

    /// Renders diagnostics at or above `min_severity`, one per line, followed
    /// by a summary line.
    #[must_use]
    pub fn format_report(&self, min_severity: Severity) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for d in &self.diagnostics {
            if d.severity >= min_severity {
                let _ = writeln!(out, "{d}");
            }
        }
        let (errors, warnings, _) = self.count_by_severity();
        let _ = writeln!(
            out,
            "Checked {} declaration(s): {} error(s), {} warning(s)",
            self.declarations_checked, errors, warnings
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(severity: Severity) -> CheckReport {
        let mut report = CheckReport::new();
        report.push(Diagnostic::new(
            severity,
            SourceLocation::new("main.c", 3, 5),
            "Name 'x' fails rule 'camel'",
        ));
        report
    }

    #[test]
    fn passed_ignores_warnings_and_infos() {
        assert!(report_with(Severity::Warning).passed());
        assert!(report_with(Severity::Info).passed());
        assert!(!report_with(Severity::Error).passed());
    }

    #[test]
    fn diagnostic_display_uses_location_dash_message() {
        let d = Diagnostic::error(SourceLocation::new("main.c", 3, 5), "Name 'x' fails");
        assert_eq!(d.to_string(), "main.c:3:5 - Name 'x' fails");
    }

    #[test]
    fn format_report_filters_below_min_severity() {
        let mut report = report_with(Severity::Error);
        report.push(Diagnostic::info(
            SourceLocation::new("main.c", 9, 1),
            "suppressed",
        ));
        let text = report.format_report(Severity::Warning);
        assert!(text.contains("fails rule"));
        assert!(!text.contains("suppressed"));
        assert!(text.contains("1 error(s)"));
    }

    #[test]
    fn count_by_severity_buckets() {
        let mut report = report_with(Severity::Error);
        report.push(Diagnostic::warning(
            SourceLocation::new("main.c", 1, 1),
            "odd",
        ));
        assert_eq!(report.count_by_severity(), (1, 1, 0));
    }
}
