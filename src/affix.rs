//! Compound prefix/suffix resolution.
//!
//! Each rule that matches a declaration may contribute a prefix and/or a
//! suffix fragment. Fragments concatenate in rule order into one compound
//! pattern, anchored to the relevant end of the identifier; the matched span
//! is stripped before body matching.

use std::collections::HashMap;

use regex::Regex;

use crate::placeholder::{expand, PlaceholderTable};
use crate::rules::Rule;

/// Which end of the identifier an affix chain binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AffixEnd {
    /// Anchored to the start of the identifier.
    Prefix,
    /// Anchored to the end of the identifier.
    Suffix,
}

impl AffixEnd {
    /// The word used in diagnostics.
    pub(crate) fn term(self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Suffix => "suffix",
        }
    }
}

/// Outcome of testing one compound affix against an identifier.
#[derive(Debug)]
pub(crate) enum AffixCheck {
    /// No rule contributed a fragment; nothing to test.
    NotApplicable,
    /// The compound affix matched; `remainder` is the identifier with the
    /// matched span stripped.
    Matched {
        /// The placeholder-expanded compound pattern.
        expanded: String,
        /// What is left for body matching.
        remainder: String,
    },
    /// The compound affix did not match anywhere it is anchored.
    Missing {
        /// The placeholder-expanded compound pattern.
        expanded: String,
    },
    /// The expanded compound pattern is not a valid regex.
    Invalid {
        /// The placeholder-expanded compound pattern.
        expanded: String,
        /// The compile error.
        source: regex::Error,
    },
}

/// Builds the compound affix from `chain` (in rule order) and tests it
/// against `name`.
pub(crate) fn check_affix(
    end: AffixEnd,
    chain: &[&Rule],
    name: &str,
    table: &PlaceholderTable,
    vars: &HashMap<String, String>,
) -> AffixCheck {
    if chain.is_empty() {
        return AffixCheck::NotApplicable;
    }

    let expanded: String = chain
        .iter()
        .map(|rule| {
            let fragment = match end {
                AffixEnd::Prefix => rule.prefix(),
                AffixEnd::Suffix => rule.suffix(),
            };
            expand(fragment.unwrap_or(""), table, vars)
        })
        .collect();

    let anchored = match end {
        AffixEnd::Prefix => format!("^{expanded}"),
        AffixEnd::Suffix => format!("{expanded}$"),
    };
    let regex = match Regex::new(&anchored) {
        Ok(r) => r,
        Err(source) => return AffixCheck::Invalid { expanded, source },
    };

    match regex.find(name) {
        Some(found) => {
            let remainder = match end {
                AffixEnd::Prefix => name[found.end()..].to_string(),
                AffixEnd::Suffix => name[..found.start()].to_string(),
            };
            AffixCheck::Matched {
                expanded,
                remainder,
            }
        }
        None => AffixCheck::Missing { expanded },
    }
}
