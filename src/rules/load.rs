//! DTO → domain model conversion with validation.
//!
//! Every invariant of the rule language is enforced here, before any
//! traversal starts: a broken rule file aborts the whole check.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::classify::{NameKind, Visibility};
use crate::placeholder::PlaceholderTable;
use crate::rules::dto::{NamingConfigDto, RuleSectionDto};
use crate::rules::model::{FullMatch, Pointer, Rule, RulePattern, RuleSet};

/// Group aliases accepted in `kind` selectors, expanded once at load time.
const KIND_GROUPS: &[(&str, &[NameKind])] = &[
    (
        "tag",
        &[NameKind::StructTag, NameKind::EnumTag, NameKind::UnionTag],
    ),
    (
        "typedef",
        &[
            NameKind::StructTypedef,
            NameKind::EnumTypedef,
            NameKind::UnionTypedef,
            NameKind::FunctionTypedef,
            NameKind::ScalarTypedef,
        ],
    ),
    (
        "member",
        &[NameKind::StructMember, NameKind::UnionMember],
    ),
];

/// Errors rejecting a rule file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the rule file.
    #[error("failed to read rule file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid TOML (or a field has the wrong shape).
    #[error("failed to parse rule file: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A section asserts nothing: no body, no allow pattern, no affix.
    #[error("section '{section}' does not have a 'rule', 'allow-rule', 'prefix' or 'suffix'")]
    MissingPattern {
        /// The offending section.
        section: String,
    },

    /// A section has both a required and an advisory body pattern.
    #[error("section '{section}' may not have both a 'rule' and an 'allow-rule'")]
    ConflictingPattern {
        /// The offending section.
        section: String,
    },

    /// The `pointer` field is neither a boolean nor a non-negative integer.
    #[error("section '{section}': 'pointer' must be a boolean or a non-negative integer, got {value}")]
    InvalidPointer {
        /// The offending section.
        section: String,
        /// The rejected value, rendered as TOML.
        value: String,
    },

    /// A `kind` token is neither a concrete kind nor a group alias.
    #[error("section '{section}': unknown kind '{kind}'")]
    UnknownKind {
        /// The offending section.
        section: String,
        /// The rejected token.
        kind: String,
    },

    /// A `visibility` token is not `global`, `file` or `local`.
    #[error("section '{section}': unknown visibility '{value}'")]
    UnknownVisibility {
        /// The offending section.
        section: String,
        /// The rejected token.
        value: String,
    },

    /// A `type` or `parent_match` pattern does not compile.
    #[error("section '{section}': invalid {field} pattern '{pattern}': {source}")]
    InvalidRegex {
        /// The offending section.
        section: String,
        /// Which field held the pattern.
        field: &'static str,
        /// The rejected pattern.
        pattern: String,
        /// The regex compile error.
        source: regex::Error,
    },

    /// Two sections share a name.
    #[error("duplicate section '{section}'")]
    DuplicateSection {
        /// The repeated name.
        section: String,
    },
}

impl RuleSet {
    /// Loads and validates a rule file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or any section
    /// is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses and validates a rule file from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the TOML is malformed or any section is
    /// invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let dto: NamingConfigDto = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Self::load(dto)
    }

    /// Converts a deserialized rule file into a validated rule set.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending section for every
    /// violated invariant.
    pub fn load(dto: NamingConfigDto) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(dto.rules.len());
        let mut seen = HashSet::new();

        for section in dto.rules {
            if !seen.insert(section.name.clone()) {
                return Err(ConfigError::DuplicateSection {
                    section: section.name,
                });
            }
            rules.push(convert_section(section)?);
        }

        Ok(Self {
            rules,
            placeholders: PlaceholderTable::from_config(dto.placeholders),
        })
    }
}

fn convert_section(dto: RuleSectionDto) -> Result<Rule, ConfigError> {
    let section = dto.name.clone();

    let pattern = match (dto.rule, dto.allow_rule) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingPattern { section }),
        (Some(body), None) => RulePattern::Body(body),
        (None, Some(allow)) => RulePattern::Allow(allow),
        (None, None) => {
            // An affix-only section is fine; an empty one asserts nothing.
            if dto.prefix.is_none() && dto.suffix.is_none() {
                return Err(ConfigError::MissingPattern { section });
            }
            RulePattern::AffixOnly
        }
    };

    let mut rule = Rule::new(&section, pattern);

    if let Some(tokens) = dto.kind {
        rule = rule.with_kinds(expand_kinds(&tokens, &section)?);
    }

    if let Some(tokens) = dto.visibility {
        let visibility = tokens
            .iter()
            .map(|t| {
                Visibility::parse(t).ok_or_else(|| ConfigError::UnknownVisibility {
                    section: section.clone(),
                    value: t.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rule = rule.with_visibility(visibility);
    }

    if let Some(patterns) = dto.types {
        let types = patterns
            .iter()
            .map(|p| {
                FullMatch::new(p).map_err(|e| ConfigError::InvalidRegex {
                    section: section.clone(),
                    field: "type",
                    pattern: p.clone(),
                    source: e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rule = rule.with_types(types);
    }

    if let Some(value) = dto.pointer {
        rule = rule.with_pointer(parse_pointer(&value, &section)?);
    }

    if let Some(pattern) = dto.parent_match {
        let regex = FullMatch::new(&pattern).map_err(|e| ConfigError::InvalidRegex {
            section: section.clone(),
            field: "parent_match",
            pattern: pattern.clone(),
            source: e,
        })?;
        rule = rule.with_parent_match(regex);
    }

    if let Some(prefix) = dto.prefix {
        rule = rule.with_prefix(prefix);
    }
    if let Some(suffix) = dto.suffix {
        rule = rule.with_suffix(suffix);
    }

    Ok(rule)
}

/// Expands group aliases and parses concrete kind tokens.
fn expand_kinds(tokens: &[String], section: &str) -> Result<HashSet<NameKind>, ConfigError> {
    let mut kinds = HashSet::new();
    for token in tokens {
        if let Some((_, members)) = KIND_GROUPS.iter().find(|(alias, _)| alias == token) {
            kinds.extend(members.iter().copied());
        } else if let Some(kind) = NameKind::parse(token) {
            kinds.insert(kind);
        } else {
            return Err(ConfigError::UnknownKind {
                section: section.to_string(),
                kind: token.clone(),
            });
        }
    }
    Ok(kinds)
}

fn parse_pointer(value: &toml::Value, section: &str) -> Result<Pointer, ConfigError> {
    match value {
        toml::Value::Boolean(b) => Ok(Pointer::Is(*b)),
        toml::Value::Integer(i) if *i >= 0 => {
            let depth = usize::try_from(*i).map_err(|_| ConfigError::InvalidPointer {
                section: section.to_string(),
                value: value.to_string(),
            })?;
            Ok(Pointer::Depth(depth))
        }
        _ => Err(ConfigError::InvalidPointer {
            section: section.to_string(),
            value: value.to_string(),
        }),
    }
}
