//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization of a rule file.
//! They are converted to the validated domain model by the loader.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Raw TOML representation of a rule file.
///
/// Rule sections are `[[rule]]` array-of-tables, which preserves their
/// declaration order; the reserved `[placeholders]` table holds global
/// substitution fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamingConfigDto {
    /// Global placeholder fragments, referenced as `${p:<key>}`.
    #[serde(default)]
    pub placeholders: BTreeMap<String, String>,

    /// Rule sections, in declaration order.
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleSectionDto>,
}

/// TOML representation of one rule section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSectionDto {
    /// Section name, unique within the file.
    pub name: String,

    /// Kind selectors; concrete kinds or the group aliases `tag`,
    /// `typedef`, `member`.
    #[serde(default)]
    pub kind: Option<Vec<String>>,

    /// Visibility selectors (`global`, `file`, `local`).
    #[serde(default)]
    pub visibility: Option<Vec<String>>,

    /// Spelled-type selectors (full-match regular expressions).
    #[serde(rename = "type", default)]
    pub types: Option<Vec<String>>,

    /// Pointer selector: a boolean ("any pointer") or an exact depth.
    /// Kept as a raw TOML value so the loader can reject other shapes with
    /// a section-naming error.
    #[serde(default)]
    pub pointer: Option<toml::Value>,

    /// Parent-name capture pattern (enum constants only); must contain a
    /// capture group named `name`.
    #[serde(default)]
    pub parent_match: Option<String>,

    /// Prefix fragment; an empty string opts this rule out of the prefix
    /// chain.
    #[serde(default)]
    pub prefix: Option<String>,

    /// Suffix fragment; an empty string opts this rule out of the suffix
    /// chain.
    #[serde(default)]
    pub suffix: Option<String>,

    /// Required body pattern (mutually exclusive with `allow-rule`).
    #[serde(default)]
    pub rule: Option<String>,

    /// Advisory body pattern (mutually exclusive with `rule`).
    #[serde(rename = "allow-rule", default)]
    pub allow_rule: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty() {
        let dto: NamingConfigDto = toml::from_str("").unwrap();
        assert!(dto.placeholders.is_empty());
        assert!(dto.rules.is_empty());
    }

    #[test]
    fn deserialize_full_section() {
        let dto: NamingConfigDto = toml::from_str(
            r#"
[placeholders]
module-prefix = "[A-Z][a-z]+_"

[[rule]]
name = "pointer-vars"
kind = ["variable", "parameter"]
visibility = ["local"]
type = ['uint8_t \*']
pointer = true
prefix = "p"
rule = "${case:camel}"
"#,
        )
        .unwrap();

        assert_eq!(dto.placeholders.len(), 1);
        assert_eq!(dto.rules.len(), 1);
        let rule = &dto.rules[0];
        assert_eq!(rule.name, "pointer-vars");
        assert_eq!(rule.kind.as_deref(), Some(&["variable".to_string(), "parameter".to_string()][..]));
        assert_eq!(rule.pointer, Some(toml::Value::Boolean(true)));
        assert_eq!(rule.prefix.as_deref(), Some("p"));
        assert_eq!(rule.rule.as_deref(), Some("${case:camel}"));
        assert!(rule.allow_rule.is_none());
    }

    #[test]
    fn deserialize_preserves_rule_order() {
        let dto: NamingConfigDto = toml::from_str(
            r#"
[[rule]]
name = "first"
rule = "a"

[[rule]]
name = "second"
rule = "b"
"#,
        )
        .unwrap();
        let names: Vec<&str> = dto.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn deserialize_empty_string_affix_is_distinct_from_absent() {
        let dto: NamingConfigDto = toml::from_str(
            r#"
[[rule]]
name = "opt-out"
prefix = ""
rule = "x"
"#,
        )
        .unwrap();
        assert_eq!(dto.rules[0].prefix.as_deref(), Some(""));
        assert!(dto.rules[0].suffix.is_none());
    }
}
