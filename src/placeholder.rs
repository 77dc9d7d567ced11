//! `${name}` placeholder expansion for rule patterns.
//!
//! Expansion runs in two stages, global `[placeholders]` table first, then
//! the per-declaration variables, so a global placeholder may itself contain
//! `${case:...}` tokens and still expand fully. Unknown placeholders are left
//! verbatim and `$$` escapes a literal `$`.

use std::collections::HashMap;

/// Pattern fragment matched by `${case:camel}`.
pub(crate) const CASE_CAMEL: &str = "[a-z][a-zA-Z0-9]*";
/// Pattern fragment matched by `${case:pascal}`.
pub(crate) const CASE_PASCAL: &str = "[A-Z][a-zA-Z0-9]*";
/// Pattern fragment matched by `${case:snake}`.
pub(crate) const CASE_SNAKE: &str = "[a-z]([a-z0-9_]*[a-z0-9])?";
/// Pattern fragment matched by `${case:upper-snake}`.
pub(crate) const CASE_UPPER_SNAKE: &str = "[A-Z]([A-Z0-9_]*[A-Z0-9])?";

/// The global substitution table from the `[placeholders]` config section.
///
/// Keys are stored with the `p:` prefix under which rules reference them
/// (`${p:my-fragment}`).
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    entries: HashMap<String, String>,
}

impl PlaceholderTable {
    /// Builds the table from raw config entries, prefixing each key with
    /// `p:`.
    pub(crate) fn from_config<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (format!("p:{}", k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Returns true when no placeholders are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// Expands a pattern: global table first, then per-declaration variables.
pub(crate) fn expand(
    template: &str,
    table: &PlaceholderTable,
    vars: &HashMap<String, String>,
) -> String {
    let pass = if table.is_empty() {
        template.to_string()
    } else {
        substitute(template, &|key| table.get(key).map(str::to_string))
    };
    substitute(&pass, &|key| vars.get(key).cloned())
}

/// Single substitution pass. Placeholder names are `[_a-z][_a-z0-9\-:]*`;
/// anything malformed or unknown passes through untouched.
fn substitute(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(body) = after.strip_prefix('{') {
            if let Some((ident, tail)) = take_ident(body) {
                match lookup(ident) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(ident);
                        out.push('}');
                    }
                }
                rest = tail;
            } else {
                out.push('$');
                rest = after;
            }
        } else {
            out.push('$');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Splits `name}tail` into `(name, tail)` when `name` is a valid placeholder
/// identifier.
fn take_ident(body: &str) -> Option<(&str, &str)> {
    let mut end = 0;
    for (i, c) in body.char_indices() {
        let valid = if i == 0 {
            c == '_' || c.is_ascii_lowercase()
        } else {
            c == '_' || c == '-' || c == ':' || c.is_ascii_lowercase() || c.is_ascii_digit()
        };
        if !valid {
            end = i;
            break;
        }
        end = i + c.len_utf8();
    }
    if end == 0 {
        return None;
    }
    let tail = body[end..].strip_prefix('}')?;
    Some((&body[..end], tail))
}

/// Converts a (typically PascalCase) name to upper snake: an underscore is
/// inserted before every non-leading uppercase letter, then everything is
/// uppercased.
pub(crate) fn upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}
