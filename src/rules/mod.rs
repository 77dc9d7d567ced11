//! The declarative rule model.
//!
//! Three layers: serde DTOs ([`dto`]), the validating loader ([`load`]), and
//! the domain model ([`model`]) the engine evaluates against.

mod dto;
mod load;
mod model;

pub use dto::{NamingConfigDto, RuleSectionDto};
pub use load::ConfigError;
pub use model::{FullMatch, Pointer, Rule, RulePattern, RuleSet};

pub(crate) use model::compile_full_match;
